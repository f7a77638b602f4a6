pub mod cache;
pub mod service;
pub mod types;

pub use cache::NewsFilter;
pub use service::NewsCache;
pub use types::{Article, Category};
