pub mod cache;
pub mod service;
pub mod types;

pub use cache::FeedFilter;
pub use service::FeedCache;
pub use types::{FeedSort, Post, User};
