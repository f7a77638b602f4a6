//! Client-side entity and page cache for feed and news APIs.

pub mod cache;
pub mod config;
pub mod feed;
pub mod logging;
pub mod news;
pub mod replay;
