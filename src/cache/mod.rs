//! Generic client-side cache for entities and paginated list views.
//!
//! This module provides a domain-agnostic caching engine that:
//! - Keeps one canonical copy per entity id, bounded and age-tracked
//! - Caches list views as ordered id sequences that resolve through the entity store
//! - Classifies records as fresh, stale or expired and de-duplicates background refreshes
//! - Applies optimistic local mutations to both stores in one step

mod clock;
mod config;
mod engine;
mod entity_store;
mod key;
mod layer;
mod list_store;
mod refresh;
mod shared;
mod staleness;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, RemovalPolicy};
pub use engine::{Cache, CacheStats};
pub use key::KeyEncoder;
pub use layer::CacheLayer;
pub use list_store::CachedList;
pub use refresh::{GlobalRefresh, Subscription};
pub use shared::SharedCache;
pub use traits::{CacheKey, CacheResult, CacheSource, Cacheable, Freshness, NoQuery, QueryKey};
