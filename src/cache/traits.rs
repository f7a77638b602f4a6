//! Core traits and types for the caching system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
///
/// Payloads are serde types so that partial field updates can be merged
/// through their JSON object representation.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., post id, user id)
  fn cache_key(&self) -> String;

  /// Entity type name used in refresh keys and logs (e.g., "post", "user")
  fn entity_type() -> &'static str;
}

/// Trait for list query descriptors (filters plus pagination).
///
/// One implementor per query shape. Every field is required-with-default so
/// that encoding never depends on which optional fields a caller happened to set.
pub trait QueryKey: Clone + Send + Sync {
  /// Deterministic key for this query.
  fn cache_key(&self) -> CacheKey;

  /// Human-readable description, stored with the cached list.
  fn description(&self) -> String;

  /// The "page zero / latest" query that optimistic inserts are spliced into.
  ///
  /// `None` when the query shape has no such page.
  fn latest() -> Option<Self>;
}

/// Opaque cache key produced by [`super::KeyEncoder`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
  pub(crate) fn new(encoded: String) -> Self {
    Self(encoded)
  }

  /// Refresh-coordination key for a single entity.
  pub fn entity(entity_type: &str, id: &str) -> Self {
    Self(format!("entity|type:{}|id:{}", entity_type, super::key::escape(id)))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Query type for entity-only caches (users, categories) that never cache lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoQuery {}

impl QueryKey for NoQuery {
  fn cache_key(&self) -> CacheKey {
    match *self {}
  }

  fn description(&self) -> String {
    match *self {}
  }

  fn latest() -> Option<Self> {
    None
  }
}

/// Age classification of a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  /// Serve, no refresh needed
  Fresh,
  /// Serve, background refresh warranted
  Stale,
  /// Treated as absent
  Expired,
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Data from cache, considered stale; a background refresh may be running
  CacheStale,
}
