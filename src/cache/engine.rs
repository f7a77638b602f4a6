//! The cache engine: entity store, list store, staleness and refresh
//! coordination, and optimistic mutations behind one API.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::config::{CacheConfig, RemovalPolicy};
use super::entity_store::EntityStore;
use super::list_store::{CachedList, ListStore};
use super::refresh::RefreshCoordinator;
use super::staleness::Staleness;
use super::traits::{CacheKey, Cacheable, Freshness, QueryKey};

/// Diagnostic counters. Not used for correctness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
  pub entity_count: usize,
  pub list_count: usize,
  pub approx_bytes: usize,
}

/// Entity and list cache for one entity type `T` and one query shape `Q`.
///
/// Every operation is total. Reads return owned copies, so nothing a caller
/// does with a result can reach back into the cache.
pub struct Cache<T, Q> {
  entities: EntityStore<T>,
  lists: ListStore,
  refresh: RefreshCoordinator,
  staleness: Staleness,
  on_remove: RemovalPolicy,
  clock: Arc<dyn Clock>,
  _query: PhantomData<fn(&Q)>,
}

impl<T: Cacheable, Q: QueryKey> Cache<T, Q> {
  /// Create a cache on the wall clock.
  pub fn new(config: &CacheConfig) -> Result<Self> {
    Self::with_clock(config, Arc::new(SystemClock))
  }

  pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
    config.validate()?;
    let staleness = Staleness::new(config);
    Ok(Self {
      entities: EntityStore::new(staleness, config.max_entities),
      lists: ListStore::new(staleness, config.max_pages),
      refresh: RefreshCoordinator::new(config.stale_while_revalidate()),
      staleness,
      on_remove: config.on_remove,
      clock,
      _query: PhantomData,
    })
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  /// Cached list for `query`, or `None` on a miss.
  pub fn get_list(&self, query: &Q) -> Option<Vec<T>> {
    self.get_list_with_meta(query).map(|cached| cached.entities)
  }

  /// Like [`Self::get_list`], keeping the list's `cached_at`.
  pub fn get_list_with_meta(&self, query: &Q) -> Option<CachedList<T>> {
    let key = query.cache_key();
    let result = self.lists.get(&key, &self.entities, self.now());
    trace!(key = %key, hit = result.is_some(), "List lookup");
    result
  }

  pub fn get_entity(&self, id: &str) -> Option<T> {
    self
      .entities
      .get(id, self.now())
      .map(|cached| cached.entity.clone())
  }

  /// Like [`Self::get_entity`], keeping the entity's `cached_at` and its
  /// freshness as of this read.
  pub fn get_entity_with_meta(&self, id: &str) -> Option<(T, DateTime<Utc>, Freshness)> {
    let now = self.now();
    self.entities.get(id, now).map(|cached| {
      let freshness = self.staleness.classify(cached.cached_at, now);
      (cached.entity.clone(), cached.cached_at, freshness)
    })
  }

  /// Copies of every unexpired entity.
  pub fn get_all_cached_entities(&self) -> HashMap<String, T> {
    self.entities.snapshot(self.now())
  }

  pub fn list_freshness(&self, query: &Q) -> Option<Freshness> {
    self.lists.freshness(&query.cache_key(), self.now())
  }

  pub fn entity_freshness(&self, id: &str) -> Option<Freshness> {
    self.entities.freshness(id, self.now())
  }

  // ==========================================================================
  // Writes from successful fetches
  // ==========================================================================

  /// Store a fetched list: entities first, then the ordered ids.
  pub fn set_list(&mut self, query: &Q, items: Vec<T>) {
    let now = self.now();
    let key = query.cache_key();
    let ids: Vec<String> = items.iter().map(Cacheable::cache_key).collect();
    for item in items {
      self.entities.put(item, now);
    }
    debug!(key = %key, count = ids.len(), "Cached list");
    self.lists.put(key, ids, query.description(), now);
  }

  pub fn set_entity(&mut self, entity: T) {
    let now = self.now();
    trace!(entity_type = T::entity_type(), id = %entity.cache_key(), "Cached entity");
    self.entities.put(entity, now);
  }

  // ==========================================================================
  // Optimistic mutations
  // ==========================================================================

  /// Insert a newly created entity and splice it to the front of the
  /// latest-page list, if one is cached. Differently filtered lists are left
  /// as they are.
  pub fn add_new(&mut self, entity: T) {
    let now = self.now();
    let id = entity.cache_key();
    self.entities.put(entity, now);

    if let Some(latest) = Q::latest() {
      let key = latest.cache_key();
      if self.lists.splice_front(&key, &id, now) {
        debug!(key = %key, id = %id, "Prepended new entity to latest list");
      }
    }
  }

  /// Shallow-merge `fields` into a cached entity. Lists see the change on
  /// their next read. Returns whether the entity was cached and updated.
  pub fn update_fields(&mut self, id: &str, fields: &Map<String, Value>) -> bool {
    let now = self.now();
    self.entities.merge(id, fields, now)
  }

  /// Delete an entity and deal with every list that referenced it according
  /// to the configured [`RemovalPolicy`].
  pub fn remove_by_id(&mut self, id: &str) {
    let now = self.now();
    self.entities.remove(id);
    self.refresh.forget(&CacheKey::entity(T::entity_type(), id));
    match self.on_remove {
      RemovalPolicy::Invalidate => {
        self.lists.invalidate_containing(id);
      }
      RemovalPolicy::Splice => {
        let patched = self.lists.splice_out(id, now);
        debug!(id, patched, "Spliced removed entity out of lists");
      }
    }
  }

  /// Drop every list whose ids include `id`.
  pub fn invalidate_containing(&mut self, id: &str) {
    self.lists.invalidate_containing(id);
  }

  /// Drop the list for `query`.
  pub fn invalidate_list(&mut self, query: &Q) {
    let key = query.cache_key();
    self.lists.invalidate(&key);
    self.refresh.forget(&key);
  }

  /// Drop every list. Entities stay cached.
  pub fn invalidate_all(&mut self) {
    self.lists.invalidate_all();
  }

  /// Clear both stores and all refresh marks.
  pub fn reset(&mut self) {
    self.entities.clear();
    self.lists.invalidate_all();
    self.refresh.clear();
    debug!(entity_type = T::entity_type(), "Cache reset");
  }

  // ==========================================================================
  // Refresh coordination
  // ==========================================================================

  /// True when the list is stale and no refresh for it was marked within the
  /// stale-while-revalidate window.
  pub fn needs_refresh(&self, query: &Q) -> bool {
    self.key_needs_refresh(&query.cache_key(), self.list_freshness(query))
  }

  pub fn mark_refreshed(&mut self, query: &Q) {
    let now = self.now();
    self.refresh.mark(query.cache_key(), now);
  }

  /// Entity counterpart of [`Self::needs_refresh`].
  pub fn needs_entity_refresh(&self, id: &str) -> bool {
    let key = CacheKey::entity(T::entity_type(), id);
    self.key_needs_refresh(&key, self.entity_freshness(id))
  }

  pub fn mark_entity_refreshed(&mut self, id: &str) {
    let now = self.now();
    self
      .refresh
      .mark(CacheKey::entity(T::entity_type(), id), now);
  }

  fn key_needs_refresh(&self, key: &CacheKey, freshness: Option<Freshness>) -> bool {
    freshness == Some(Freshness::Stale) && !self.refresh.recently_marked(key, self.now())
  }

  // ==========================================================================
  // Introspection
  // ==========================================================================

  pub fn stats(&self) -> CacheStats {
    CacheStats {
      entity_count: self.entities.len(),
      list_count: self.lists.len(),
      approx_bytes: self.entities.approx_bytes() + self.lists.approx_bytes(),
    }
  }
}
