//! Cloneable handle to one cache shared by many call sites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::engine::{Cache, CacheStats};
use super::list_store::CachedList;
use super::traits::{Cacheable, Freshness, QueryKey};

/// Shared cache handle. Each call takes the lock for the duration of one
/// operation, so every operation is atomic relative to the others.
pub struct SharedCache<T, Q> {
  inner: Arc<Mutex<Cache<T, Q>>>,
}

impl<T, Q> Clone for SharedCache<T, Q> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T: Cacheable, Q: QueryKey> SharedCache<T, Q> {
  pub fn new(cache: Cache<T, Q>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(cache)),
    }
  }

  /// Run several operations under one lock.
  pub fn with<R>(&self, f: impl FnOnce(&mut Cache<T, Q>) -> R) -> R {
    f(&mut self.lock())
  }

  pub fn get_list(&self, query: &Q) -> Option<Vec<T>> {
    self.lock().get_list(query)
  }

  pub fn get_list_with_meta(&self, query: &Q) -> Option<CachedList<T>> {
    self.lock().get_list_with_meta(query)
  }

  pub fn get_entity(&self, id: &str) -> Option<T> {
    self.lock().get_entity(id)
  }

  pub fn get_entity_with_meta(&self, id: &str) -> Option<(T, DateTime<Utc>, Freshness)> {
    self.lock().get_entity_with_meta(id)
  }

  pub fn get_all_cached_entities(&self) -> HashMap<String, T> {
    self.lock().get_all_cached_entities()
  }

  pub fn list_freshness(&self, query: &Q) -> Option<Freshness> {
    self.lock().list_freshness(query)
  }

  pub fn entity_freshness(&self, id: &str) -> Option<Freshness> {
    self.lock().entity_freshness(id)
  }

  pub fn set_list(&self, query: &Q, items: Vec<T>) {
    self.lock().set_list(query, items);
  }

  pub fn set_entity(&self, entity: T) {
    self.lock().set_entity(entity);
  }

  pub fn add_new(&self, entity: T) {
    self.lock().add_new(entity);
  }

  pub fn update_fields(&self, id: &str, fields: &Map<String, Value>) -> bool {
    self.lock().update_fields(id, fields)
  }

  pub fn remove_by_id(&self, id: &str) {
    self.lock().remove_by_id(id);
  }

  pub fn invalidate_list(&self, query: &Q) {
    self.lock().invalidate_list(query);
  }

  pub fn invalidate_all(&self) {
    self.lock().invalidate_all();
  }

  pub fn reset(&self) {
    self.lock().reset();
  }

  pub fn needs_refresh(&self, query: &Q) -> bool {
    self.lock().needs_refresh(query)
  }

  pub fn mark_refreshed(&self, query: &Q) {
    self.lock().mark_refreshed(query);
  }

  /// Check-and-mark in one step: returns true at most once per
  /// stale-while-revalidate window for this query.
  pub fn claim_refresh(&self, query: &Q) -> bool {
    let mut cache = self.lock();
    let claimed = cache.needs_refresh(query);
    if claimed {
      cache.mark_refreshed(query);
    }
    claimed
  }

  pub fn needs_entity_refresh(&self, id: &str) -> bool {
    self.lock().needs_entity_refresh(id)
  }

  pub fn mark_entity_refreshed(&self, id: &str) {
    self.lock().mark_entity_refreshed(id);
  }

  /// Entity counterpart of [`Self::claim_refresh`].
  pub fn claim_entity_refresh(&self, id: &str) -> bool {
    let mut cache = self.lock();
    let claimed = cache.needs_entity_refresh(id);
    if claimed {
      cache.mark_entity_refreshed(id);
    }
    claimed
  }

  pub fn stats(&self) -> CacheStats {
    self.lock().stats()
  }

  fn lock(&self) -> MutexGuard<'_, Cache<T, Q>> {
    // Every mutation completes before the guard drops, so a poisoned lock
    // still guards consistent state.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
