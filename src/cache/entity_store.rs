//! Canonical per-id entity copies with age tracking and a capacity bound.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::staleness::Staleness;
use super::traits::{Cacheable, Freshness};

/// A single cached entity.
#[derive(Debug, Clone)]
pub struct CachedEntity<T> {
  /// The cached entity
  pub entity: T,
  /// When the entity was last written
  pub cached_at: DateTime<Utc>,
  /// Write order, breaks `cached_at` ties during eviction
  seq: u64,
}

/// Owns every cached entity of one type. All operations are total.
#[derive(Debug)]
pub struct EntityStore<T> {
  entries: HashMap<String, CachedEntity<T>>,
  staleness: Staleness,
  max_entities: usize,
  next_seq: u64,
}

impl<T: Cacheable> EntityStore<T> {
  pub fn new(staleness: Staleness, max_entities: usize) -> Self {
    Self {
      entries: HashMap::new(),
      staleness,
      max_entities,
      next_seq: 0,
    }
  }

  /// Look up an unexpired entity.
  pub fn get(&self, id: &str, now: DateTime<Utc>) -> Option<&CachedEntity<T>> {
    self
      .entries
      .get(id)
      .filter(|e| !self.staleness.is_expired(e.cached_at, now))
  }

  /// Classify the record for `id`, or `None` if there is no record at all.
  pub fn freshness(&self, id: &str, now: DateTime<Utc>) -> Option<Freshness> {
    self
      .entries
      .get(id)
      .map(|e| self.staleness.classify(e.cached_at, now))
  }

  /// Insert or overwrite. Returns the id evicted to stay within capacity, if any.
  pub fn put(&mut self, entity: T, now: DateTime<Utc>) -> Option<String> {
    let id = entity.cache_key();
    let seq = self.bump_seq();
    self.entries.insert(
      id,
      CachedEntity {
        entity,
        cached_at: now,
        seq,
      },
    );
    self.evict_over_capacity()
  }

  /// Shallow-merge `fields` into an existing, unexpired entity.
  ///
  /// Never creates an entity. Returns whether the merge was applied; a patch
  /// that does not deserialize back into `T`, or that changes the entity's id,
  /// is rejected and leaves the entity untouched.
  pub fn merge(&mut self, id: &str, fields: &Map<String, Value>, now: DateTime<Utc>) -> bool {
    let staleness = self.staleness;
    let seq = self.next_seq;
    let Some(entry) = self
      .entries
      .get_mut(id)
      .filter(|e| !staleness.is_expired(e.cached_at, now))
    else {
      return false;
    };

    let mut object = match serde_json::to_value(&entry.entity) {
      Ok(Value::Object(object)) => object,
      Ok(_) => {
        warn!(entity_type = T::entity_type(), id, "Entity is not a JSON object, merge skipped");
        return false;
      }
      Err(e) => {
        warn!(entity_type = T::entity_type(), id, "Failed to serialize entity for merge: {}", e);
        return false;
      }
    };
    for (field, value) in fields {
      object.insert(field.clone(), value.clone());
    }

    match serde_json::from_value::<T>(Value::Object(object)) {
      Ok(merged) if merged.cache_key() == id => {
        entry.entity = merged;
        entry.cached_at = now;
        entry.seq = seq;
        self.next_seq += 1;
        true
      }
      Ok(_) => {
        warn!(entity_type = T::entity_type(), id, "Merge would change entity id, rejected");
        false
      }
      Err(e) => {
        warn!(entity_type = T::entity_type(), id, "Merge produced an invalid entity: {}", e);
        false
      }
    }
  }

  /// Idempotent delete. Returns whether a record existed.
  pub fn remove(&mut self, id: &str) -> bool {
    self.entries.remove(id).is_some()
  }

  /// Copies of every unexpired entity, keyed by id.
  pub fn snapshot(&self, now: DateTime<Utc>) -> HashMap<String, T> {
    self
      .entries
      .iter()
      .filter(|(_, e)| !self.staleness.is_expired(e.cached_at, now))
      .map(|(id, e)| (id.clone(), e.entity.clone()))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  /// Serialized payload size plus id bytes, summed over all records.
  pub fn approx_bytes(&self) -> usize {
    self
      .entries
      .iter()
      .map(|(id, e)| id.len() + serde_json::to_vec(&e.entity).map(|v| v.len()).unwrap_or(0))
      .sum()
  }

  fn bump_seq(&mut self) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    seq
  }

  fn evict_over_capacity(&mut self) -> Option<String> {
    if self.entries.len() <= self.max_entities {
      return None;
    }
    let oldest = self
      .entries
      .iter()
      .min_by_key(|(_, e)| (e.cached_at, e.seq))
      .map(|(id, _)| id.clone())?;
    self.entries.remove(&oldest);
    debug!(entity_type = T::entity_type(), id = %oldest, "Evicted oldest entity");
    Some(oldest)
  }
}
