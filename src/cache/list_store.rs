//! Ordered id sequences per list query.
//!
//! Lists reference entities by id and never own them; resolution goes through
//! the [`EntityStore`] so content edits are visible to every list at once.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::entity_store::EntityStore;
use super::staleness::Staleness;
use super::traits::{CacheKey, Cacheable, Freshness};

/// One cached list view.
#[derive(Debug, Clone)]
pub struct ListEntry {
  /// Entity ids in query order
  pub ids: Vec<String>,
  /// When the list was last written
  pub cached_at: DateTime<Utc>,
  /// Description of the query that produced this list
  pub filter: String,
  seq: u64,
}

/// Result of a cached list lookup.
#[derive(Debug, Clone)]
pub struct CachedList<T> {
  /// The resolved entities in order
  pub entities: Vec<T>,
  /// When the list was cached
  pub cached_at: DateTime<Utc>,
  /// Classification at the time of the read
  pub freshness: Freshness,
}

#[derive(Debug)]
pub struct ListStore {
  entries: HashMap<CacheKey, ListEntry>,
  staleness: Staleness,
  max_pages: usize,
  next_seq: u64,
}

impl ListStore {
  pub fn new(staleness: Staleness, max_pages: usize) -> Self {
    Self {
      entries: HashMap::new(),
      staleness,
      max_pages,
      next_seq: 0,
    }
  }

  /// Resolve a list through `entities`.
  ///
  /// A missing or expired list, or any id that no longer resolves, makes the
  /// whole read a miss. Partial lists are never returned.
  pub fn get<T: Cacheable>(
    &self,
    key: &CacheKey,
    entities: &EntityStore<T>,
    now: DateTime<Utc>,
  ) -> Option<CachedList<T>> {
    let entry = self.live_entry(key, now)?;

    let mut resolved = Vec::with_capacity(entry.ids.len());
    for id in &entry.ids {
      match entities.get(id, now) {
        Some(cached) => resolved.push(cached.entity.clone()),
        None => {
          trace!(key = %key, id = %id, "List references a missing entity, treating as miss");
          return None;
        }
      }
    }

    Some(CachedList {
      entities: resolved,
      cached_at: entry.cached_at,
      freshness: self.staleness.classify(entry.cached_at, now),
    })
  }

  pub fn freshness(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Freshness> {
    self
      .entries
      .get(key)
      .map(|e| self.staleness.classify(e.cached_at, now))
  }

  /// Store an ordered id sequence. Returns the key evicted to stay within
  /// capacity, if any.
  pub fn put(
    &mut self,
    key: CacheKey,
    ids: Vec<String>,
    filter: String,
    now: DateTime<Utc>,
  ) -> Option<CacheKey> {
    let seq = self.bump_seq();
    self.entries.insert(
      key,
      ListEntry {
        ids,
        cached_at: now,
        filter,
        seq,
      },
    );
    self.evict_over_capacity()
  }

  /// Move `id` to the front of the list under `key`, if that list is live.
  ///
  /// An expired list is dropped instead of revived. Returns whether the
  /// list was patched.
  pub fn splice_front(&mut self, key: &CacheKey, id: &str, now: DateTime<Utc>) -> bool {
    if self.live_entry(key, now).is_none() {
      self.entries.remove(key);
      return false;
    }
    let seq = self.bump_seq();
    let Some(entry) = self.entries.get_mut(key) else {
      return false;
    };
    entry.ids.retain(|existing| existing != id);
    entry.ids.insert(0, id.to_string());
    entry.cached_at = now;
    entry.seq = seq;
    true
  }

  /// Remove `id` from every live list containing it, keeping the remaining
  /// order. Expired lists that contain `id` are dropped instead of revived.
  /// Returns the number of lists patched.
  pub fn splice_out(&mut self, id: &str, now: DateTime<Utc>) -> usize {
    let staleness = self.staleness;
    self.entries.retain(|_, entry| {
      let expired = staleness.is_expired(entry.cached_at, now);
      !(expired && entry.ids.iter().any(|existing| existing == id))
    });

    let mut patched = 0;
    for entry in self.entries.values_mut() {
      if entry.ids.iter().any(|existing| existing == id) {
        entry.ids.retain(|existing| existing != id);
        entry.cached_at = now;
        entry.seq = self.next_seq;
        self.next_seq += 1;
        patched += 1;
      }
    }
    patched
  }

  /// Drop every list whose ids include `id`. Returns the number dropped.
  pub fn invalidate_containing(&mut self, id: &str) -> usize {
    let before = self.entries.len();
    self
      .entries
      .retain(|_, entry| !entry.ids.iter().any(|existing| existing == id));
    let dropped = before - self.entries.len();
    if dropped > 0 {
      debug!(id, dropped, "Invalidated lists containing entity");
    }
    dropped
  }

  pub fn invalidate(&mut self, key: &CacheKey) -> bool {
    self.entries.remove(key).is_some()
  }

  pub fn invalidate_all(&mut self) {
    if !self.entries.is_empty() {
      debug!(dropped = self.entries.len(), "Invalidated all lists");
    }
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Id and key bytes, summed over all lists.
  pub fn approx_bytes(&self) -> usize {
    self
      .entries
      .iter()
      .map(|(key, e)| key.as_str().len() + e.ids.iter().map(String::len).sum::<usize>())
      .sum()
  }

  fn live_entry(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<&ListEntry> {
    self
      .entries
      .get(key)
      .filter(|e| !self.staleness.is_expired(e.cached_at, now))
  }

  fn bump_seq(&mut self) -> u64 {
    let seq = self.next_seq;
    self.next_seq += 1;
    seq
  }

  fn evict_over_capacity(&mut self) -> Option<CacheKey> {
    if self.entries.len() <= self.max_pages {
      return None;
    }
    let oldest = self
      .entries
      .iter()
      .min_by_key(|(_, e)| (e.cached_at, e.seq))
      .map(|(key, _)| key.clone())?;
    self.entries.remove(&oldest);
    debug!(key = %oldest, "Evicted oldest list");
    Some(oldest)
  }
}
