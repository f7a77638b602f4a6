//! Refresh de-duplication and the global refresh broadcast.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use tracing::{debug, warn};

use super::traits::CacheKey;

/// Remembers when a background refresh was last triggered per key.
///
/// Best-effort and time based: it suppresses refresh storms, it does not
/// serialize fetches.
#[derive(Debug)]
pub struct RefreshCoordinator {
  marks: HashMap<CacheKey, DateTime<Utc>>,
  window: Duration,
}

impl RefreshCoordinator {
  pub fn new(window: Duration) -> Self {
    Self {
      marks: HashMap::new(),
      window,
    }
  }

  /// Whether a refresh for `key` was marked within the window.
  pub fn recently_marked(&self, key: &CacheKey, now: DateTime<Utc>) -> bool {
    self
      .marks
      .get(key)
      .is_some_and(|marked| now - *marked < self.window)
  }

  pub fn mark(&mut self, key: CacheKey, now: DateTime<Utc>) {
    let window = self.window;
    self.marks.retain(|_, marked| now - *marked < window);
    self.marks.insert(key, now);
  }

  pub fn forget(&mut self, key: &CacheKey) {
    self.marks.remove(key);
  }

  pub fn clear(&mut self) {
    self.marks.clear();
  }
}

type Callback = Arc<dyn Fn() -> Result<()> + Send + Sync>;

#[derive(Default)]
struct Subscribers {
  next_id: u64,
  callbacks: BTreeMap<u64, Callback>,
}

/// Broadcast for a manual "refresh everything" action.
///
/// Cloning yields another handle to the same subscriber list.
#[derive(Clone, Default)]
pub struct GlobalRefresh {
  inner: Arc<Mutex<Subscribers>>,
}

/// Handle returned by [`GlobalRefresh::subscribe`].
#[must_use = "dropping a Subscription keeps the callback registered; call unsubscribe() to remove it"]
pub struct Subscription {
  id: u64,
  inner: Arc<Mutex<Subscribers>>,
}

impl Subscription {
  pub fn unsubscribe(self) {
    lock(&self.inner).callbacks.remove(&self.id);
  }
}

impl GlobalRefresh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a callback, notified in registration order.
  pub fn subscribe<F>(&self, callback: F) -> Subscription
  where
    F: Fn() -> Result<()> + Send + Sync + 'static,
  {
    let mut subs = lock(&self.inner);
    let id = subs.next_id;
    subs.next_id += 1;
    subs.callbacks.insert(id, Arc::new(callback));
    Subscription {
      id,
      inner: Arc::clone(&self.inner),
    }
  }

  /// Notify every subscriber. A failing or panicking subscriber is logged and
  /// skipped; the rest are still notified. Returns the number that succeeded.
  pub fn trigger(&self) -> usize {
    // Snapshot so callbacks may subscribe or unsubscribe while running
    let callbacks: Vec<(u64, Callback)> = lock(&self.inner)
      .callbacks
      .iter()
      .map(|(id, cb)| (*id, Arc::clone(cb)))
      .collect();

    debug!(subscribers = callbacks.len(), "Triggering global refresh");

    let mut succeeded = 0;
    for (id, callback) in callbacks {
      match catch_unwind(AssertUnwindSafe(|| callback())) {
        Ok(Ok(())) => succeeded += 1,
        Ok(Err(e)) => warn!(subscriber = id, "Global refresh subscriber failed: {}", e),
        Err(_) => warn!(subscriber = id, "Global refresh subscriber panicked"),
      }
    }
    succeeded
  }

  pub fn subscriber_count(&self) -> usize {
    lock(&self.inner).callbacks.len()
  }
}

fn lock(inner: &Mutex<Subscribers>) -> std::sync::MutexGuard<'_, Subscribers> {
  inner.lock().unwrap_or_else(PoisonError::into_inner)
}
