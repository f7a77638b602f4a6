//! Age-based Fresh/Stale/Expired classification.

use chrono::{DateTime, Duration, Utc};

use super::config::CacheConfig;
use super::traits::Freshness;

/// Classifies record ages against the configured thresholds.
///
/// Invariant: `fresh < max_age`.
#[derive(Debug, Clone, Copy)]
pub struct Staleness {
  fresh: Duration,
  max_age: Duration,
}

impl Staleness {
  pub fn new(config: &CacheConfig) -> Self {
    Self {
      fresh: config.fresh_duration(),
      max_age: config.max_age(),
    }
  }

  pub fn classify(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
    let age = now - cached_at;
    if age >= self.max_age {
      Freshness::Expired
    } else if age >= self.fresh {
      Freshness::Stale
    } else {
      Freshness::Fresh
    }
  }

  pub fn is_expired(&self, cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    self.classify(cached_at, now) == Freshness::Expired
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn staleness() -> Staleness {
    Staleness::new(&CacheConfig {
      fresh_secs: 300,
      max_age_secs: 1800,
      ..CacheConfig::default()
    })
  }

  #[test]
  fn test_boundaries() {
    let s = staleness();
    let t0 = Utc::now();
    assert_eq!(s.classify(t0, t0), Freshness::Fresh);
    assert_eq!(
      s.classify(t0, t0 + Duration::seconds(299)),
      Freshness::Fresh
    );
    assert_eq!(
      s.classify(t0, t0 + Duration::seconds(300)),
      Freshness::Stale
    );
    assert_eq!(
      s.classify(t0, t0 + Duration::seconds(1799)),
      Freshness::Stale
    );
    assert_eq!(
      s.classify(t0, t0 + Duration::seconds(1800)),
      Freshness::Expired
    );
  }

  #[test]
  fn test_clock_skew_counts_as_fresh() {
    let s = staleness();
    let t0 = Utc::now();
    assert_eq!(s.classify(t0, t0 - Duration::seconds(5)), Freshness::Fresh);
  }
}
