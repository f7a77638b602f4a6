//! Construction-time cache configuration.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

/// What `remove_by_id` does to cached lists that reference the removed entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
  /// Drop every list containing the id; the next read is a miss
  #[default]
  Invalidate,
  /// Splice the id out of every list, keeping the remaining order
  Splice,
}

/// Cache thresholds and capacity bounds. Fixed for the lifetime of a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Records younger than this are fresh
  pub fresh_secs: u64,
  /// Records at least this old are treated as absent
  pub max_age_secs: u64,
  /// Minimum gap between two refresh signals for the same key
  pub stale_while_revalidate_secs: u64,
  /// Entity store capacity
  pub max_entities: usize,
  /// List store capacity
  pub max_pages: usize,
  pub on_remove: RemovalPolicy,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      fresh_secs: 5 * 60,
      max_age_secs: 30 * 60,
      stale_while_revalidate_secs: 60,
      max_entities: 500,
      max_pages: 50,
      on_remove: RemovalPolicy::Invalidate,
    }
  }
}

impl CacheConfig {
  pub fn fresh_duration(&self) -> Duration {
    secs(self.fresh_secs)
  }

  pub fn max_age(&self) -> Duration {
    secs(self.max_age_secs)
  }

  pub fn stale_while_revalidate(&self) -> Duration {
    secs(self.stale_while_revalidate_secs)
  }

  /// Check the threshold ordering and capacity bounds.
  pub fn validate(&self) -> Result<()> {
    if self.max_age_secs == 0 {
      return Err(eyre!("cache.max_age_secs must be greater than zero"));
    }
    if self.fresh_secs >= self.max_age_secs {
      return Err(eyre!(
        "cache.fresh_secs ({}) must be less than cache.max_age_secs ({})",
        self.fresh_secs,
        self.max_age_secs
      ));
    }
    if self.max_entities == 0 {
      return Err(eyre!("cache.max_entities must be at least 1"));
    }
    if self.max_pages == 0 {
      return Err(eyre!("cache.max_pages must be at least 1"));
    }
    Ok(())
  }
}

fn secs(s: u64) -> Duration {
  Duration::seconds(i64::try_from(s).unwrap_or(i64::MAX).min(i64::MAX / 1000))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_is_valid() {
    assert!(CacheConfig::default().validate().is_ok());
  }

  #[test]
  fn test_fresh_must_be_below_max_age() {
    let config = CacheConfig {
      fresh_secs: 600,
      max_age_secs: 600,
      ..CacheConfig::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_zero_capacity_rejected() {
    let config = CacheConfig {
      max_pages: 0,
      ..CacheConfig::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_partial_yaml_uses_defaults() {
    let config: CacheConfig = serde_yaml::from_str("fresh_secs: 10\non_remove: splice\n").unwrap();
    assert_eq!(config.fresh_secs, 10);
    assert_eq!(config.max_age_secs, 1800);
    assert_eq!(config.on_remove, RemovalPolicy::Splice);
  }
}
