//! Deterministic replay of recorded feed cache operations.
//!
//! A trace is a YAML list of steps, each stamped with seconds since the start
//! of the trace:
//!
//! ```yaml
//! - at_secs: 0
//!   op: set_list
//!   filter: { page: 0 }
//!   posts: [{ id: p1, author_id: u1, content: hi, created_at: "2026-01-01" }]
//! - at_secs: 600
//!   op: get_list
//!   filter: { page: 0 }
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::{Cache, CacheConfig, Freshness, ManualClock, QueryKey};
use crate::feed::{FeedFilter, Post};

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
  pub at_secs: u64,
  #[serde(flatten)]
  pub op: Op,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
  SetList {
    #[serde(default)]
    filter: FeedFilter,
    posts: Vec<Post>,
  },
  SetEntity {
    post: Post,
  },
  GetList {
    #[serde(default)]
    filter: FeedFilter,
  },
  GetEntity {
    id: String,
  },
  AddNew {
    post: Post,
  },
  UpdateFields {
    id: String,
    fields: Map<String, Value>,
  },
  Remove {
    id: String,
  },
  NeedsRefresh {
    #[serde(default)]
    filter: FeedFilter,
  },
  MarkRefreshed {
    #[serde(default)]
    filter: FeedFilter,
  },
  Stats,
}

pub fn load_trace(path: &Path) -> Result<Vec<Step>> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read trace file {}: {}", path.display(), e))?;
  parse_trace(&contents).map_err(|e| eyre!("Invalid trace file {}: {}", path.display(), e))
}

pub fn parse_trace(contents: &str) -> Result<Vec<Step>> {
  let steps: Vec<Step> =
    serde_yaml::from_str(contents).map_err(|e| eyre!("Failed to parse trace: {}", e))?;

  if let Some(pair) = steps.windows(2).find(|w| w[1].at_secs < w[0].at_secs) {
    return Err(eyre!(
      "Trace steps must be in time order: {}s follows {}s",
      pair[1].at_secs,
      pair[0].at_secs
    ));
  }
  Ok(steps)
}

/// Replay `steps` against a fresh post cache and describe every observable
/// result, one line per step.
pub fn replay(steps: &[Step], config: &CacheConfig) -> Result<Vec<String>> {
  let start = DateTime::<Utc>::UNIX_EPOCH;
  let clock = Arc::new(ManualClock::new(start));
  let mut cache: Cache<Post, FeedFilter> = Cache::with_clock(config, clock.clone())?;

  let mut lines = Vec::with_capacity(steps.len());
  for step in steps {
    let at = i64::try_from(step.at_secs)
      .ok()
      .and_then(Duration::try_seconds)
      .and_then(|offset| start.checked_add_signed(offset))
      .ok_or_else(|| eyre!("at_secs {} out of range", step.at_secs))?;
    clock.set(at);
    debug!(at_secs = step.at_secs, op = ?step.op, "Replaying step");

    let outcome = apply(&mut cache, &step.op);
    lines.push(format!("[t={}s] {}", step.at_secs, outcome));
  }
  Ok(lines)
}

fn apply(cache: &mut Cache<Post, FeedFilter>, op: &Op) -> String {
  match op {
    Op::SetList { filter, posts } => {
      cache.set_list(filter, posts.clone());
      format!("set_list {} ({} posts)", filter.description(), posts.len())
    }
    Op::SetEntity { post } => {
      cache.set_entity(post.clone());
      format!("set_entity {}", post.id)
    }
    Op::GetList { filter } => {
      let freshness = cache.list_freshness(filter);
      match cache.get_list(filter) {
        Some(posts) => format!(
          "get_list {} -> hit [{}] ({})",
          filter.description(),
          posts
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
          freshness_label(freshness)
        ),
        None => format!("get_list {} -> miss", filter.description()),
      }
    }
    Op::GetEntity { id } => {
      let freshness = cache.entity_freshness(id);
      match cache.get_entity(id) {
        Some(post) => format!(
          "get_entity {} -> hit likes={} ({})",
          id,
          post.likes,
          freshness_label(freshness)
        ),
        None => format!("get_entity {} -> miss", id),
      }
    }
    Op::AddNew { post } => {
      cache.add_new(post.clone());
      format!("add_new {}", post.id)
    }
    Op::UpdateFields { id, fields } => {
      let applied = cache.update_fields(id, fields);
      format!(
        "update_fields {} -> {}",
        id,
        if applied { "applied" } else { "skipped" }
      )
    }
    Op::Remove { id } => {
      cache.remove_by_id(id);
      format!("remove {}", id)
    }
    Op::NeedsRefresh { filter } => {
      format!(
        "needs_refresh {} -> {}",
        filter.description(),
        cache.needs_refresh(filter)
      )
    }
    Op::MarkRefreshed { filter } => {
      cache.mark_refreshed(filter);
      format!("mark_refreshed {}", filter.description())
    }
    Op::Stats => {
      let stats = cache.stats();
      format!(
        "stats entities={} lists={} bytes={}",
        stats.entity_count, stats.list_count, stats.approx_bytes
      )
    }
  }
}

fn freshness_label(freshness: Option<Freshness>) -> &'static str {
  match freshness {
    Some(Freshness::Fresh) => "fresh",
    Some(Freshness::Stale) => "stale",
    Some(Freshness::Expired) => "expired",
    None => "absent",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TRACE: &str = r#"
- at_secs: 0
  op: set_list
  posts:
    - { id: p2, author_id: u1, content: second, created_at: "2026-01-02" }
    - { id: p3, author_id: u1, content: third, created_at: "2026-01-03" }
- at_secs: 10
  op: add_new
  post: { id: p1, author_id: u2, content: first, created_at: "2026-01-04" }
- at_secs: 20
  op: update_fields
  id: p2
  fields: { likes: 5 }
- at_secs: 30
  op: get_list
- at_secs: 400
  op: get_entity
  id: p2
- at_secs: 400
  op: needs_refresh
- at_secs: 400
  op: mark_refreshed
- at_secs: 410
  op: needs_refresh
- at_secs: 420
  op: remove
  id: p3
- at_secs: 420
  op: get_list
- at_secs: 420
  op: stats
"#;

  #[test]
  fn test_replay_trace() {
    let steps = parse_trace(TRACE).unwrap();
    let lines = replay(&steps, &CacheConfig::default()).unwrap();

    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "[t=0s] set_list latest feed page 0 (2 posts)");
    assert_eq!(
      lines[3],
      "[t=30s] get_list latest feed page 0 -> hit [p1, p2, p3] (fresh)"
    );
    assert_eq!(lines[4], "[t=400s] get_entity p2 -> hit likes=5 (stale)");
    assert_eq!(lines[5], "[t=400s] needs_refresh latest feed page 0 -> true");
    assert_eq!(lines[7], "[t=410s] needs_refresh latest feed page 0 -> false");
    assert_eq!(lines[9], "[t=420s] get_list latest feed page 0 -> miss");
    assert!(lines[10].starts_with("[t=420s] stats entities=2 lists=0"));
  }

  #[test]
  fn test_out_of_order_trace_rejected() {
    let trace = "- { at_secs: 10, op: stats }\n- { at_secs: 5, op: stats }\n";
    assert!(parse_trace(trace).is_err());
  }

  #[test]
  fn test_huge_offset_is_an_error() {
    let steps = parse_trace("- { at_secs: 10000000000000, op: stats }\n").unwrap();
    let err = replay(&steps, &CacheConfig::default()).unwrap_err();
    assert!(err.to_string().contains("out of range"));
  }

  #[test]
  fn test_unknown_op_rejected() {
    assert!(parse_trace("- { at_secs: 0, op: explode }\n").is_err());
  }
}
