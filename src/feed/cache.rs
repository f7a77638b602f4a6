//! Caching implementations for feed types.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, Cacheable, KeyEncoder, QueryKey};

use super::types::{FeedSort, Post, User};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Post {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "post"
  }
}

impl Cacheable for User {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "user"
  }
}

// ============================================================================
// Query key types
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// One page of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFilter {
  /// Zero-based page index
  pub page: u32,
  pub page_size: u32,
  /// Only posts by this author
  pub author_id: Option<String>,
  /// Only posts carrying all of these tags; order is irrelevant
  pub tags: Vec<String>,
  pub sort: FeedSort,
}

impl Default for FeedFilter {
  fn default() -> Self {
    Self {
      page: 0,
      page_size: DEFAULT_PAGE_SIZE,
      author_id: None,
      tags: Vec::new(),
      sort: FeedSort::Latest,
    }
  }
}

impl FeedFilter {
  pub fn page(page: u32) -> Self {
    Self {
      page,
      ..Self::default()
    }
  }
}

impl QueryKey for FeedFilter {
  fn cache_key(&self) -> CacheKey {
    KeyEncoder::new("feed")
      .field("page", self.page)
      .field("size", self.page_size)
      .opt("author", self.author_id.as_deref())
      .set("tags", &self.tags)
      .field("sort", self.sort.as_str())
      .finish()
  }

  fn description(&self) -> String {
    let mut desc = format!("{} feed page {}", self.sort.as_str(), self.page);
    if let Some(author) = &self.author_id {
      desc.push_str(&format!(" by {}", author));
    }
    if !self.tags.is_empty() {
      desc.push_str(&format!(" tagged {}", self.tags.join(", ")));
    }
    desc
  }

  fn latest() -> Option<Self> {
    Some(Self::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_key() {
    assert_eq!(
      FeedFilter::default().cache_key().as_str(),
      "feed|page:0|size:20|author:@all|tags:@none|sort:latest"
    );
  }

  #[test]
  fn test_defaulted_fields_match_explicit() {
    let parsed: FeedFilter = serde_yaml::from_str("page: 2").unwrap();
    let explicit = FeedFilter {
      page: 2,
      page_size: DEFAULT_PAGE_SIZE,
      author_id: None,
      tags: vec![],
      sort: FeedSort::Latest,
    };
    assert_eq!(parsed.cache_key(), explicit.cache_key());
  }

  #[test]
  fn test_each_field_changes_key() {
    let base = FeedFilter::default();
    let variants = [
      FeedFilter::page(1),
      FeedFilter {
        page_size: 10,
        ..FeedFilter::default()
      },
      FeedFilter {
        author_id: Some("u1".into()),
        ..FeedFilter::default()
      },
      FeedFilter {
        tags: vec!["rust".into()],
        ..FeedFilter::default()
      },
      FeedFilter {
        sort: FeedSort::Popular,
        ..FeedFilter::default()
      },
    ];
    for variant in &variants {
      assert_ne!(variant.cache_key(), base.cache_key(), "{:?}", variant);
    }
  }

  #[test]
  fn test_tag_order_shares_key() {
    let a = FeedFilter {
      tags: vec!["rust".into(), "async".into()],
      ..FeedFilter::default()
    };
    let b = FeedFilter {
      tags: vec!["async".into(), "rust".into()],
      ..FeedFilter::default()
    };
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_description() {
    let filter = FeedFilter {
      author_id: Some("u1".into()),
      ..FeedFilter::page(3)
    };
    assert_eq!(filter.description(), "latest feed page 3 by u1");
  }
}
