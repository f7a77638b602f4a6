//! Caching implementations for news types.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, Cacheable, KeyEncoder, QueryKey};

use super::types::{Article, Category};

impl Cacheable for Article {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "article"
  }
}

impl Cacheable for Category {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "category"
  }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// One page of the news listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsFilter {
  pub page: u32,
  pub page_size: u32,
  pub category_id: Option<String>,
  /// Free-text search, trimmed before keying
  pub search: Option<String>,
  pub tags: Vec<String>,
}

impl Default for NewsFilter {
  fn default() -> Self {
    Self {
      page: 0,
      page_size: DEFAULT_PAGE_SIZE,
      category_id: None,
      search: None,
      tags: Vec::new(),
    }
  }
}

impl NewsFilter {
  pub fn page(page: u32) -> Self {
    Self {
      page,
      ..Self::default()
    }
  }

  pub fn in_category(category_id: &str) -> Self {
    Self {
      category_id: Some(category_id.to_string()),
      ..Self::default()
    }
  }

  /// A blank search is the same query as no search.
  fn normalized_search(&self) -> Option<&str> {
    self
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
  }
}

impl QueryKey for NewsFilter {
  fn cache_key(&self) -> CacheKey {
    KeyEncoder::new("news")
      .field("page", self.page)
      .field("size", self.page_size)
      .opt("category", self.category_id.as_deref())
      .opt("search", self.normalized_search())
      .set("tags", &self.tags)
      .finish()
  }

  fn description(&self) -> String {
    let mut desc = format!("news page {}", self.page);
    if let Some(category) = &self.category_id {
      desc.push_str(&format!(" in {}", category));
    }
    if let Some(search) = self.normalized_search() {
      desc.push_str(&format!(" matching '{}'", search));
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
