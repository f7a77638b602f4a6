use serde::{Deserialize, Serialize};

/// A news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
  pub id: String,
  pub category_id: String,
  pub title: String,
  #[serde(default)]
  pub summary: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub views: u64,
  /// Whether the current user bookmarked this article
  #[serde(default)]
  pub bookmarked: bool,
  pub published_at: String,
}

/// News category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub id: String,
  pub name: String,
  pub slug: String,
}
