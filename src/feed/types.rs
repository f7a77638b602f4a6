use serde::{Deserialize, Serialize};

/// A post in the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  pub id: String,
  pub author_id: String,
  pub content: String,
  #[serde(default)]
  pub image_url: Option<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub likes: u32,
  #[serde(default)]
  pub comments: u32,
  /// Whether the current user has liked this post
  #[serde(default)]
  pub liked: bool,
  pub created_at: String,
}

/// Author of feed posts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub avatar_url: Option<String>,
}

/// Feed ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
  #[default]
  Latest,
  Popular,
}

impl FeedSort {
  pub fn as_str(self) -> &'static str {
    match self {
      FeedSort::Latest => "latest",
      FeedSort::Popular => "popular",
    }
  }
}
