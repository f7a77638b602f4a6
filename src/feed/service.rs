//! Feed cache service: posts with their feed pages, plus post authors.

use std::sync::Arc;

use color_eyre::Result;
use serde_json::{Map, Value};

use crate::cache::{
  Cache, CacheConfig, CacheLayer, CacheStats, Clock, GlobalRefresh, NoQuery, SharedCache,
  Subscription, SystemClock,
};

use super::cache::FeedFilter;
use super::types::{Post, User};

/// Constructed once and handed to every consumer by clone.
///
/// Owns the post cache (entities plus feed pages), the user cache (entities
/// only) and the global refresh broadcast.
#[derive(Clone)]
pub struct FeedCache {
  posts: CacheLayer<Post, FeedFilter>,
  users: CacheLayer<User, NoQuery>,
  refresh: GlobalRefresh,
}

impl FeedCache {
  pub fn new(config: &CacheConfig) -> Result<Self> {
    Self::with_clock(config, Arc::new(SystemClock))
  }

  pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
    let posts = Cache::with_clock(config, Arc::clone(&clock))?;
    let users = Cache::with_clock(config, clock)?;
    Ok(Self {
      posts: CacheLayer::new(SharedCache::new(posts)),
      users: CacheLayer::new(SharedCache::new(users)),
      refresh: GlobalRefresh::new(),
    })
  }

  pub fn posts(&self) -> &CacheLayer<Post, FeedFilter> {
    &self.posts
  }

  pub fn users(&self) -> &CacheLayer<User, NoQuery> {
    &self.users
  }

  /// Cache a fetched feed page together with the authors it references.
  pub fn set_page(&self, filter: &FeedFilter, posts: Vec<Post>, authors: Vec<User>) {
    let users = self.users.cache();
    for author in authors {
      users.set_entity(author);
    }
    self.posts.cache().set_list(filter, posts);
  }

  /// Optimistically flip the current user's like on a post.
  ///
  /// Returns the new liked state, or `None` if the post is not cached.
  pub fn toggle_like(&self, post_id: &str) -> Option<bool> {
    self.posts.cache().with(|cache| {
      let post = cache.get_entity(post_id)?;
      let liked = !post.liked;
      let likes = if liked {
        post.likes.saturating_add(1)
      } else {
        post.likes.saturating_sub(1)
      };
      let mut fields = Map::new();
      fields.insert("liked".to_string(), Value::Bool(liked));
      fields.insert("likes".to_string(), Value::from(likes));
      cache.update_fields(post_id, &fields).then_some(liked)
    })
  }

  /// Optimistically show a freshly published post at the top of the feed.
  pub fn publish(&self, post: Post) {
    self.posts.cache().add_new(post);
  }

  /// Optimistically drop a deleted post.
  pub fn delete(&self, post_id: &str) {
    self.posts.cache().remove_by_id(post_id);
  }

  pub fn on_global_refresh<F>(&self, callback: F) -> Subscription
  where
    F: Fn() -> Result<()> + Send + Sync + 'static,
  {
    self.refresh.subscribe(callback)
  }

  pub fn trigger_global_refresh(&self) -> usize {
    self.refresh.trigger()
  }

  /// Drop all cached posts, pages, users and refresh marks. Subscribers stay.
  pub fn reset(&self) {
    self.posts.cache().reset();
    self.users.cache().reset();
  }

  /// Post and user stats, in that order.
  pub fn stats(&self) -> (CacheStats, CacheStats) {
    (self.posts.cache().stats(), self.users.cache().stats())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ManualClock;
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn post(id: &str) -> Post {
    Post {
      id: id.to_string(),
      author_id: "u1".to_string(),
      content: format!("post {}", id),
      image_url: None,
      tags: vec![],
      likes: 0,
      comments: 0,
      liked: false,
      created_at: "2026-01-01T00:00:00Z".to_string(),
    }
  }

  fn alice() -> User {
    User {
      id: "u1".to_string(),
      name: "Alice".to_string(),
      avatar_url: None,
    }
  }

  fn feed() -> FeedCache {
    FeedCache::with_clock(&CacheConfig::default(), Arc::new(ManualClock::default())).unwrap()
  }

  #[test]
  fn test_set_page_caches_authors() {
    let feed = feed();
    feed.set_page(&FeedFilter::default(), vec![post("p1")], vec![alice()]);

    assert_eq!(feed.users().cache().get_entity("u1").unwrap().name, "Alice");
    assert_eq!(
      feed.posts().cache().get_list(&FeedFilter::default()).unwrap().len(),
      1
    );
  }

  #[test]
  fn test_toggle_like_visible_in_page() {
    let feed = feed();
    feed.set_page(&FeedFilter::default(), vec![post("p1")], vec![]);

    assert_eq!(feed.toggle_like("p1"), Some(true));
    let page = feed.posts().cache().get_list(&FeedFilter::default()).unwrap();
    assert_eq!(page[0].likes, 1);
    assert!(page[0].liked);

    assert_eq!(feed.toggle_like("p1"), Some(false));
    assert_eq!(feed.posts().cache().get_entity("p1").unwrap().likes, 0);
  }

  #[test]
  fn test_toggle_like_uncached_post() {
    assert_eq!(feed().toggle_like("missing"), None);
  }

  #[test]
  fn test_publish_and_delete() {
    let feed = feed();
    feed.set_page(&FeedFilter::default(), vec![post("p2")], vec![]);

    feed.publish(post("p1"));
    let page = feed.posts().cache().get_list(&FeedFilter::default()).unwrap();
    assert_eq!(page[0].id, "p1");

    feed.delete("p1");
    assert!(feed.posts().cache().get_list(&FeedFilter::default()).is_none());
    assert!(feed.posts().cache().get_entity("p2").is_some());
  }

  #[test]
  fn test_global_refresh_and_reset() {
    let feed = feed();
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = Arc::clone(&count);
    let _sub = feed.on_global_refresh(move || {
      count_clone.fetch_add(1, Ordering::SeqCst);
      Ok(())
    });

    feed.set_page(&FeedFilter::default(), vec![post("p1")], vec![alice()]);
    assert_eq!(feed.trigger_global_refresh(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    feed.reset();
    let (posts, users) = feed.stats();
    assert_eq!(posts, CacheStats::default());
    assert_eq!(users, CacheStats::default());
    assert_eq!(feed.trigger_global_refresh(), 1);
  }
}
