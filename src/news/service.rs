//! News cache service: articles with their listing pages, plus categories.

use std::sync::Arc;

use color_eyre::Result;
use serde_json::{Map, Value};

use crate::cache::{
  Cache, CacheConfig, CacheLayer, CacheStats, Clock, GlobalRefresh, NoQuery, SharedCache,
  Subscription, SystemClock,
};

use super::cache::NewsFilter;
use super::types::{Article, Category};

#[derive(Clone)]
pub struct NewsCache {
  articles: CacheLayer<Article, NewsFilter>,
  categories: CacheLayer<Category, NoQuery>,
  refresh: GlobalRefresh,
}

impl NewsCache {
  pub fn new(config: &CacheConfig) -> Result<Self> {
    Self::with_clock(config, Arc::new(SystemClock))
  }

  pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
    let articles = Cache::with_clock(config, Arc::clone(&clock))?;
    let categories = Cache::with_clock(config, clock)?;
    Ok(Self {
      articles: CacheLayer::new(SharedCache::new(articles)),
      categories: CacheLayer::new(SharedCache::new(categories)),
      refresh: GlobalRefresh::new(),
    })
  }

  pub fn articles(&self) -> &CacheLayer<Article, NewsFilter> {
    &self.articles
  }

  pub fn categories(&self) -> &CacheLayer<Category, NoQuery> {
    &self.categories
  }

  pub fn set_categories(&self, categories: Vec<Category>) {
    let cache = self.categories.cache();
    for category in categories {
      cache.set_entity(category);
    }
  }

  /// Every cached category, sorted by name.
  pub fn all_categories(&self) -> Vec<Category> {
    let mut categories: Vec<Category> = self
      .categories
      .cache()
      .get_all_cached_entities()
      .into_values()
      .collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    categories
  }

  /// Optimistically count a view. Returns the new count if the article is cached.
  pub fn record_view(&self, article_id: &str) -> Option<u64> {
    self.articles.cache().with(|cache| {
      let views = cache.get_entity(article_id)?.views.saturating_add(1);
      let mut fields = Map::new();
      fields.insert("views".to_string(), Value::from(views));
      cache.update_fields(article_id, &fields).then_some(views)
    })
  }

  /// Optimistically flip the bookmark flag. Returns the new state if cached.
  pub fn toggle_bookmark(&self, article_id: &str) -> Option<bool> {
    self.articles.cache().with(|cache| {
      let bookmarked = !cache.get_entity(article_id)?.bookmarked;
      let mut fields = Map::new();
      fields.insert("bookmarked".to_string(), Value::Bool(bookmarked));
      cache.update_fields(article_id, &fields).then_some(bookmarked)
    })
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

  pub fn reset(&self) {
    self.articles.cache().reset();
    self.categories.cache().reset();
  }

  /// Article and category stats, in that order.
  pub fn stats(&self) -> (CacheStats, CacheStats) {
    (
      self.articles.cache().stats(),
      self.categories.cache().stats(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ManualClock;

  fn article(id: &str, category: &str) -> Article {
    Article {
      id: id.to_string(),
      category_id: category.to_string(),
      title: format!("Article {}", id),
      summary: None,
      image_url: None,
      tags: vec![],
      views: 0,
      bookmarked: false,
      published_at: "2026-01-01T00:00:00Z".to_string(),
    }
  }

  fn category(id: &str, name: &str) -> Category {
    Category {
      id: id.to_string(),
      name: name.to_string(),
      slug: name.to_lowercase(),
    }
  }

  fn news() -> NewsCache {
    NewsCache::with_clock(&CacheConfig::default(), Arc::new(ManualClock::default())).unwrap()
  }

  #[test]
  fn test_categories_sorted() {
    let news = news();
    news.set_categories(vec![category("c2", "Tech"), category("c1", "Sports")]);
    let names: Vec<_> = news.all_categories().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Sports", "Tech"]);
  }

  #[test]
  fn test_record_view_propagates() {
    let news = news();
    let filter = NewsFilter::in_category("tech");
    news
      .articles()
      .cache()
      .set_list(&filter, vec![article("a1", "tech"), article("a2", "tech")]);

    assert_eq!(news.record_view("a2"), Some(1));
    assert_eq!(news.record_view("a2"), Some(2));
    let page = news.articles().cache().get_list(&filter).unwrap();
    assert_eq!(page[1].views, 2);
    assert_eq!(news.record_view("missing"), None);
  }

  #[test]
  fn test_toggle_bookmark() {
    let news = news();
    news.articles().cache().set_entity(article("a1", "tech"));
    assert_eq!(news.toggle_bookmark("a1"), Some(true));
    assert!(news.articles().cache().get_entity("a1").unwrap().bookmarked);
  }

  #[test]
  fn test_reset() {
    let news = news();
    news.set_categories(vec![category("c1", "Tech")]);
    news
      .articles()
      .cache()
      .set_list(&NewsFilter::default(), vec![article("a1", "c1")]);

    news.reset();
    assert!(news.all_categories().is_empty());
    assert_eq!(news.stats().0, CacheStats::default());
  }
}
