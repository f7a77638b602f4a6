//! Cache layer that orchestrates stale-while-revalidate reads with network
//! fetching.

use color_eyre::Result;
use std::future::Future;
use tracing::{debug, warn};

use super::shared::SharedCache;
use super::traits::{CacheResult, Cacheable, Freshness, QueryKey};

/// Read-through layer over a [`SharedCache`].
///
/// Fetchers are the only network boundary. A failed fetch never writes to
/// the cache, so whatever was cached before stays servable.
pub struct CacheLayer<T, Q> {
  cache: SharedCache<T, Q>,
}

impl<T, Q> Clone for CacheLayer<T, Q> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
    }
  }
}

impl<T, Q> CacheLayer<T, Q>
where
  T: Cacheable + 'static,
  Q: QueryKey + 'static,
{
  /// Create a new cache layer over the given cache.
  pub fn new(cache: SharedCache<T, Q>) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &SharedCache<T, Q> {
    &self.cache
  }

  /// Fetch a list with stale-while-revalidate semantics.
  ///
  /// 1. Fresh hit - return immediately
  /// 2. Stale hit - return immediately, refetch in the background unless a
  ///    refresh for this query was started within the revalidate window
  /// 3. Miss - fetch, cache, return; fetch errors propagate
  ///
  /// Must be called within a tokio runtime.
  pub async fn fetch_list<F, Fut>(&self, query: &Q, fetcher: F) -> Result<CacheResult<Vec<T>>>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
  {
    if let Some(cached) = self.cache.get_list_with_meta(query) {
      if cached.freshness != Freshness::Stale {
        return Ok(CacheResult::from_cache(
          cached.entities,
          cached.cached_at,
          false,
        ));
      }

      if self.cache.claim_refresh(query) {
        let layer = self.clone();
        let query = query.clone();
        tokio::spawn(async move {
          if let Err(e) = layer.revalidate_list(&query, fetcher).await {
            warn!(query = %query.description(), "Background refresh failed, serving stale: {}", e);
          }
        });
      }

      return Ok(CacheResult::from_cache(
        cached.entities,
        cached.cached_at,
        true,
      ));
    }

    let data = self.revalidate_list(query, fetcher).await?;
    Ok(CacheResult::from_network(data))
  }

  /// Fetch a single entity with stale-while-revalidate semantics.
  ///
  /// Must be called within a tokio runtime.
  pub async fn fetch_one<F, Fut>(&self, id: &str, fetcher: F) -> Result<CacheResult<T>>
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    if let Some((entity, cached_at, freshness)) = self.cache.get_entity_with_meta(id) {
      if freshness != Freshness::Stale {
        return Ok(CacheResult::from_cache(entity, cached_at, false));
      }

      if self.cache.claim_entity_refresh(id) {
        let layer = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
          if let Err(e) = layer.revalidate_one(fetcher).await {
            warn!(entity_type = T::entity_type(), id = %id, "Background refresh failed, serving stale: {}", e);
          }
        });
      }

      return Ok(CacheResult::from_cache(entity, cached_at, true));
    }

    let data = self.revalidate_one(fetcher).await?;
    Ok(CacheResult::from_network(data))
  }

  /// Fetch a list unconditionally and cache it.
  pub async fn revalidate_list<F, Fut>(&self, query: &Q, fetcher: F) -> Result<Vec<T>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
  {
    let data = fetcher().await?;
    debug!(query = %query.description(), count = data.len(), "Fetched list");
    self.cache.set_list(query, data.clone());
    Ok(data)
  }

  /// Fetch a single entity unconditionally and cache it.
  pub async fn revalidate_one<F, Fut>(&self, fetcher: F) -> Result<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let data = fetcher().await?;
    self.cache.set_entity(data.clone());
    Ok(data)
  }
}
