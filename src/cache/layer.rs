//! Short-lived read cache with lazy expiry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::{CacheResult, Invalidate};
use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
  value: V,
  expires_at: DateTime<Utc>,
}

/// In-memory cache of remote reads.
///
/// An entry is visible only while `now < expires_at`. Expired entries are
/// not swept; they are evicted when a read finds them.
pub struct ReadCache<V> {
  entries: Mutex<HashMap<String, CacheEntry<V>>>,
  clock: Arc<dyn Clock>,
  /// Bumped by every invalidation.
  generation: AtomicU64,
}

impl<V: Clone + Send> ReadCache<V> {
  /// Create a cache driven by the wall clock.
  pub fn new() -> Self {
    Self::with_clock(Arc::new(SystemClock))
  }

  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      clock,
      generation: AtomicU64::new(0),
    }
  }

  /// Look up `key`, evicting it if it has expired.
  pub fn get(&self, key: &str) -> Option<V> {
    self.get_entry(key).map(|entry| entry.value)
  }

  fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
    let now = self.clock.now();
    let mut entries = self.entries.lock().ok()?;
    let expired = match entries.get(key) {
      Some(entry) if now < entry.expires_at => return Some(entry.clone()),
      Some(_) => true,
      None => false,
    };
    if expired {
      entries.remove(key);
    }
    None
  }

  /// Store `value` under `key` for `ttl`, replacing any previous entry.
  pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
    let now = self.clock.now();
    let expires_at = chrono::Duration::from_std(ttl)
      .ok()
      .and_then(|ttl| now.checked_add_signed(ttl))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);

    if let Ok(mut entries) = self.entries.lock() {
      entries.insert(key.into(), CacheEntry { value, expires_at });
    }
  }

  /// Drop every entry whose key starts with `prefix`.
  pub fn drop_by_prefix(&self, prefix: &str) -> usize {
    self.generation.fetch_add(1, Ordering::AcqRel);
    let Ok(mut entries) = self.entries.lock() else {
      return 0;
    };
    let before = entries.len();
    entries.retain(|key, _| !key.starts_with(prefix));
    before - entries.len()
  }

  /// Number of stored entries, expired ones included until they are read.
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self.generation.fetch_add(1, Ordering::AcqRel);
    if let Ok(mut entries) = self.entries.lock() {
      entries.clear();
    }
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Unexpired entry - return it without calling the fetcher
  /// 2. Otherwise call the fetcher and store a successful result for `ttl`
  ///
  /// Failed fetches are returned as-is and leave the cache untouched, and so
  /// does a result fetched while an invalidation ran.
  pub async fn fetch<E, F, Fut>(
    &self,
    key: &str,
    ttl: Duration,
    fetcher: F,
  ) -> Result<CacheResult<V>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
  {
    if let Some(entry) = self.get_entry(key) {
      tracing::debug!(key, "cache hit");
      return Ok(CacheResult::from_cache(entry.value, entry.expires_at));
    }

    tracing::debug!(key, "cache miss");
    let generation = self.generation.load(Ordering::Acquire);
    let data = fetcher().await?;
    if self.generation.load(Ordering::Acquire) == generation {
      self.put(key, data.clone(), ttl);
    } else {
      tracing::debug!(key, "invalidated during fetch, not caching");
    }
    Ok(CacheResult::from_network(data))
  }
}

impl<V: Clone + Send> Default for ReadCache<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V: Clone + Send> Invalidate for ReadCache<V> {
  fn invalidate_prefix(&self, prefix: &str) -> usize {
    self.drop_by_prefix(prefix)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::clock::ManualClock;

  fn cache() -> (Arc<ManualClock>, ReadCache<String>) {
    let clock = Arc::new(ManualClock::default());
    let cache = ReadCache::with_clock(clock.clone());
    (clock, cache)
  }

  #[test]
  fn test_entry_expires_after_ttl() {
    let (clock, cache) = cache();
    cache.put("today:15-12-2025", "x".to_string(), Duration::from_millis(100));
    assert_eq!(cache.get("today:15-12-2025").as_deref(), Some("x"));

    clock.advance(chrono::Duration::milliseconds(150));
    assert_eq!(cache.get("today:15-12-2025"), None);
    assert_eq!(cache.len(), 0);
  }

  #[test]
  fn test_entry_is_gone_exactly_at_expiry() {
    let (clock, cache) = cache();
    cache.put("k", "v".to_string(), Duration::from_millis(100));
    clock.advance(chrono::Duration::milliseconds(100));
    assert_eq!(cache.get("k"), None);
  }

  #[test]
  fn test_put_replaces_entry() {
    let (_, cache) = cache();
    cache.put("lookups", "a".to_string(), Duration::from_secs(30));
    cache.put("lookups", "b".to_string(), Duration::from_secs(30));
    assert_eq!(cache.get("lookups").as_deref(), Some("b"));
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_drop_by_prefix() {
    let (_, cache) = cache();
    let ttl = Duration::from_secs(10);
    cache.put("today:01-01-2026", "a".to_string(), ttl);
    cache.put("today:02-01-2026", "b".to_string(), ttl);
    cache.put("lookups", "c".to_string(), ttl);

    assert_eq!(cache.drop_by_prefix("today:"), 2);
    assert_eq!(cache.drop_by_prefix("today:"), 0);
    assert_eq!(cache.get("lookups").as_deref(), Some("c"));
    assert_eq!(cache.invalidate_prefix(""), 1);
    assert!(cache.is_empty());
  }

  #[tokio::test]
  async fn test_fetch_is_cache_first() {
    let (clock, cache) = cache();
    let ttl = Duration::from_secs(10);

    let first = cache
      .fetch("lookups", ttl, || async { Ok::<_, String>("net".to_string()) })
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let second = cache
      .fetch("lookups", ttl, || async { Err::<String, _>("unreachable".to_string()) })
      .await
      .unwrap();
    assert!(second.is_cached());
    assert_eq!(second.data, "net");

    clock.advance(chrono::Duration::seconds(11));
    let third = cache
      .fetch("lookups", ttl, || async { Err::<String, _>("offline".to_string()) })
      .await;
    assert_eq!(third.unwrap_err(), "offline");
    assert_eq!(cache.get("lookups"), None);
  }

  #[tokio::test]
  async fn test_fetch_racing_an_invalidation_is_not_cached() {
    let (_, cache) = cache();
    let ttl = Duration::from_secs(10);

    let stale = cache
      .fetch("today:2025-12-15", ttl, || async {
        // A write lands while the read is in flight.
        cache.drop_by_prefix("today:");
        Ok::<_, String>("before write".to_string())
      })
      .await
      .unwrap();
    assert_eq!(stale.data, "before write");
    assert_eq!(cache.get("today:2025-12-15"), None);

    let fresh = cache
      .fetch("today:2025-12-15", ttl, || async { Ok::<_, String>("after write".to_string()) })
      .await
      .unwrap();
    assert_eq!(fresh.source, CacheSource::Network);
    assert_eq!(cache.get("today:2025-12-15").as_deref(), Some("after write"));
  }
}
