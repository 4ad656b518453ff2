//! Read paths to the backend, shielded by the read cache.

use chrono::NaiveDate;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use super::{actions, RemoteEndpoint};
use crate::cache::{keys, CacheResult, ReadCache};
use crate::error::RemoteError;

// ============================================================================
// Query key types
// ============================================================================

/// Read queries the backend answers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadQuery {
  /// Schedule for one day
  Today { date: NaiveDate },
  /// Customers, animals and their ids for form pickers
  Lookups,
  /// Free-text search
  Search { q: String },
}

impl ReadQuery {
  /// Cache key; every key starts with one of [`keys::ALL`].
  pub fn cache_key(&self) -> String {
    match self {
      Self::Today { date } => format!("{}{}", keys::TODAY, date.format("%Y-%m-%d")),
      Self::Lookups => keys::LOOKUPS.to_string(),
      Self::Search { q } => {
        // SHA256 hash for stable, fixed-length keys
        let mut hasher = Sha256::new();
        hasher.update(normalize_query(q).as_bytes());
        format!("{}{}", keys::SEARCH, hex::encode(hasher.finalize()))
      }
    }
  }

  pub fn action(&self) -> &'static str {
    match self {
      Self::Today { .. } => actions::GET_TODAY,
      Self::Lookups => actions::GET_LOOKUPS,
      Self::Search { .. } => actions::SEARCH,
    }
  }

  pub fn payload(&self) -> Value {
    match self {
      Self::Today { date } => json!({ "date": date.format("%Y-%m-%d").to_string() }),
      Self::Lookups => json!({}),
      Self::Search { q } => json!({ "q": q.trim() }),
    }
  }

  pub fn description(&self) -> String {
    match self {
      Self::Today { date } => format!("schedule for {}", date.format("%d-%m-%Y")),
      Self::Lookups => "lookup lists".to_string(),
      Self::Search { q } => format!("search: {}", q),
    }
  }
}

/// Normalize a search query for consistent hashing.
fn normalize_query(q: &str) -> String {
  q.trim().to_lowercase()
}

/// Cache lifetimes for each read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTtls {
  pub today: Duration,
  pub lookups: Duration,
  pub search: Duration,
}

impl Default for ReadTtls {
  fn default() -> Self {
    Self {
      today: Duration::from_secs(10),
      lookups: Duration::from_secs(30),
      search: Duration::from_secs(10),
    }
  }
}

impl ReadTtls {
  fn for_query(&self, query: &ReadQuery) -> Duration {
    match query {
      ReadQuery::Today { .. } => self.today,
      ReadQuery::Lookups => self.lookups,
      ReadQuery::Search { .. } => self.search,
    }
  }
}

// ============================================================================
// Reader
// ============================================================================

/// Backend reads with transparent caching.
pub struct CachedReader<E: RemoteEndpoint> {
  endpoint: E,
  cache: Arc<ReadCache<Value>>,
  ttls: ReadTtls,
  timeout: Duration,
}

impl<E: RemoteEndpoint> CachedReader<E> {
  pub fn new(endpoint: E, cache: Arc<ReadCache<Value>>, ttls: ReadTtls, timeout: Duration) -> Self {
    Self {
      endpoint,
      cache,
      ttls,
      timeout,
    }
  }

  pub fn cache(&self) -> &Arc<ReadCache<Value>> {
    &self.cache
  }

  /// Run `query`, answering from the cache while the entry is fresh.
  pub async fn read(&self, query: &ReadQuery) -> Result<CacheResult<Value>, RemoteError> {
    let key = query.cache_key();
    let ttl = self.ttls.for_query(query);

    self
      .cache
      .fetch(&key, ttl, || async {
        tracing::debug!(query = %query.description(), "fetching from backend");
        let response = self
          .endpoint
          .call(query.action(), &query.payload(), self.timeout)
          .await?
          .into_result()?;
        Ok::<_, RemoteError>(response.into_body())
      })
      .await
  }

  pub async fn today(&self, date: NaiveDate) -> Result<CacheResult<Value>, RemoteError> {
    self.read(&ReadQuery::Today { date }).await
  }

  pub async fn lookups(&self) -> Result<CacheResult<Value>, RemoteError> {
    self.read(&ReadQuery::Lookups).await
  }

  pub async fn search(&self, q: &str) -> Result<CacheResult<Value>, RemoteError> {
    self.read(&ReadQuery::Search { q: q.to_string() }).await
  }

  /// Check that the backend answers at all. Never cached.
  pub async fn ping(&self) -> Result<(), RemoteError> {
    self
      .endpoint
      .call(actions::PING, &json!({}), self.timeout)
      .await?
      .into_result()
      .map(|_| ())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::CacheSource;
  use crate::remote::Response;
  use std::sync::Mutex;

  /// Answers every call with `{ok: true, n: <call number>}`.
  #[derive(Default)]
  struct CountingEndpoint {
    calls: Mutex<Vec<(String, Value)>>,
  }

  impl RemoteEndpoint for CountingEndpoint {
    async fn call(
      &self,
      action: &str,
      payload: &Value,
      _timeout: Duration,
    ) -> Result<Response, RemoteError> {
      let mut calls = self.calls.lock().unwrap();
      calls.push((action.to_string(), payload.clone()));
      if action == actions::SEARCH && payload["q"] == "boom" {
        return Ok(Response::failure("search unavailable"));
      }
      Ok(Response::success().with_field("n", json!(calls.len())))
    }
  }

  fn reader() -> CachedReader<Arc<CountingEndpoint>> {
    CachedReader::new(
      Arc::new(CountingEndpoint::default()),
      Arc::new(ReadCache::new()),
      ReadTtls::default(),
      Duration::from_secs(1),
    )
  }

  fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()
  }

  #[test]
  fn test_cache_keys() {
    assert_eq!(ReadQuery::Today { date: date() }.cache_key(), "today:2025-12-15");
    assert_eq!(ReadQuery::Lookups.cache_key(), "lookups");

    let a = ReadQuery::Search { q: "  Thor ".into() }.cache_key();
    let b = ReadQuery::Search { q: "thor".into() }.cache_key();
    assert_eq!(a, b);
    assert!(a.starts_with("search:"));
    assert_eq!(a.len(), "search:".len() + 64);
  }

  #[tokio::test]
  async fn test_repeated_reads_hit_cache() {
    let reader = reader();
    let first = reader.today(date()).await.unwrap();
    let second = reader.today(date()).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, json!({ "n": 1 }));
    assert_eq!(
      reader.endpoint.calls.lock().unwrap()[0],
      ("getToday".to_string(), json!({ "date": "2025-12-15" }))
    );
  }

  #[tokio::test]
  async fn test_invalidated_read_goes_back_to_backend() {
    let reader = reader();
    reader.lookups().await.unwrap();
    reader.cache().drop_by_prefix(keys::LOOKUPS);
    let again = reader.lookups().await.unwrap();
    assert_eq!(again.source, CacheSource::Network);
    assert_eq!(again.data, json!({ "n": 2 }));
  }

  #[tokio::test]
  async fn test_rejected_read_is_an_error_and_not_cached() {
    let reader = reader();
    let err = reader.search("boom").await.unwrap_err();
    assert!(matches!(err, RemoteError::Rejected(_)));
    assert!(reader.cache().is_empty());
  }

  #[tokio::test]
  async fn test_ping_is_never_cached() {
    let reader = reader();
    reader.ping().await.unwrap();
    reader.ping().await.unwrap();
    assert_eq!(reader.endpoint.calls.lock().unwrap().len(), 2);
  }
}
