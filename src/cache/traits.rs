//! Core traits and types for the read cache.

use chrono::{DateTime, Utc};

/// Something holding cached reads that writes can make stale.
pub trait Invalidate: Send + Sync {
  /// Drop every entry whose key starts with `prefix`; returns how many went.
  fn invalidate_prefix(&self, prefix: &str) -> usize;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the cached entry expires (if from cache)
  pub expires_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      expires_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, expires_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      expires_at: Some(expires_at),
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the remote endpoint
  Network,
  /// Unexpired data from the cache
  Cache,
}
