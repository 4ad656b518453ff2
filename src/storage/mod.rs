//! String key/value storage handle.
//!
//! Everything the crate persists goes through [`Storage`]: the local store
//! keeps one key per entity family and the outbox keeps one key for its job
//! list. The handle is injected, so tests run against [`MemoryStorage`] and
//! the binary runs against [`SqliteStorage`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

mod sqlite;

pub use sqlite::SqliteStorage;

/// Trait for key/value storage backends.
pub trait Storage: Send + Sync {
  /// Read the value under `key`, if any.
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Write `value` under `key`, replacing what was there.
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

  /// Remove `key`. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    (**self).get(key)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    (**self).set(key, value)
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    (**self).remove(key)
  }
}

/// In-memory storage, used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, String>>,
  simulate_write_error: Mutex<bool>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every subsequent write fail, for exercising error paths.
  pub fn set_simulate_write_error(&self, simulate: bool) {
    if let Ok(mut flag) = self.simulate_write_error.lock() {
      *flag = simulate;
    }
  }

  fn check_writable(&self) -> Result<(), StorageError> {
    let flag = self
      .simulate_write_error
      .lock()
      .map_err(|_| StorageError::Poisoned)?;
    if *flag {
      return Err(StorageError::Backend("Simulated write error".to_string()));
    }
    Ok(())
  }

  pub fn keys(&self) -> Vec<String> {
    self
      .entries
      .lock()
      .map(|entries| entries.keys().cloned().collect())
      .unwrap_or_default()
  }
}

impl Storage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    self.check_writable()?;
    let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    self.check_writable()?;
    let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
    entries.remove(key);
    Ok(())
  }
}
