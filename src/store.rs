//! Local persistent store of validated entities.
//!
//! Each family lives under its own storage key as a JSON object mapping
//! `id -> plain record`. Writes are full read-modify-write of the family.
//! Every record is re-validated through the registry on the way in and on
//! the way out, so nothing invalid is ever handed back to a caller.

use serde_json::{Map, Value};
use std::sync::Mutex;

use crate::error::{Result, StorageError, StoreError};
use crate::model::{Entity, Family, Kind};
use crate::registry::{self, IntoRecord};
use crate::storage::Storage;

/// Source of fresh ids for new records.
pub trait IdGenerator: Send + Sync {
  /// Returns an id for a new record of `kind`. Must never repeat.
  fn next_id(&self, kind: Kind) -> String;
}

/// `{prefix}_{uuid v4}` with a hyphenated uuid, e.g. `svc_0f3c9a12-…`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
  fn next_id(&self, kind: Kind) -> String {
    format!("{}_{}", kind.id_prefix(), uuid::Uuid::new_v4().hyphenated())
  }
}

type Collection = Map<String, Value>;

pub struct LocalStore<S: Storage> {
  storage: S,
  ids: Box<dyn IdGenerator>,
  /// Serializes read-modify-write cycles on family collections.
  write_lock: Mutex<()>,
}

impl<S: Storage> LocalStore<S> {
  pub fn new(storage: S) -> Self {
    Self::with_id_generator(storage, Box::new(UuidIds))
  }

  pub fn with_id_generator(storage: S, ids: Box<dyn IdGenerator>) -> Self {
    Self {
      storage,
      ids,
      write_lock: Mutex::new(()),
    }
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  // ==========================================================================
  // Family collections
  // ==========================================================================

  fn load(&self, family: Family) -> Result<Collection> {
    let key = family.storage_key();
    let Some(raw) = self.storage.get(key)? else {
      return Ok(Collection::new());
    };

    match serde_json::from_str::<Value>(&raw) {
      Ok(Value::Object(map)) => Ok(map),
      Ok(_) | Err(_) => {
        tracing::warn!(key, "stored collection is not a JSON object, treating as empty");
        Ok(Collection::new())
      }
    }
  }

  fn persist(&self, family: Family, collection: &Collection) -> Result<()> {
    let encoded = serde_json::to_string(collection)?;
    self.storage.set(family.storage_key(), &encoded)?;
    Ok(())
  }

  // ==========================================================================
  // Operations
  // ==========================================================================

  /// Validates and stores an entity or plain record.
  ///
  /// A record without an id gets a fresh one. A record with an id replaces
  /// whatever was stored under it. Returns the entity as stored.
  pub fn save(&self, source: impl IntoRecord) -> Result<Entity> {
    let record = registry::flatten(source)?;
    let entity = registry::reify(&record)?;

    let entity = match entity.id() {
      Some(_) => entity,
      None => {
        let id = self.ids.next_id(entity.kind());
        entity.with_id(id)
      }
    };
    // with_id always leaves an id behind
    let id = entity.id().unwrap_or_default().to_string();
    let stored = entity.to_record();

    let family = entity.family();
    {
      let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
      let mut collection = self.load(family)?;
      collection.insert(id.clone(), stored.clone());
      self.persist(family, &collection)?;
    }

    tracing::debug!(kind = %entity.kind(), id = %id, "saved record");
    Ok(registry::reify(&stored)?)
  }

  /// Reads one entity. A blank id is an error; a missing one is `None`.
  pub fn get(&self, kind: Kind, id: &str) -> Result<Option<Entity>> {
    if id.trim().is_empty() {
      return Err(StoreError::MissingId("get"));
    }

    let collection = self.load(kind.family())?;
    match collection.get(id) {
      Some(record) => Ok(Some(registry::reify(record)?)),
      None => Ok(None),
    }
  }

  /// Every entity of a family, by family name.
  pub fn list(&self, family: &str) -> Result<Vec<Entity>> {
    self.list_family(family.parse()?)
  }

  pub fn list_family(&self, family: Family) -> Result<Vec<Entity>> {
    self
      .load(family)?
      .values()
      .map(|record| registry::reify(record).map_err(StoreError::from))
      .collect()
  }

  pub fn list_customers(&self) -> Result<Vec<Entity>> {
    self.list_family(Family::Customers)
  }

  pub fn list_animals(&self) -> Result<Vec<Entity>> {
    self.list_family(Family::Animals)
  }

  pub fn list_services(&self) -> Result<Vec<Entity>> {
    self.list_family(Family::Services)
  }

  pub fn list_tasks(&self) -> Result<Vec<Entity>> {
    self.list_family(Family::Tasks)
  }

  /// Deletes one entity. Returns whether anything was removed.
  pub fn remove(&self, kind: Kind, id: &str) -> Result<bool> {
    if id.trim().is_empty() {
      return Err(StoreError::MissingId("remove"));
    }

    let family = kind.family();
    let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
    let mut collection = self.load(family)?;
    if collection.remove(id).is_none() {
      return Ok(false);
    }
    self.persist(family, &collection)?;

    tracing::debug!(kind = %kind, id, "removed record");
    Ok(true)
  }

  /// Removes every family collection.
  pub fn clear_all(&self) -> Result<()> {
    let _guard = self.write_lock.lock().map_err(|_| StorageError::Poisoned)?;
    for family in Family::ALL {
      self.storage.remove(family.storage_key())?;
    }
    Ok(())
  }
}
