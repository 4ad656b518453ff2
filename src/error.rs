//! Error types for the library.
//!
//! Validation and registry errors are returned at the point of construction
//! and are meant to be handled by the immediate caller. Remote errors never
//! escape the outbox worker; they only show up in the sync status.

use std::time::Duration;
use thiserror::Error;

use crate::model::Kind;

/// A field violated a structural rule of its entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}.{field}: {message}")]
pub struct ValidationError {
  pub kind: Kind,
  pub field: &'static str,
  pub message: String,
}

impl ValidationError {
  pub fn new(kind: Kind, field: &'static str, message: impl Into<String>) -> Self {
    Self {
      kind,
      field,
      message: message.into(),
    }
  }
}

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("record is not a JSON object")]
  NotAnObject,

  #[error("unknown kind {found:?}; supported kinds: {supported}")]
  UnknownKind {
    found: Option<String>,
    supported: String,
  },

  #[error("record without a \"kind\" field cannot be flattened")]
  MissingKind,

  #[error("malformed {kind} record: {detail}")]
  Malformed { kind: Kind, detail: String },

  #[error(transparent)]
  Validation(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("storage backend error: {0}")]
  Backend(String),

  #[error("storage lock poisoned")]
  Poisoned,
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error("unknown family {0:?}; use \"customers\", \"animals\", \"services\" or \"tasks\"")]
  UnknownFamily(String),

  #[error("{0}: id is required")]
  MissingId(&'static str),

  #[error("no {kind} with id {id:?}")]
  NotFound { kind: Kind, id: String },

  #[error("{field} does not apply to {kind}")]
  StatusNotApplicable { kind: Kind, field: &'static str },

  #[error(transparent)]
  Storage(#[from] StorageError),

  #[error("failed to encode record: {0}")]
  Encode(#[from] serde_json::Error),
}

impl From<ValidationError> for StoreError {
  fn from(err: ValidationError) -> Self {
    StoreError::Registry(RegistryError::Validation(err))
  }
}

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
  #[error("request timed out after {0:?}")]
  Timeout(Duration),

  #[error("request failed: {0}")]
  Transport(String),

  #[error("backend returned HTTP {0}")]
  Status(u16),

  #[error("undecodable response: {0}")]
  Decode(String),

  #[error("backend rejected request: {0}")]
  Rejected(String),

  #[error("remote endpoint is not configured")]
  NotConfigured,

  #[error("invalid API URL {url:?}: {detail}")]
  InvalidUrl { url: String, detail: String },
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
