//! Remote backend boundary.
//!
//! The rest of the crate only depends on [`RemoteEndpoint::call`]: one
//! action, one JSON payload, one [`Response`]. How the request travels is
//! up to the implementation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RemoteError;

mod http;
pub mod reader;

pub use http::HttpEndpoint;
pub use reader::CachedReader;

/// Action names understood by the backend.
pub mod actions {
  pub const SET_COMPLETION_STATUS: &str = "setCompletionStatus";
  pub const SET_PAYMENT_STATUS: &str = "setPaymentStatus";
  pub const GET_TODAY: &str = "getToday";
  pub const GET_LOOKUPS: &str = "getLookups";
  pub const SEARCH: &str = "search";
  pub const PING: &str = "ping";
}

/// Backend reply: `{ok, error?, ...fields}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
  #[serde(default)]
  pub ok: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Action-specific fields.
  #[serde(flatten)]
  pub fields: Map<String, Value>,
}

impl Response {
  pub fn success() -> Self {
    Self {
      ok: true,
      ..Default::default()
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      ok: false,
      error: Some(error.into()),
      ..Default::default()
    }
  }

  pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
    self.fields.insert(name.into(), value);
    self
  }

  pub fn field(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }

  /// Turns a non-`ok` reply into [`RemoteError::Rejected`].
  pub fn into_result(self) -> Result<Self, RemoteError> {
    if self.ok {
      Ok(self)
    } else {
      Err(RemoteError::Rejected(
        self
          .error
          .unwrap_or_else(|| "request was not accepted".to_string()),
      ))
    }
  }

  /// The action-specific fields as one JSON object.
  pub fn into_body(self) -> Value {
    Value::Object(self.fields)
  }
}

/// One request/response exchange with the backend.
pub trait RemoteEndpoint: Send + Sync {
  /// Perform `action` with `payload`, giving up after `timeout`.
  fn call(
    &self,
    action: &str,
    payload: &Value,
    timeout: Duration,
  ) -> impl Future<Output = Result<Response, RemoteError>> + Send;
}

impl<E: RemoteEndpoint + ?Sized> RemoteEndpoint for Arc<E> {
  fn call(
    &self,
    action: &str,
    payload: &Value,
    timeout: Duration,
  ) -> impl Future<Output = Result<Response, RemoteError>> + Send {
    (**self).call(action, payload, timeout)
  }
}
