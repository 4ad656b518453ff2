//! HTTP adapter for the scheduling backend.
//!
//! Requests are plain GETs:
//!
//! ```text
//! <api_url>?action=<action>&callback=<cb>&data=<base64(json payload)>&_=<millis>
//! ```
//!
//! The backend answers either with bare JSON or wrapped as `<cb>(<json>);`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{RemoteEndpoint, Response};
use crate::error::RemoteError;

/// Backend endpoint reached over HTTP.
#[derive(Clone)]
pub struct HttpEndpoint {
  client: reqwest::Client,
  /// `None` when no API URL is configured; every call then fails.
  base_url: Option<Url>,
}

impl HttpEndpoint {
  pub fn new(api_url: Option<&str>) -> Result<Self, RemoteError> {
    let base_url = api_url
      .map(str::trim)
      .filter(|u| !u.is_empty())
      .map(|u| {
        Url::parse(u).map_err(|e| RemoteError::InvalidUrl {
          url: u.to_string(),
          detail: e.to_string(),
        })
      })
      .transpose()?;

    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| RemoteError::Transport(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client, base_url })
  }

  pub fn is_configured(&self) -> bool {
    self.base_url.is_some()
  }

  fn request_url(&self, action: &str, callback: &str, payload: &Value) -> Result<Url, RemoteError> {
    let mut url = self.base_url.clone().ok_or(RemoteError::NotConfigured)?;
    let body = serde_json::to_vec(payload).map_err(|e| RemoteError::Decode(e.to_string()))?;
    let millis = chrono::Utc::now().timestamp_millis();

    url
      .query_pairs_mut()
      .append_pair("action", action)
      .append_pair("callback", callback)
      .append_pair("data", &STANDARD.encode(body))
      .append_pair("_", &millis.to_string());

    Ok(url)
  }

  async fn send(&self, action: &str, payload: &Value, timeout: Duration) -> Result<Response, RemoteError> {
    let callback = format!("cb_{}", uuid::Uuid::new_v4().simple());
    let url = self.request_url(action, &callback, payload)?;

    tracing::debug!(action, "calling backend");

    let response = self
      .client
      .get(url)
      .timeout(timeout)
      .send()
      .await
      .map_err(|e| classify(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
      return Err(RemoteError::Status(status.as_u16()));
    }

    let body = response.text().await.map_err(|e| classify(e, timeout))?;
    let json = unwrap_jsonp(&body, &callback);

    serde_json::from_str(json).map_err(|e| RemoteError::Decode(format!("{} in {:?}", e, preview(json))))
  }
}

impl RemoteEndpoint for HttpEndpoint {
  async fn call(
    &self,
    action: &str,
    payload: &Value,
    timeout: Duration,
  ) -> Result<Response, RemoteError> {
    self.send(action, payload, timeout).await
  }
}

fn classify(err: reqwest::Error, timeout: Duration) -> RemoteError {
  if err.is_timeout() {
    RemoteError::Timeout(timeout)
  } else {
    RemoteError::Transport(err.to_string())
  }
}

/// Strips a `<callback>( ... );` wrapper, if present.
fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> &'a str {
  let trimmed = body.trim();
  let Some(rest) = trimmed.strip_prefix(callback) else {
    return trimmed;
  };

  rest
    .trim_start()
    .strip_prefix('(')
    .map(|inner| inner.trim_end().trim_end_matches(';').trim_end())
    .and_then(|inner| inner.strip_suffix(')'))
    .map(str::trim)
    .unwrap_or(trimmed)
}

fn preview(body: &str) -> String {
  body.chars().take(80).collect()
}
