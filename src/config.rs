use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kennel::outbox::OutboxConfig;
use kennel::remote::reader::ReadTtls;
use kennel::storage::SqliteStorage;
use kennel::workspace::WorkspaceSettings;

/// Environment variable overriding `api.url`.
pub const API_URL_ENV: &str = "KENNEL_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub outbox: OutboxSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Backend web app URL; without it writes stay queued locally
  pub url: Option<String>,
  /// Per-request timeout in milliseconds
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: None,
      timeout_ms: default_timeout_ms(),
    }
  }
}

fn default_timeout_ms() -> u64 {
  15_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub today_ttl_secs: u64,
  pub lookups_ttl_secs: u64,
  pub search_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      today_ttl_secs: 10,
      lookups_ttl_secs: 30,
      search_ttl_secs: 10,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite database file (default: $XDG_DATA_HOME/kennel/kennel.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutboxSection {
  /// Sync in the background after every write
  #[serde(default = "default_auto_drain")]
  pub auto_drain: bool,
}

impl Default for OutboxSection {
  fn default() -> Self {
    Self {
      auto_drain: default_auto_drain(),
    }
  }
}

fn default_auto_drain() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./kennel.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/kennel/config.yaml
  ///
  /// With no file found every setting takes its default.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    Ok(config.with_env_overrides())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("kennel.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("kennel").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-default config.
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  fn with_env_overrides(mut self) -> Self {
    if let Ok(url) = std::env::var(API_URL_ENV) {
      if !url.trim().is_empty() {
        self.api.url = Some(url);
      }
    }
    self
  }

  /// Database file to open.
  pub fn storage_path(&self) -> Result<PathBuf> {
    self
      .storage
      .path
      .clone()
      .or_else(SqliteStorage::default_path)
      .ok_or_else(|| eyre!("Could not determine data directory; set storage.path"))
  }

  pub fn workspace_settings(&self) -> WorkspaceSettings {
    WorkspaceSettings {
      ttls: ReadTtls {
        today: Duration::from_secs(self.cache.today_ttl_secs),
        lookups: Duration::from_secs(self.cache.lookups_ttl_secs),
        search: Duration::from_secs(self.cache.search_ttl_secs),
      },
      outbox: OutboxConfig {
        timeout: Duration::from_millis(self.api.timeout_ms),
        auto_drain: self.outbox.auto_drain,
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.api.timeout_ms, 15_000);
    assert_eq!(config.cache.lookups_ttl_secs, 30);
    assert!(config.outbox.auto_drain);

    let settings = config.workspace_settings();
    assert_eq!(settings.ttls, ReadTtls::default());
    assert_eq!(settings.outbox, OutboxConfig::default());
  }

  #[test]
  fn test_partial_file() {
    let config = Config::parse(
      "api:\n  url: https://script.example.com/exec\ncache:\n  today_ttl_secs: 5\noutbox:\n  auto_drain: false\n",
    )
    .unwrap();
    assert_eq!(config.api.url.as_deref(), Some("https://script.example.com/exec"));
    assert_eq!(config.api.timeout_ms, 15_000);
    assert_eq!(config.cache.today_ttl_secs, 5);
    assert_eq!(config.cache.search_ttl_secs, 10);
    assert!(!config.outbox.auto_drain);
  }

  #[test]
  fn test_explicit_missing_file_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/kennel.yaml"))).is_err());
  }

  #[test]
  fn test_explicit_file_is_read() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kennel.yaml");
    std::fs::write(&path, "storage:\n  path: /tmp/k.db\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.storage_path().unwrap(), PathBuf::from("/tmp/k.db"));
  }
}
