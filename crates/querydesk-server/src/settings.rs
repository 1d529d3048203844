//! Runtime configuration, layered from `querydesk.toml` and `QUERYDESK_*`
//! environment variables.

use std::path::{Path, PathBuf};

use querydesk_core::classify::FormClassification;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  /// SQLite file holding the query records.
  pub store_path:  PathBuf,
  /// Separate SQLite file holding the source forms, opened read-only. When
  /// unset the forms are read from `store_path`.
  pub source_path: Option<PathBuf>,
  pub resolver:    FormClassification,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:        "127.0.0.1".to_owned(),
      port:        5000,
      store_path:  PathBuf::from("querydesk.db"),
      source_path: None,
      resolver:    FormClassification::default(),
    }
  }
}

impl ServerConfig {
  /// Layer `path` (optional) and the environment over the defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::layered(path, environment())
  }

  fn layered(path: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }
}

/// `QUERYDESK_PORT` sets `port`; `__` descends into sections, as in
/// `QUERYDESK_RESOLVER__VISIT_COLUMN`.
fn environment() -> config::Environment {
  config::Environment::with_prefix("QUERYDESK")
    .prefix_separator("_")
    .separator("__")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
