//! Runtime configuration: an optional TOML file layered with `SLC_*`
//! environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use slc_store_sqlite::StoreOptions;

use crate::Result;

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "slc-history.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  pub store_path:      PathBuf,
  /// Recorded in the `user` column of every appended entry.
  pub user:            String,
  pub retry_transient: bool,
  pub busy_timeout_ms: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    let store = StoreOptions::default();
    Self {
      store_path:      PathBuf::from("slc-history.sqlite"),
      user:            "slc-history".to_owned(),
      retry_transient: store.retry_transient,
      busy_timeout_ms: store.busy_timeout_ms,
    }
  }
}

impl SyncConfig {
  /// Read `path` if it exists, then apply `SLC_*` overrides
  /// (e.g. `SLC_STORE_PATH`, `SLC_RETRY_TRANSIENT`).
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SLC"))
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      retry_transient: self.retry_transient,
      busy_timeout_ms: self.busy_timeout_ms,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = SyncConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.user, "slc-history");
    assert_eq!(cfg.busy_timeout_ms, 5_000);
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slc-history.toml");
    std::fs::write(
      &path,
      "store_path = \"/var/lib/slc/history.sqlite\"\nretry_transient = true\n",
    )
    .unwrap();

    let cfg = SyncConfig::load(&path).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/slc/history.sqlite"));
    assert!(cfg.store_options().retry_transient);
    assert_eq!(cfg.user, "slc-history");
  }
}
