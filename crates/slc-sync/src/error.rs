//! Error type for the batch driver.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] slc_core::Error),

  #[error("{path}: {source}")]
  Input {
    path:   PathBuf,
    #[source]
    source: slc_uniprot::Error,
  },

  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("unknown table {0:?}")]
  UnknownTable(String),

  #[error("expected FIELD=VALUE, got {0:?}")]
  KeySyntax(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
