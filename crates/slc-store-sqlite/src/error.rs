//! Error type for `slc-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] slc_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode column {column:?}: {reason}")]
  Decode { column: String, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
