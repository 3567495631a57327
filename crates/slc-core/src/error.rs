//! Error types for `slc-core`.

use thiserror::Error;

use crate::schema::ColumnKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  #[error("column {0:?} is reserved for history bookkeeping")]
  ReservedColumn(String),

  #[error("column {0:?} declared twice")]
  DuplicateColumn(String),

  #[error("table {table} has no column {column:?}")]
  UnknownColumn { table: String, column: String },

  #[error("column {column:?} of table {table} holds {expected} values, got {found}")]
  TypeMismatch {
    table:    String,
    column:   String,
    expected: ColumnKind,
    found:    &'static str,
  },

  #[error("cannot parse {input:?} as {kind}")]
  ParseValue { kind: ColumnKind, input: String },

  #[error("no tracked fields given")]
  NoFields,

  #[error("value tuple has {found} components, expected {expected}")]
  Arity { expected: usize, found: usize },

  #[error("record {0} has no history")]
  RecordNotFound(i64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error.
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
