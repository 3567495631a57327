//! Error types for the UniProt readers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("line {line}: malformed {tag} line: {content:?}")]
  MalformedLine {
    line:    usize,
    tag:     &'static str,
    content: String,
  },

  #[error("line {line}: invalid NCBI taxonomy id {value:?}")]
  InvalidTaxId { line: usize, value: String },

  #[error("{0}: not a FASTA (.fasta, .fa) or flat file (.txt, .dat), optionally gzipped")]
  UnsupportedInput(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
