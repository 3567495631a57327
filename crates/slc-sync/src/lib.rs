//! Batch driver for the SLC history tables.
//!
//! Feeds UniProt release files through the reconcilers of [`slc_core`] into
//! the `uniprot_proteins` and `uniprot_dbrefs` history tables, either
//! appending directly or emitting a SQL script for review.

pub mod config;
pub mod error;
pub mod history;
pub mod sync;
pub mod tables;

pub use crate::config::SyncConfig;
pub use error::{Error, Result};
pub use sync::{Mode, SyncOptions, SyncReport, UniprotSync};
