//! Readers for UniProtKB release files.
//!
//! Two formats are understood: the Swiss-Prot/TrEMBL flat file (`.txt`,
//! `.dat`), from which [`FlatEntry`] values are extracted, and FASTA
//! (`.fasta`, `.fa`), indexed by accession in a [`FastaIndex`]. Either may be
//! gzipped. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use slc_uniprot::{FlatEntries, open};
//!
//! let reader = open(Path::new("uniprot_sprot_human.dat.gz")).unwrap();
//! for entry in FlatEntries::new(reader) {
//!   let entry = entry.unwrap();
//!   println!("{:?} {:?}", entry.accessions, entry.symbol);
//! }
//! ```

pub mod error;
mod fasta;
mod flatfile;
mod input;

pub use error::{Error, Result};
pub use fasta::FastaIndex;
pub use flatfile::{DBREF_DATABASES, FlatEntries, FlatEntry};
pub use input::{InputKind, open};
