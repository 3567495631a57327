//! Core types for the SLC history store.
//!
//! Every tracked entity lives in an append-only `<table>_history` table: an
//! update or a deletion is a new row, never a mutation. This crate holds the
//! value model, table definitions, the [`store::HistoryStore`] abstraction and
//! the reconcilers that converge stored history onto externally derived
//! snapshots without undoing curator edits.
//!
//! This crate is deliberately free of database dependencies.

// Native `async fn` in traits; the store trait spells out `Send` bounds itself.
#![allow(async_fn_in_trait)]

pub mod entry;
pub mod error;
pub mod literal;
pub mod reconcile;
pub mod schema;
pub mod script;
pub mod store;
pub mod value;

pub use error::{Error, Result};
