//! The `HistoryStore` trait.
//!
//! Implemented by storage backends (e.g. `slc-store-sqlite`). The reconcilers
//! depend on this abstraction only: ordered predicate lookups plus a single
//! append primitive. No method ever updates or deletes a stored row.

use std::future::Future;

use crate::{
  entry::{Change, HistoryEntry, NewEntry},
  schema::TableDef,
  value::Row,
};

/// Abstraction over an append-only history backend.
///
/// A *key* is a [`Row`] read as a conjunction of equalities over declared
/// columns and, optionally, `record_id`.
///
/// The record id allocator assumes a single writer per table; two processes
/// allocating concurrently may collide.
pub trait HistoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the history table (and current-state view) if missing.
  fn create_table<'a>(
    &'a self,
    def: &'a TableDef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// `max(record_id) + 1`, or 1 for an empty table. Backends may cache the
  /// last allocation for the duration of a run.
  fn next_record_id<'a>(
    &'a self,
    def: &'a TableDef,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;

  /// Append one entry, allocating a record id when `entry.record_id` is
  /// `None`. Returns `None` without writing (or allocating) when
  /// `entry.fields` is empty.
  fn append_entry<'a>(
    &'a self,
    def: &'a TableDef,
    entry: NewEntry,
  ) -> impl Future<Output = Result<Option<HistoryEntry>, Self::Error>> + Send + 'a;

  /// A single entry by physical id.
  fn entry<'a>(
    &'a self,
    def: &'a TableDef,
    id: i64,
  ) -> impl Future<Output = Result<Option<HistoryEntry>, Self::Error>> + Send + 'a;

  /// The entry with the highest id for `record_id`.
  fn latest_entry<'a>(
    &'a self,
    def: &'a TableDef,
    record_id: i64,
  ) -> impl Future<Output = Result<Option<HistoryEntry>, Self::Error>> + Send + 'a;

  /// Every entry matching `key`, ascending by id.
  fn history<'a>(
    &'a self,
    def: &'a TableDef,
    key: &'a Row,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + 'a;

  /// Distinct record ids with at least one entry matching `key`, ascending.
  fn record_ids<'a>(
    &'a self,
    def: &'a TableDef,
    key: &'a Row,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + 'a;

  /// The latest entry of every record whose latest entry matches `key` and
  /// is not deleted, ascending by id.
  fn current_rows<'a>(
    &'a self,
    def: &'a TableDef,
    key: &'a Row,
  ) -> impl Future<Output = Result<Vec<HistoryEntry>, Self::Error>> + Send + 'a;

  /// Change events for `fields` among entries matching `key`, newest first.
  ///
  /// Each entry is compared with the previous entry of the same record; it
  /// is reported when any tracked field differs (exact, null-safe) or the
  /// deleted flag differs. The first entry of a record is always reported.
  fn field_changes<'a>(
    &'a self,
    def: &'a TableDef,
    key: &'a Row,
    fields: &'a [String],
  ) -> impl Future<Output = Result<Vec<Change>, Self::Error>> + Send + 'a;
}
