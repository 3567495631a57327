//! Reconcilers: converge stored history onto a freshly computed desired state
//! without silently undoing curator edits.
//!
//! Reconciliation is split in two phases. *Planning* only reads history and
//! produces a [`ReconcilePlan`]; *application* appends the planned entries.
//! A plan can also be rendered as a SQL script instead (see
//! [`crate::script`]).
//!
//! Protection applies to automated runs ([`Provenance::manual`] unset). A
//! manual run is a curator speaking and may override anything, though it
//! still records warnings when it does so.

mod one_to_many;
mod plan;
mod scalar;

pub use plan::{Action, Operation, ReconcilePlan, Warning, WarningKind};

use tracing::{info, warn};

use crate::{
  Error, Result,
  entry::{HistoryEntry, NewEntry, Provenance},
  schema::TableDef,
  store::HistoryStore,
  value::Row,
};

/// Reconciles one table of a [`HistoryStore`] on behalf of one
/// [`Provenance`].
pub struct Reconciler<'a, S> {
  store:      &'a S,
  table:      &'a TableDef,
  provenance: Provenance,
}

impl<'a, S: HistoryStore> Reconciler<'a, S> {
  pub fn new(store: &'a S, table: &'a TableDef, provenance: Provenance) -> Self {
    Self { store, table, provenance }
  }

  pub fn table(&self) -> &TableDef { self.table }

  pub fn provenance(&self) -> &Provenance { &self.provenance }

  fn is_manual(&self) -> bool { self.provenance.manual }

  /// Log a warning and record it on the plan.
  fn warn(
    &self,
    plan: &mut ReconcilePlan,
    key: &Row,
    record_id: Option<i64>,
    kind: WarningKind,
  ) {
    let warning = Warning {
      table: self.table.name().to_owned(),
      key: key.clone(),
      record_id,
      kind,
    };
    warn!("{warning}");
    plan.warnings.push(warning);
  }

  /// Plan the first entry of a new record. An empty row plans nothing.
  pub fn plan_insert(&self, row: Row) -> Result<ReconcilePlan> {
    let row = self.table.coerce_row(&row)?;
    let mut plan = ReconcilePlan::default();
    if row.is_empty() {
      return Ok(plan);
    }
    info!(table = self.table.name(), "new record {row}");
    plan.push(Operation::insert(NewEntry::new(row, &self.provenance)));
    Ok(plan)
  }

  /// Reconcile the single live record identified by `key` with `desired`.
  ///
  /// With no live record, inserts `key ∪ desired`. With several (an
  /// integrity violation), warns and reconciles the first.
  pub async fn plan_sync_row(&self, key: &Row, desired: &Row) -> Result<ReconcilePlan> {
    let key = &self.table.coerce_row(key)?;
    let desired = &self.table.coerce_row(desired)?;

    let rows = self
      .store
      .current_rows(self.table, key)
      .await
      .map_err(Error::store)?;

    match rows.as_slice() {
      [] => {
        let mut row = key.clone();
        row.merge(desired);
        self.plan_insert(row)
      }
      [first, rest @ ..] => {
        let mut plan = ReconcilePlan::default();
        if !rest.is_empty() {
          self.warn(
            &mut plan,
            key,
            None,
            WarningKind::DuplicateLiveRecords { count: rows.len() },
          );
        }
        plan.extend(self.plan_update(first, desired, None).await?);
        Ok(plan)
      }
    }
  }

  /// Append every planned entry, in order. Returns the written entries.
  pub async fn apply(&self, plan: &ReconcilePlan) -> Result<Vec<HistoryEntry>> {
    let mut written = Vec::with_capacity(plan.operations.len());
    for op in &plan.operations {
      let appended = self
        .store
        .append_entry(self.table, op.entry.clone())
        .await
        .map_err(Error::store)?;
      written.extend(appended);
    }
    Ok(written)
  }
}
