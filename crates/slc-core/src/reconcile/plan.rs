//! Reconciliation plans: the appends a reconciler decided on, plus the
//! protections and oddities it ran into along the way.

use std::fmt;

use serde::Serialize;

use crate::{
  entry::{HistoryEntry, NewEntry},
  value::{Row, Value, display_tuple},
};

// ─── Operations ──────────────────────────────────────────────────────────────

/// Why an entry is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  /// First entry of a new record.
  Insert,
  /// Changed scalar fields.
  Update,
  /// A deleted value is live again.
  Undelete,
  /// Restore the last automatic value over an override (manual runs only).
  Revert,
  /// An old record repurposed for a desired value.
  Reuse,
  /// The record's value is no longer wanted.
  Delete,
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Insert => "insert",
      Self::Update => "update",
      Self::Undelete => "undelete",
      Self::Revert => "revert",
      Self::Reuse => "reuse",
      Self::Delete => "delete",
    })
  }
}

/// One append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
  pub action:  Action,
  /// The entry this one was derived from; `None` for inserts.
  pub base_id: Option<i64>,
  pub entry:   NewEntry,
}

impl Operation {
  pub fn insert(entry: NewEntry) -> Self {
    Self { action: Action::Insert, base_id: None, entry }
  }

  pub fn derived(action: Action, base: &HistoryEntry, entry: NewEntry) -> Self {
    Self { action, base_id: Some(base.id), entry }
  }
}

// ─── Warnings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
  /// More than one live record matched a key that should be unique.
  DuplicateLiveRecords { count: usize },
  /// The field was only ever set manually; automation leaves it alone.
  NoAutomaticHistory { field: String },
  /// The proposed value is the one a curator already replaced.
  NotReverting { field: String, value: Value },
  /// The field's latest change was manual.
  ManualOverride { field: String, value: Value },
  /// A curator deleted this value; automation will not bring it back.
  ManualDeletionKept { value: Vec<Value> },
  /// A curator replaced this value; automation will not restore it.
  OverriddenValueKept { value: Vec<Value> },
  /// A curator set this value; automation will not delete it.
  ManualValueKept { value: Vec<Value> },
  UndeletingManualDeletion { value: Vec<Value> },
  UndeletingAutomaticDeletion { value: Vec<Value> },
  RevertingOverride { value: Vec<Value> },
  DeletingManually { value: Vec<Value> },
  ReusingRecord { value: Vec<Value> },
}

/// A logged, non-fatal finding. Collected so batch drivers can report them
/// at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
  pub table:     String,
  pub key:       Row,
  pub record_id: Option<i64>,
  #[serde(flatten)]
  pub kind:      WarningKind,
}

impl Warning {
  /// Whether this warning records a suppressed write.
  pub fn is_protection(&self) -> bool {
    use WarningKind::*;
    matches!(
      self.kind,
      NoAutomaticHistory { .. }
        | NotReverting { .. }
        | ManualOverride { .. }
        | ManualDeletionKept { .. }
        | OverriddenValueKept { .. }
        | ManualValueKept { .. }
    )
  }
}

impl fmt::Display for Warning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use WarningKind::*;
    let at = match self.record_id {
      Some(id) => format!("record #{id} of {} {}", self.table, self.key),
      None => format!("{} {}", self.table, self.key),
    };
    match &self.kind {
      DuplicateLiveRecords { count } => {
        write!(f, "duplicate live records ({count}) for {at}, using the first")
      }
      NoAutomaticHistory { field } => {
        write!(f, "field {field} of {at} was never set automatically, not updating")
      }
      NotReverting { field, value } => write!(
        f,
        "not reverting to manually overridden value {value} for field {field} in {at}"
      ),
      ManualOverride { field, value } => write!(
        f,
        "field {field} of {at} was changed manually, not updating to {value}"
      ),
      ManualDeletionKept { value } => write!(
        f,
        "value {} of {at} was manually deleted, not reverting",
        display_tuple(value)
      ),
      OverriddenValueKept { value } => write!(
        f,
        "not reverting to overridden value {} in {at}",
        display_tuple(value)
      ),
      ManualValueKept { value } => write!(
        f,
        "not deleting manually set value {} in {at}",
        display_tuple(value)
      ),
      UndeletingManualDeletion { value } => write!(
        f,
        "undeleting manually deleted value {} in {at}",
        display_tuple(value)
      ),
      UndeletingAutomaticDeletion { value } => write!(
        f,
        "undeleting automatically deleted value {} in {at}",
        display_tuple(value)
      ),
      RevertingOverride { value } => write!(
        f,
        "reverting to overridden value {} in {at}",
        display_tuple(value)
      ),
      DeletingManually { value } => write!(
        f,
        "deleting value {} manually in {at}",
        display_tuple(value)
      ),
      ReusingRecord { value } => write!(
        f,
        "re-using {at} for value {}",
        display_tuple(value)
      ),
    }
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// The outcome of planning one reconciliation. Operations are applied in
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcilePlan {
  pub operations: Vec<Operation>,
  pub warnings:   Vec<Warning>,
}

impl ReconcilePlan {
  pub fn is_empty(&self) -> bool { self.operations.is_empty() }

  pub fn push(&mut self, op: Operation) { self.operations.push(op); }

  /// Append another plan's operations and warnings.
  pub fn extend(&mut self, other: ReconcilePlan) {
    self.operations.extend(other.operations);
    self.warnings.extend(other.warnings);
  }

  pub fn count(&self, action: Action) -> usize {
    self.operations.iter().filter(|op| op.action == action).count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entry::Provenance;

  #[test]
  fn counts_by_action() {
    let prov = Provenance::automatic();
    let mut plan = ReconcilePlan::default();
    plan.push(Operation::insert(NewEntry::new(Row::new().with("a", 1_i64), &prov)));
    plan.push(Operation::insert(NewEntry::new(Row::new().with("a", 2_i64), &prov)));
    assert_eq!(plan.count(Action::Insert), 2);
    assert_eq!(plan.count(Action::Delete), 0);
    assert!(!plan.is_empty());
  }

  #[test]
  fn warning_message_names_record_and_value() {
    let warning = Warning {
      table:     "uniprot_dbrefs".into(),
      key:       Row::new().with("accession", "P43005"),
      record_id: Some(4),
      kind:      WarningKind::ManualDeletionKept {
        value: vec!["HGNC".into(), "HGNC:10939".into()],
      },
    };
    assert_eq!(
      warning.to_string(),
      "value ('HGNC', 'HGNC:10939') of record #4 of uniprot_dbrefs \
       {accession='P43005'} was manually deleted, not reverting"
    );
    assert!(warning.is_protection());
  }
}
