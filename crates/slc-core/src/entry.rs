//! History entries: the rows of an append-only `<table>_history` table.
//!
//! A logical record is identified by its `record_id`; its current state is the
//! entry with the highest `id`. Updates, deletions and undeletions are all new
//! entries that copy the previous state and override some of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{Row, Value};

// ─── Stored entries ──────────────────────────────────────────────────────────

/// One immutable row of a history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  /// Physical row id; strictly increasing in insertion order.
  pub id:        i64,
  /// Logical record this entry belongs to.
  pub record_id: i64,
  /// Every declared column; unset columns read back as `Null`.
  pub fields:    Row,
  /// Caused by a curator rather than an automated sync.
  pub manual:    bool,
  /// The record is logically absent as of this entry.
  pub deleted:   bool,
  pub user:      Option<String>,
  pub comments:  Option<String>,
  pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
  pub fn is_live(&self) -> bool { !self.deleted }
}

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Who is writing: stamped onto every entry a reconciliation emits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  pub manual:   bool,
  pub user:     Option<String>,
  pub comments: Option<String>,
}

impl Provenance {
  /// An automated sync run.
  pub fn automatic() -> Self { Self::default() }

  /// A curator action.
  pub fn manual() -> Self { Self { manual: true, ..Self::default() } }

  pub fn with_user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }

  /// Comment lines, stored joined with `\n`.
  pub fn with_comments<I, S>(mut self, lines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let joined = lines
      .into_iter()
      .map(|l| l.as_ref().to_owned())
      .collect::<Vec<_>>()
      .join("\n");
    self.comments = Some(joined);
    self
  }
}

// ─── New entries ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::HistoryStore::append_entry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEntry {
  /// `None` asks the store to allocate a fresh record id.
  pub record_id: Option<i64>,
  pub fields:    Row,
  pub manual:    bool,
  pub deleted:   bool,
  pub user:      Option<String>,
  pub comments:  Option<String>,
}

impl NewEntry {
  /// The first entry of a new record.
  pub fn new(fields: Row, provenance: &Provenance) -> Self {
    Self {
      record_id: None,
      fields,
      manual: provenance.manual,
      deleted: false,
      user: provenance.user.clone(),
      comments: provenance.comments.clone(),
    }
  }

  /// A follow-up entry for `base`'s record: carries every field and the
  /// deleted flag forward, restamped with `provenance`.
  pub fn derived_from(base: &HistoryEntry, provenance: &Provenance) -> Self {
    Self {
      record_id: Some(base.record_id),
      fields:    base.fields.clone(),
      manual:    provenance.manual,
      deleted:   base.deleted,
      user:      provenance.user.clone(),
      comments:  provenance.comments.clone(),
    }
  }

  /// Override some fields.
  pub fn set(mut self, overrides: &Row) -> Self {
    self.fields.merge(overrides);
    self
  }

  pub fn deleted(mut self, deleted: bool) -> Self {
    self.deleted = deleted;
    self
  }
}

// ─── Changes ─────────────────────────────────────────────────────────────────

/// One change event for a set of tracked fields: an entry whose tracked
/// values or deleted flag differ from the previous entry of the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
  pub id:        i64,
  pub record_id: i64,
  /// Values of the previous entry; `None` for the first entry of a record.
  pub old_value: Option<Vec<Value>>,
  pub new_value: Vec<Value>,
  pub manual:    bool,
  pub deleted:   bool,
  pub timestamp: DateTime<Utc>,
}

/// The most recent automatic change in a newest-first change list.
pub fn last_automatic(changes: &[Change]) -> Option<&Change> {
  changes.iter().find(|c| !c.manual)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entry(deleted: bool) -> HistoryEntry {
    HistoryEntry {
      id: 10,
      record_id: 3,
      fields: Row::new().with("accession", "P43003").with("symbol", "SLC1A3"),
      manual: false,
      deleted,
      user: Some("sync".into()),
      comments: None,
      timestamp: Utc::now(),
    }
  }

  #[test]
  fn derived_entry_keeps_record_and_state() {
    let prov = Provenance::manual().with_user("curator");
    let next = NewEntry::derived_from(&entry(true), &prov)
      .set(&Row::new().with("symbol", "EAAT1"));

    assert_eq!(next.record_id, Some(3));
    assert!(next.deleted);
    assert!(next.manual);
    assert_eq!(next.user.as_deref(), Some("curator"));
    assert_eq!(next.fields.get("symbol"), Some(&Value::from("EAAT1")));
    assert_eq!(next.fields.get("accession"), Some(&Value::from("P43003")));
  }

  #[test]
  fn comments_are_joined_by_newline() {
    let prov = Provenance::automatic().with_comments(["Files used:", "a.txt"]);
    assert_eq!(prov.comments.as_deref(), Some("Files used:\na.txt"));
  }

  #[test]
  fn last_automatic_skips_manual_changes() {
    let at = Utc::now();
    let change = |id, manual| Change {
      id,
      record_id: 1,
      old_value: None,
      new_value: vec![Value::Integer(id)],
      manual,
      deleted: false,
      timestamp: at,
    };
    let changes = vec![change(3, true), change(2, false), change(1, false)];
    assert_eq!(last_automatic(&changes).map(|c| c.id), Some(2));
    assert!(last_automatic(&[change(1, true)]).is_none());
  }
}
