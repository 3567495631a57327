//! Encoding and decoding helpers between [`slc_core`] types and the values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and booleans as `0`/`1`. Raw row
//! types hold what `rusqlite` hands back inside the connection thread; they
//! are decoded against the [`TableDef`] afterwards.

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use slc_core::{
  entry::{Change, HistoryEntry},
  schema::{ColumnDef, ColumnKind, TableDef},
  value::{Row, Value},
};

use crate::{Error, Result, schema::ident};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Value ───────────────────────────────────────────────────────────────────

pub fn encode_value(v: &Value) -> SqlValue {
  match v {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Real(r) => SqlValue::Real(*r),
    Value::Text(s) => SqlValue::Text(s.clone()),
  }
}

pub fn decode_value(col: &ColumnDef, v: SqlValue) -> Result<Value> {
  let mismatch = |found: &str| Error::Decode {
    column: col.name.clone(),
    reason: format!("expected {}, found {found}", col.kind),
  };
  match (col.kind, v) {
    (_, SqlValue::Null) => Ok(Value::Null),
    (ColumnKind::Integer, SqlValue::Integer(i)) => Ok(Value::Integer(i)),
    (ColumnKind::Real, SqlValue::Real(r)) => Ok(Value::Real(r)),
    (ColumnKind::Real, SqlValue::Integer(i)) => Ok(Value::Real(i as f64)),
    (ColumnKind::Text, SqlValue::Text(s)) => Ok(Value::Text(s)),
    (ColumnKind::Bool, SqlValue::Integer(i)) => Ok(Value::Bool(i != 0)),
    (_, SqlValue::Integer(_)) => Err(mismatch("integer")),
    (_, SqlValue::Real(_)) => Err(mismatch("real")),
    (_, SqlValue::Text(_)) => Err(mismatch("text")),
    (_, SqlValue::Blob(_)) => Err(mismatch("blob")),
  }
}

fn decode_row(def: &TableDef, values: Vec<SqlValue>) -> Result<Row> {
  def
    .columns()
    .iter()
    .zip(values)
    .map(|(col, v)| Ok((col.name.clone(), decode_value(col, v)?)))
    .collect()
}

fn decode_tuple(def: &TableDef, fields: &[String], values: Vec<SqlValue>) -> Result<Vec<Value>> {
  fields
    .iter()
    .zip(values)
    .map(|(name, v)| {
      let col = def.column(name).ok_or_else(|| Error::Decode {
        column: name.clone(),
        reason: "not a column".into(),
      })?;
      decode_value(col, v)
    })
    .collect()
}

// ─── Key predicates ──────────────────────────────────────────────────────────

/// `alias."a" IS ?n AND alias."b" IS ?n+1 ...` with its bound values.
/// Null-safe, so a `Null` key value matches `NULL`.
pub fn key_predicate(key: &Row, alias: &str, first_param: usize) -> (String, Vec<SqlValue>) {
  if key.is_empty() {
    return ("1".to_owned(), Vec::new());
  }
  let conds: Vec<String> = key
    .keys()
    .enumerate()
    .map(|(i, name)| format!("{alias}.{} IS ?{}", ident(name), first_param + i))
    .collect();
  let params = key.iter().map(|(_, v)| encode_value(v)).collect();
  (conds.join(" AND "), params)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEntry::from_row`].
pub fn entry_columns(def: &TableDef, alias: &str) -> String {
  let mut cols = vec![format!("{alias}.id"), format!("{alias}.record_id")];
  cols.extend(def.columns().iter().map(|c| format!("{alias}.{}", ident(&c.name))));
  cols.extend(
    ["manual", "deleted", "\"user\"", "comments", "timestamp"]
      .iter()
      .map(|c| format!("{alias}.{c}")),
  );
  cols.join(", ")
}

/// One history row as read from SQLite.
pub struct RawEntry {
  pub id:        i64,
  pub record_id: i64,
  pub values:    Vec<SqlValue>,
  pub manual:    bool,
  pub deleted:   bool,
  pub user:      Option<String>,
  pub comments:  Option<String>,
  pub timestamp: String,
}

impl RawEntry {
  /// Read a row selected with [`entry_columns`] for a table with `n`
  /// declared columns.
  pub fn from_row(row: &rusqlite::Row<'_>, n: usize) -> rusqlite::Result<Self> {
    let values: Vec<SqlValue> = (0..n).map(|i| row.get(2 + i)).collect::<rusqlite::Result<_>>()?;
    Ok(Self {
      id: row.get(0)?,
      record_id: row.get(1)?,
      values,
      manual: row.get(2 + n)?,
      deleted: row.get(3 + n)?,
      user: row.get(4 + n)?,
      comments: row.get(5 + n)?,
      timestamp: row.get(6 + n)?,
    })
  }

  pub fn into_entry(self, def: &TableDef) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      id:        self.id,
      record_id: self.record_id,
      fields:    decode_row(def, self.values)?,
      manual:    self.manual,
      deleted:   self.deleted,
      user:      self.user,
      comments:  self.comments,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// One change event as read by the self-join in
/// [`crate::SqliteStore`]'s `field_changes`.
pub struct RawChange {
  pub id:        i64,
  pub record_id: i64,
  pub has_prev:  bool,
  pub old:       Vec<SqlValue>,
  pub new:       Vec<SqlValue>,
  pub manual:    bool,
  pub deleted:   bool,
  pub timestamp: String,
}

impl RawChange {
  /// Column order: id, record_id, has_prev, old_1..old_n, new_1..new_n,
  /// manual, deleted, timestamp.
  pub fn from_row(row: &rusqlite::Row<'_>, n: usize) -> rusqlite::Result<Self> {
    let old: Vec<SqlValue> = (0..n).map(|i| row.get(3 + i)).collect::<rusqlite::Result<_>>()?;
    let new: Vec<SqlValue> = (0..n).map(|i| row.get(3 + n + i)).collect::<rusqlite::Result<_>>()?;
    Ok(Self {
      id: row.get(0)?,
      record_id: row.get(1)?,
      has_prev: row.get(2)?,
      old,
      new,
      manual: row.get(3 + 2 * n)?,
      deleted: row.get(4 + 2 * n)?,
      timestamp: row.get(5 + 2 * n)?,
    })
  }

  pub fn into_change(self, def: &TableDef, fields: &[String]) -> Result<Change> {
    let old_value = if self.has_prev {
      Some(decode_tuple(def, fields, self.old)?)
    } else {
      None
    };
    Ok(Change {
      id: self.id,
      record_id: self.record_id,
      old_value,
      new_value: decode_tuple(def, fields, self.new)?,
      manual: self.manual,
      deleted: self.deleted,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bool_columns_round_trip_through_integers() {
    let col = ColumnDef::bool("reviewed");
    assert_eq!(encode_value(&Value::Bool(true)), SqlValue::Integer(1));
    assert_eq!(decode_value(&col, SqlValue::Integer(1)).unwrap(), Value::Bool(true));
    assert_eq!(decode_value(&col, SqlValue::Integer(0)).unwrap(), Value::Bool(false));
  }

  #[test]
  fn decode_rejects_wrong_storage_class() {
    let col = ColumnDef::integer("tax_id");
    assert!(matches!(
      decode_value(&col, SqlValue::Text("9606".into())),
      Err(Error::Decode { .. })
    ));
    assert_eq!(decode_value(&col, SqlValue::Null).unwrap(), Value::Null);
  }

  #[test]
  fn key_predicate_numbers_params() {
    let key = Row::new().with("accession", "P43003").with("db", "HGNC");
    let (sql, params) = key_predicate(&key, "t1", 3);
    assert_eq!(sql, "t1.\"accession\" IS ?3 AND t1.\"db\" IS ?4");
    assert_eq!(params.len(), 2);
  }
}
