//! Table definitions for history-tracked entity types.
//!
//! A [`TableDef`] names the user columns of one entity type. Backends add the
//! bookkeeping columns themselves (`id`, `record_id`, `manual`, `deleted`,
//! `user`, `comments`, `timestamp`), which is why those names are reserved.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  value::{Row, Value},
};

pub const ID: &str = "id";
pub const RECORD_ID: &str = "record_id";
pub const MANUAL: &str = "manual";
pub const DELETED: &str = "deleted";
pub const USER: &str = "user";
pub const COMMENTS: &str = "comments";
pub const TIMESTAMP: &str = "timestamp";

/// Bookkeeping columns every history table carries.
pub const RESERVED: [&str; 7] = [ID, RECORD_ID, MANUAL, DELETED, USER, COMMENTS, TIMESTAMP];

// ─── Columns ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
  Integer,
  Real,
  Text,
  Bool,
}

impl ColumnKind {
  /// Whether a value may be stored in a column of this kind. `Null` always
  /// fits; integers widen into real columns.
  pub fn accepts(self, value: &Value) -> bool {
    matches!(
      (self, value),
      (_, Value::Null)
        | (Self::Integer, Value::Integer(_))
        | (Self::Real, Value::Real(_) | Value::Integer(_))
        | (Self::Text, Value::Text(_))
        | (Self::Bool, Value::Bool(_))
    )
  }

  /// The stored form of an accepted value: integers become reals in real
  /// columns, everything else is unchanged.
  pub fn coerce(self, value: Value) -> Value {
    match (self, value) {
      (Self::Real, Value::Integer(i)) => Value::Real(i as f64),
      (_, value) => value,
    }
  }

  /// Parse command-line text into a value of this kind. `NULL` parses as
  /// [`Value::Null`] for every kind.
  pub fn parse_value(self, input: &str) -> Result<Value> {
    if input == "NULL" {
      return Ok(Value::Null);
    }
    let err = || Error::ParseValue { kind: self, input: input.to_owned() };
    match self {
      Self::Integer => input.parse().map(Value::Integer).map_err(|_| err()),
      Self::Real => input.parse().map(Value::Real).map_err(|_| err()),
      Self::Text => Ok(Value::Text(input.to_owned())),
      Self::Bool => match input {
        "1" | "true" => Ok(Value::Bool(true)),
        "0" | "false" => Ok(Value::Bool(false)),
        _ => Err(err()),
      },
    }
  }
}

impl fmt::Display for ColumnKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Integer => "integer",
      Self::Real => "real",
      Self::Text => "text",
      Self::Bool => "bool",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
  pub name: String,
  pub kind: ColumnKind,
}

impl ColumnDef {
  pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
    Self { name: name.into(), kind }
  }

  pub fn integer(name: impl Into<String>) -> Self { Self::new(name, ColumnKind::Integer) }

  pub fn real(name: impl Into<String>) -> Self { Self::new(name, ColumnKind::Real) }

  pub fn text(name: impl Into<String>) -> Self { Self::new(name, ColumnKind::Text) }

  pub fn bool(name: impl Into<String>) -> Self { Self::new(name, ColumnKind::Bool) }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// One entity type. Construct with [`TableDef::new`], which validates names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDef {
  name:    String,
  columns: Vec<ColumnDef>,
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl TableDef {
  pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Result<Self> {
    let name = name.into();
    if !is_identifier(&name) {
      return Err(Error::InvalidIdentifier(name));
    }
    let mut seen = HashSet::new();
    for col in &columns {
      if !is_identifier(&col.name) {
        return Err(Error::InvalidIdentifier(col.name.clone()));
      }
      if RESERVED.contains(&col.name.as_str()) {
        return Err(Error::ReservedColumn(col.name.clone()));
      }
      if !seen.insert(col.name.as_str()) {
        return Err(Error::DuplicateColumn(col.name.clone()));
      }
    }
    Ok(Self { name, columns })
  }

  /// Name of the current-state view.
  pub fn name(&self) -> &str { &self.name }

  /// Name of the append-only history table.
  pub fn history_table(&self) -> String { format!("{}_history", self.name) }

  pub fn columns(&self) -> &[ColumnDef] { &self.columns }

  pub fn column(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  fn unknown(&self, column: &str) -> Error {
    Error::UnknownColumn { table: self.name.clone(), column: column.to_owned() }
  }

  /// Every name must be a declared column.
  pub fn check_fields(&self, fields: &[String]) -> Result<()> {
    match fields.iter().find(|f| self.column(f).is_none()) {
      Some(f) => Err(self.unknown(f)),
      None => Ok(()),
    }
  }

  /// Every column must be declared and every value must fit its kind.
  pub fn check_row(&self, row: &Row) -> Result<()> {
    for (name, value) in row.iter() {
      let col = self.column(name).ok_or_else(|| self.unknown(name))?;
      self.check_value(col, value)?;
    }
    Ok(())
  }

  /// Like [`TableDef::check_row`], but `record_id` may also be used.
  pub fn check_key(&self, key: &Row) -> Result<()> {
    for (name, value) in key.iter() {
      if name == RECORD_ID {
        if !matches!(value, Value::Integer(_)) {
          return Err(Error::TypeMismatch {
            table:    self.name.clone(),
            column:   name.clone(),
            expected: ColumnKind::Integer,
            found:    value.type_name(),
          });
        }
        continue;
      }
      let col = self.column(name).ok_or_else(|| self.unknown(name))?;
      self.check_value(col, value)?;
    }
    Ok(())
  }

  fn check_value(&self, col: &ColumnDef, value: &Value) -> Result<()> {
    if col.kind.accepts(value) {
      Ok(())
    } else {
      Err(Error::TypeMismatch {
        table:    self.name.clone(),
        column:   col.name.clone(),
        expected: col.kind,
        found:    value.type_name(),
      })
    }
  }

  /// Check `row`, then convert its values to their stored form so they
  /// compare equal to what the store reads back.
  pub fn coerce_row(&self, row: &Row) -> Result<Row> {
    self.check_row(row)?;
    Ok(
      row
        .iter()
        .map(|(name, value)| {
          let value = match self.column(name) {
            Some(col) => col.kind.coerce(value.clone()),
            None => value.clone(),
          };
          (name.clone(), value)
        })
        .collect(),
    )
  }

  /// [`TableDef::coerce_row`] for a tuple of `fields` values.
  pub fn coerce_tuple(&self, fields: &[String], values: Vec<Value>) -> Result<Vec<Value>> {
    let row = self.coerce_row(&Row::zip(fields, &values))?;
    Ok(row.project(fields))
  }

  /// Kind of a key column, counting `record_id` as an integer.
  pub fn key_kind(&self, name: &str) -> Result<ColumnKind> {
    if name == RECORD_ID {
      return Ok(ColumnKind::Integer);
    }
    self.column(name).map(|c| c.kind).ok_or_else(|| self.unknown(name))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dbrefs() -> TableDef {
    TableDef::new(
      "uniprot_dbrefs",
      vec![
        ColumnDef::text("accession"),
        ColumnDef::text("db"),
        ColumnDef::text("xref"),
      ],
    )
    .unwrap()
  }

  #[test]
  fn rejects_bad_identifiers() {
    assert!(matches!(
      TableDef::new("drop table", vec![]),
      Err(Error::InvalidIdentifier(_))
    ));
    assert!(matches!(
      TableDef::new("t", vec![ColumnDef::text("1abc")]),
      Err(Error::InvalidIdentifier(_))
    ));
  }

  #[test]
  fn rejects_reserved_and_duplicate_columns() {
    assert!(matches!(
      TableDef::new("t", vec![ColumnDef::bool("deleted")]),
      Err(Error::ReservedColumn(c)) if c == "deleted"
    ));
    assert!(matches!(
      TableDef::new("t", vec![ColumnDef::text("a"), ColumnDef::integer("a")]),
      Err(Error::DuplicateColumn(_))
    ));
  }

  #[test]
  fn history_table_name() {
    assert_eq!(dbrefs().history_table(), "uniprot_dbrefs_history");
  }

  #[test]
  fn check_row_reports_unknown_column_and_type() {
    let def = dbrefs();
    let unknown = Row::new().with("symbol", "SLC1A1");
    assert!(matches!(
      def.check_row(&unknown),
      Err(Error::UnknownColumn { column, .. }) if column == "symbol"
    ));

    let wrong = Row::new().with("db", 5_i64);
    assert!(matches!(
      def.check_row(&wrong),
      Err(Error::TypeMismatch { expected: ColumnKind::Text, found: "integer", .. })
    ));

    let ok = Row::new().with("db", "HGNC").with("xref", Value::Null);
    assert!(def.check_row(&ok).is_ok());
  }

  #[test]
  fn record_id_only_allowed_in_keys() {
    let def = dbrefs();
    let key = Row::record(3);
    assert!(def.check_key(&key).is_ok());
    assert!(def.check_row(&key).is_err());
  }

  #[test]
  fn integers_widen_to_reals_in_real_columns() {
    let def = TableDef::new(
      "hits",
      vec![ColumnDef::text("accession"), ColumnDef::real("score"), ColumnDef::integer("rank")],
    )
    .unwrap();
    let row = def
      .coerce_row(&Row::new().with("score", 42_i64).with("rank", 3_i64))
      .unwrap();
    assert_eq!(row.get("score"), Some(&Value::Real(42.0)));
    assert_eq!(row.get("rank"), Some(&Value::Integer(3)));

    let fields = vec!["score".to_owned(), "accession".to_owned()];
    let tuple = def
      .coerce_tuple(&fields, vec![Value::Integer(1), Value::from("P1")])
      .unwrap();
    assert_eq!(tuple, vec![Value::Real(1.0), Value::from("P1")]);
    assert!(def.coerce_row(&Row::new().with("rank", 1.5)).is_err());
  }

  #[test]
  fn parse_values_by_kind() {
    assert_eq!(ColumnKind::Integer.parse_value("9606").unwrap(), Value::Integer(9606));
    assert_eq!(ColumnKind::Bool.parse_value("true").unwrap(), Value::Bool(true));
    assert_eq!(ColumnKind::Text.parse_value("NULL").unwrap(), Value::Null);
    assert!(ColumnKind::Real.parse_value("x").is_err());
  }
}
