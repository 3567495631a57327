//! Typed scalar values and rows.
//!
//! A [`Row`] is an ordered mapping from column name to [`Value`]. Rows are
//! used for field snapshots, for key predicates (a conjunction of equalities)
//! and for the overrides carried by update entries.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single scalar column value.
///
/// Comparison is exact: `Text` compares byte-wise and `Integer(1)` is not
/// equal to `Real(1.0)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Integer(i64),
  Real(f64),
  Text(String),
}

impl Value {
  /// Short name of the variant, used in type errors.
  pub fn type_name(&self) -> &'static str {
    match self {
      Self::Null => "null",
      Self::Bool(_) => "bool",
      Self::Integer(_) => "integer",
      Self::Real(_) => "real",
      Self::Text(_) => "text",
    }
  }
}

/// Renders the SQL literal form; see [`Value::to_literal`].
impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_literal())
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Self::Bool(v) }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Self::Integer(v) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Self::Integer(v.into()) }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self { Self::Integer(v.into()) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Self::Real(v) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self { v.map_or(Self::Null, Into::into) }
}

/// Render a value tuple as `(a, b)`, or just `a` for a single component.
pub fn display_tuple(values: &[Value]) -> String {
  match values {
    [single] => single.to_literal(),
    many => format!(
      "({})",
      many.iter().map(Value::to_literal).collect::<Vec<_>>().join(", ")
    ),
  }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// Column name → value. Iteration is ordered by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
  pub fn new() -> Self { Self::default() }

  /// A key predicate selecting every entry of one logical record.
  pub fn record(record_id: i64) -> Self {
    Self::new().with(crate::schema::RECORD_ID, record_id)
  }

  /// Builder-style insert.
  pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.insert(column, value);
    self
  }

  pub fn insert(
    &mut self,
    column: impl Into<String>,
    value: impl Into<Value>,
  ) -> Option<Value> {
    self.0.insert(column.into(), value.into())
  }

  pub fn get(&self, column: &str) -> Option<&Value> { self.0.get(column) }

  pub fn contains_key(&self, column: &str) -> bool { self.0.contains_key(column) }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn keys(&self) -> impl Iterator<Item = &String> { self.0.keys() }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }

  /// Whether every column of `key` holds the same value here.
  pub fn matches(&self, key: &Row) -> bool {
    key.iter().all(|(k, v)| self.get(k) == Some(v))
  }

  /// Copy every column of `other` into `self`, overwriting on collision.
  pub fn merge(&mut self, other: &Row) {
    for (k, v) in other.iter() {
      self.0.insert(k.clone(), v.clone());
    }
  }

  /// The values of `fields` in order; absent columns project as `Null`.
  pub fn project(&self, fields: &[String]) -> Vec<Value> {
    fields
      .iter()
      .map(|f| self.get(f).cloned().unwrap_or_default())
      .collect()
  }

  /// Pair `fields` with the components of `values`.
  pub fn zip(fields: &[String], values: &[Value]) -> Self {
    fields.iter().cloned().zip(values.iter().cloned()).collect()
  }
}

impl fmt::Display for Row {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
    write!(f, "{{{}}}", parts.join(", "))
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

impl IntoIterator for Row {
  type Item = (String, Value);
  type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn project_fills_missing_with_null() {
    let row = Row::new().with("db", "HGNC").with("xref", "HGNC:10939");
    let fields = vec!["xref".to_string(), "db".to_string(), "extra".to_string()];
    assert_eq!(
      row.project(&fields),
      vec![Value::from("HGNC:10939"), Value::from("HGNC"), Value::Null]
    );
  }

  #[test]
  fn matches_requires_every_key_column() {
    let row = Row::new().with("accession", "P43003").with("db", "HGNC");
    assert!(row.matches(&Row::new()));
    assert!(row.matches(&Row::new().with("accession", "P43003")));
    assert!(!row.matches(&Row::new().with("accession", "P43004")));
    assert!(!row.matches(&Row::new().with("xref", Value::Null)));
  }

  #[test]
  fn text_comparison_is_case_sensitive() {
    assert_ne!(Value::from("Slc1a1"), Value::from("SLC1A1"));
    assert_ne!(Value::Integer(1), Value::Real(1.0));
  }

  #[test]
  fn untagged_json_shapes() {
    let row: Row =
      serde_json::from_str(r#"{"a": null, "b": true, "c": 3, "d": 1.5, "e": "x"}"#)
        .unwrap();
    assert_eq!(row.get("a"), Some(&Value::Null));
    assert_eq!(row.get("b"), Some(&Value::Bool(true)));
    assert_eq!(row.get("c"), Some(&Value::Integer(3)));
    assert_eq!(row.get("d"), Some(&Value::Real(1.5)));
    assert_eq!(row.get("e"), Some(&Value::from("x")));
  }

  #[test]
  fn tuple_display() {
    assert_eq!(display_tuple(&[Value::from("a")]), "'a'");
    assert_eq!(
      display_tuple(&[Value::from("HGNC"), Value::Integer(4)]),
      "('HGNC', 4)"
    );
  }
}
