//! Change-log queries for the `history` subcommand.

use slc_core::{
  entry::Change,
  schema::TableDef,
  value::{Row, display_tuple},
};

use crate::{Error, Result};

/// Parse `FIELD=VALUE` pairs into a key, typing each value by its column.
/// `record_id` is accepted as an integer key.
pub fn parse_key(def: &TableDef, pairs: &[String]) -> Result<Row> {
  let mut key = Row::new();
  for pair in pairs {
    let (field, value) = pair
      .split_once('=')
      .ok_or_else(|| Error::KeySyntax(pair.clone()))?;
    let kind = def.key_kind(field)?;
    key.insert(field, kind.parse_value(value)?);
  }
  Ok(key)
}

/// `#12 record 3 2026-01-05T10:00:00Z manual 'SLC1A3' -> 'EAAT1'`
pub fn format_change(change: &Change) -> String {
  let source = if change.manual { "manual" } else { "auto" };
  let old = change
    .old_value
    .as_deref()
    .map_or_else(|| "(new)".to_owned(), display_tuple);
  let mut line = format!(
    "#{} record {} {} {source:<6} {old} -> {}",
    change.id,
    change.record_id,
    change.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
    display_tuple(&change.new_value),
  );
  if change.deleted {
    line.push_str(" [deleted]");
  }
  line
}

/// Oldest first, one change per line.
pub fn render_changes(changes: &[Change]) -> String {
  changes
    .iter()
    .rev()
    .map(|c| format_change(c) + "\n")
    .collect()
}

#[cfg(test)]
mod tests {
  use slc_core::value::Value;

  use super::*;
  use crate::tables;

  #[test]
  fn key_values_are_typed_by_column() {
    let def = tables::proteins().unwrap();
    let key = parse_key(
      &def,
      &["accession=P43003".to_owned(), "tax_id=9606".to_owned(), "record_id=7".to_owned()],
    )
    .unwrap();
    assert_eq!(key.get("accession"), Some(&Value::from("P43003")));
    assert_eq!(key.get("tax_id"), Some(&Value::Integer(9606)));
    assert_eq!(key.get("record_id"), Some(&Value::Integer(7)));
  }

  #[test]
  fn malformed_keys_are_rejected() {
    let def = tables::proteins().unwrap();
    assert!(matches!(
      parse_key(&def, &["accession".to_owned()]),
      Err(Error::KeySyntax(_))
    ));
    assert!(matches!(
      parse_key(&def, &["tax_id=human".to_owned()]),
      Err(Error::Core(slc_core::Error::ParseValue { .. }))
    ));
    assert!(matches!(
      parse_key(&def, &["gene=SLC1A3".to_owned()]),
      Err(Error::Core(slc_core::Error::UnknownColumn { .. }))
    ));
  }
}
