//! SQL literal rendering for emitted scripts.
//!
//! Direct application always binds parameters; these helpers are only used
//! when a reconciliation is written out as a reviewable SQL script. String
//! escaping follows MySQL string-literal rules: `%` and `_` only need escaping
//! in a `LIKE` context, and `"` needs none inside single quotes.

use crate::value::Value;

/// Backslash-escape NUL, quote, backspace, newline, carriage return, tab and
/// backslash.
pub fn escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '\0' => out.push_str("\\0"),
      '\'' => out.push_str("\\'"),
      '\u{8}' => out.push_str("\\b"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      '\\' => out.push_str("\\\\"),
      other => out.push(other),
    }
  }
  out
}

/// Back-quoted identifier.
pub fn quote_ident(name: &str) -> String { format!("`{}`", name.replace('`', "``")) }

impl Value {
  /// Render as a SQL literal: integers and booleans in decimal, reals in
  /// shortest round-trip form, text single-quoted and escaped.
  pub fn to_literal(&self) -> String {
    match self {
      Self::Null => "NULL".to_owned(),
      Self::Bool(b) => i64::from(*b).to_string(),
      Self::Integer(i) => i.to_string(),
      Self::Real(r) if r.is_finite() => format!("{r:?}"),
      Self::Real(_) => "NULL".to_owned(),
      Self::Text(s) => format!("'{}'", escape(s)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_control_and_quote_characters() {
    assert_eq!(escape("O'Brien"), "O\\'Brien");
    assert_eq!(escape("a\nb\tc\rd"), "a\\nb\\tc\\rd");
    assert_eq!(escape("nul\0back\u{8}"), "nul\\0back\\b");
    assert_eq!(escape("C:\\path"), "C:\\\\path");
  }

  #[test]
  fn leaves_like_wildcards_and_double_quotes() {
    assert_eq!(escape("50% \"off\"_x"), "50% \"off\"_x");
  }

  #[test]
  fn literals() {
    assert_eq!(Value::Null.to_literal(), "NULL");
    assert_eq!(Value::Bool(true).to_literal(), "1");
    assert_eq!(Value::Bool(false).to_literal(), "0");
    assert_eq!(Value::Integer(-42).to_literal(), "-42");
    assert_eq!(Value::Real(1.0).to_literal(), "1.0");
    assert_eq!(Value::Real(2.5e-30).to_literal(), "2.5e-30");
    assert_eq!(Value::Real(f64::NAN).to_literal(), "NULL");
    assert_eq!(Value::from("it's").to_literal(), "'it\\'s'");
  }

  #[test]
  fn identifiers() {
    assert_eq!(quote_ident("uniprot_history"), "`uniprot_history`");
    assert_eq!(quote_ident("we`ird"), "`we``ird`");
  }
}
