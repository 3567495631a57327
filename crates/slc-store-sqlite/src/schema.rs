//! SQL schema for history tables.
//!
//! Each [`TableDef`] maps to an append-only `<name>_history` table plus a
//! `<name>` view of the current live rows. Identifiers are validated by
//! `TableDef`, so quoting here only guards against keywords.

use slc_core::schema::{ColumnKind, TableDef};

/// Executed once per connection.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// Double-quoted SQLite identifier.
pub fn ident(name: &str) -> String { format!("\"{}\"", name.replace('"', "\"\"")) }

fn column_type(kind: ColumnKind) -> &'static str {
  match kind {
    ColumnKind::Integer | ColumnKind::Bool => "INTEGER",
    ColumnKind::Real => "REAL",
    ColumnKind::Text => "TEXT",
  }
}

/// DDL for `def`; idempotent thanks to `IF NOT EXISTS`.
pub fn history_ddl(def: &TableDef) -> String {
  let history = def.history_table();
  let table = ident(&history);
  let columns: String = def
    .columns()
    .iter()
    .map(|c| format!("    {} {},\n", ident(&c.name), column_type(c.kind)))
    .collect();

  format!(
    "
-- Strictly append-only: no UPDATE or DELETE is ever issued against it.
CREATE TABLE IF NOT EXISTS {table} (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id   INTEGER NOT NULL,
{columns}    manual      INTEGER NOT NULL DEFAULT 0,
    deleted     INTEGER NOT NULL DEFAULT 0,
    \"user\"      TEXT,
    comments    TEXT,
    timestamp   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS {record_idx} ON {table}(record_id, id);

-- Latest entry of every live record.
CREATE VIEW IF NOT EXISTS {view} AS
    SELECT h.* FROM {table} AS h
    WHERE h.id = (SELECT MAX(t.id) FROM {table} AS t WHERE t.record_id = h.record_id)
      AND h.deleted = 0;
",
    record_idx = ident(&format!("{history}_record_idx")),
    view = ident(def.name()),
  )
}
