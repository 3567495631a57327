//! [`SqliteStore`]: the SQLite implementation of [`HistoryStore`].

use std::{
  collections::HashMap,
  path::Path,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use serde::Deserialize;
use slc_core::{
  entry::{Change, HistoryEntry, NewEntry},
  schema::TableDef,
  store::HistoryStore,
  value::{Row, Value},
};
use tracing::{debug, warn};

use crate::{
  Result,
  encode::{RawChange, RawEntry, encode_dt, encode_value, entry_columns, key_predicate},
  schema::{CONNECTION_PRAGMAS, history_ddl, ident},
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection behaviour, usually read from the batch driver's configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
  /// Retry a statement once when SQLite reports the database busy or locked.
  pub retry_transient: bool,
  /// How long SQLite itself waits on a lock before reporting busy.
  pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { retry_transient: false, busy_timeout_ms: 5_000 } }
}

fn is_transient(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, _))
      if matches!(
        err.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
      )
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A history store backed by a single SQLite file.
///
/// Cloning is cheap: the connection and the record id cache are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:      tokio_rusqlite::Connection,
  options:   StoreOptions,
  /// Last record id handed out per history table during this run.
  allocated: Arc<Mutex<HashMap<String, i64>>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path`.
  pub async fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, options).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, StoreOptions::default()).await
  }

  async fn init(conn: tokio_rusqlite::Connection, options: StoreOptions) -> Result<Self> {
    let timeout = Duration::from_millis(options.busy_timeout_ms);
    conn
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn, options, allocated: Arc::default() })
  }

  /// Run `f` on the connection thread, retrying once on a transient error
  /// when [`StoreOptions::retry_transient`] is set.
  async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: Fn(&mut rusqlite::Connection) -> rusqlite::Result<R> + Clone + Send + 'static,
    R: Send + 'static,
  {
    let first = f.clone();
    match self.conn.call(move |conn| Ok(first(conn)?)).await {
      Err(e) if self.options.retry_transient && is_transient(&e) => {
        warn!("transient database error, retrying once: {e}");
        Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
      }
      other => Ok(other?),
    }
  }

  async fn select_entries(
    &self,
    def: &TableDef,
    sql: String,
    params: Vec<SqlValue>,
  ) -> Result<Vec<HistoryEntry>> {
    debug!(%sql, "select");
    let n = def.columns().len();
    let raws: Vec<RawEntry> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            RawEntry::from_row(row, n)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|raw| raw.into_entry(def)).collect()
  }

  fn bump_cached(&self, table: &str) -> Option<i64> {
    let mut cache = self.allocated.lock().unwrap_or_else(PoisonError::into_inner);
    let last = cache.get_mut(table)?;
    *last += 1;
    Some(*last)
  }

  /// Keep the cache ahead of explicitly supplied record ids.
  fn note_record_id(&self, table: &str, record_id: i64) {
    let mut cache = self.allocated.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(last) = cache.get_mut(table)
      && *last < record_id
    {
      *last = record_id;
    }
  }

  async fn allocate(&self, def: &TableDef) -> Result<i64> {
    let table = def.history_table();
    if let Some(next) = self.bump_cached(&table) {
      return Ok(next);
    }

    let sql = format!("SELECT MAX(record_id) FROM {}", ident(&table));
    let max: Option<i64> = self
      .call(move |conn| conn.query_row(&sql, [], |r| r.get(0)))
      .await?;

    let mut cache = self.allocated.lock().unwrap_or_else(PoisonError::into_inner);
    let last = cache.entry(table).or_insert(max.unwrap_or(0));
    *last += 1;
    Ok(*last)
  }
}

// ─── HistoryStore impl ───────────────────────────────────────────────────────

impl HistoryStore for SqliteStore {
  type Error = crate::Error;

  async fn create_table<'a>(&'a self, def: &'a TableDef) -> Result<()> {
    let ddl = history_ddl(def);
    self
      .call(move |conn| conn.execute_batch(&ddl))
      .await?;
    Ok(())
  }

  async fn next_record_id<'a>(&'a self, def: &'a TableDef) -> Result<i64> {
    self.allocate(def).await
  }

  async fn append_entry<'a>(
    &'a self,
    def: &'a TableDef,
    entry: NewEntry,
  ) -> Result<Option<HistoryEntry>> {
    if entry.fields.is_empty() {
      debug!(table = def.name(), "nothing to write");
      return Ok(None);
    }
    def.check_row(&entry.fields)?;

    let record_id = match entry.record_id {
      Some(id) => id,
      None => self.allocate(def).await?,
    };
    let timestamp = Utc::now();

    // Every declared column is written so the returned entry matches what a
    // later read decodes.
    let mut fields = Row::new();
    for col in def.columns() {
      let value = match entry.fields.get(&col.name) {
        Some(v) => col.kind.coerce(v.clone()),
        None => Value::Null,
      };
      fields.insert(col.name.clone(), value);
    }

    let mut names = vec!["record_id".to_owned()];
    let mut params = vec![SqlValue::Integer(record_id)];
    for col in def.columns() {
      names.push(ident(&col.name));
      params.push(fields.get(&col.name).map(encode_value).unwrap_or(SqlValue::Null));
    }
    names.extend(
      ["manual", "deleted", "\"user\"", "comments", "timestamp"].map(str::to_owned),
    );
    params.extend([
      SqlValue::Integer(i64::from(entry.manual)),
      SqlValue::Integer(i64::from(entry.deleted)),
      entry.user.clone().map_or(SqlValue::Null, SqlValue::Text),
      entry.comments.clone().map_or(SqlValue::Null, SqlValue::Text),
      SqlValue::Text(encode_dt(timestamp)),
    ]);

    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
      "INSERT INTO {} ({}) VALUES ({})",
      ident(&def.history_table()),
      names.join(", "),
      placeholders.join(", ")
    );
    debug!(%sql, record_id, "append");

    let id = self
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    self.note_record_id(&def.history_table(), record_id);

    Ok(Some(HistoryEntry {
      id,
      record_id,
      fields,
      manual: entry.manual,
      deleted: entry.deleted,
      user: entry.user,
      comments: entry.comments,
      timestamp,
    }))
  }

  async fn entry<'a>(&'a self, def: &'a TableDef, id: i64) -> Result<Option<HistoryEntry>> {
    let sql = format!(
      "SELECT {} FROM {} AS h WHERE h.id = ?1",
      entry_columns(def, "h"),
      ident(&def.history_table())
    );
    let mut rows = self.select_entries(def, sql, vec![SqlValue::Integer(id)]).await?;
    Ok(rows.pop())
  }

  async fn latest_entry<'a>(
    &'a self,
    def: &'a TableDef,
    record_id: i64,
  ) -> Result<Option<HistoryEntry>> {
    let sql = format!(
      "SELECT {} FROM {} AS h WHERE h.record_id = ?1 ORDER BY h.id DESC LIMIT 1",
      entry_columns(def, "h"),
      ident(&def.history_table())
    );
    let mut rows = self
      .select_entries(def, sql, vec![SqlValue::Integer(record_id)])
      .await?;
    Ok(rows.pop())
  }

  async fn history<'a>(&'a self, def: &'a TableDef, key: &'a Row) -> Result<Vec<HistoryEntry>> {
    def.check_key(key)?;
    let (pred, params) = key_predicate(key, "h", 1);
    let sql = format!(
      "SELECT {} FROM {} AS h WHERE {pred} ORDER BY h.id",
      entry_columns(def, "h"),
      ident(&def.history_table())
    );
    self.select_entries(def, sql, params).await
  }

  async fn record_ids<'a>(&'a self, def: &'a TableDef, key: &'a Row) -> Result<Vec<i64>> {
    def.check_key(key)?;
    let (pred, params) = key_predicate(key, "h", 1);
    let sql = format!(
      "SELECT DISTINCT h.record_id FROM {} AS h WHERE {pred} ORDER BY h.record_id",
      ident(&def.history_table())
    );
    debug!(%sql, "select");
    let ids = self
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  async fn current_rows<'a>(
    &'a self,
    def: &'a TableDef,
    key: &'a Row,
  ) -> Result<Vec<HistoryEntry>> {
    def.check_key(key)?;
    let table = ident(&def.history_table());
    let (pred, params) = key_predicate(key, "h", 1);
    let sql = format!(
      "SELECT {cols} FROM {table} AS h
       WHERE {pred}
         AND h.deleted = 0
         AND h.id = (SELECT MAX(t.id) FROM {table} AS t WHERE t.record_id = h.record_id)
       ORDER BY h.id",
      cols = entry_columns(def, "h"),
    );
    self.select_entries(def, sql, params).await
  }

  async fn field_changes<'a>(
    &'a self,
    def: &'a TableDef,
    key: &'a Row,
    fields: &'a [String],
  ) -> Result<Vec<Change>> {
    if fields.is_empty() {
      return Err(slc_core::Error::NoFields.into());
    }
    def.check_key(key)?;
    def.check_fields(fields)?;

    let table = ident(&def.history_table());
    let (pred, params) = key_predicate(key, "t1", 1);
    let old_cols: Vec<String> = fields.iter().map(|f| format!("t2.{}", ident(f))).collect();
    let new_cols: Vec<String> = fields.iter().map(|f| format!("t1.{}", ident(f))).collect();
    let mut differs: Vec<String> = fields
      .iter()
      .map(|f| format!("t1.{0} IS NOT t2.{0}", ident(f)))
      .collect();
    differs.push("t1.deleted IS NOT t2.deleted".to_owned());

    // Pair every entry with its predecessor in the same record; keep the
    // entries where a tracked field or the deleted flag moved.
    let sql = format!(
      "SELECT t1.id, t1.record_id, t2.id IS NOT NULL,
              {old}, {new},
              t1.manual, t1.deleted, t1.timestamp
       FROM {table} AS t1
       LEFT JOIN {table} AS t2 ON t2.id = (
         SELECT MAX(t3.id) FROM {table} AS t3
         WHERE t3.record_id = t1.record_id AND t3.id < t1.id
       )
       WHERE ({pred}) AND (t2.id IS NULL OR {differs})
       ORDER BY t1.id DESC",
      old = old_cols.join(", "),
      new = new_cols.join(", "),
      differs = differs.join(" OR "),
    );
    debug!(%sql, "field changes");

    let n = fields.len();
    let raws: Vec<RawChange> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            RawChange::from_row(row, n)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|raw| raw.into_change(def, fields)).collect()
  }
}
