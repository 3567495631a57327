//! Render a [`ReconcilePlan`] as a reviewable SQL script.
//!
//! Every operation becomes one `INSERT` into the history table with literal
//! values. Inserts receive explicit record ids from the store's allocator, so
//! a script must be applied before the next one is generated.

use crate::{
  Error, Result,
  literal::quote_ident,
  reconcile::ReconcilePlan,
  schema::{COMMENTS, DELETED, MANUAL, RECORD_ID, TableDef, USER},
  store::HistoryStore,
  value::Value,
};

/// Render `plan` for `def`. Operations with no fields are skipped.
pub async fn render_script<S: HistoryStore>(
  store: &S,
  def: &TableDef,
  plan: &ReconcilePlan,
) -> Result<String> {
  let table = quote_ident(&def.history_table());
  let mut out = String::new();

  for op in &plan.operations {
    let entry = &op.entry;
    if entry.fields.is_empty() {
      continue;
    }
    let record_id = match entry.record_id {
      Some(id) => id,
      None => store.next_record_id(def).await.map_err(Error::store)?,
    };

    let mut columns = vec![quote_ident(RECORD_ID), quote_ident(MANUAL), quote_ident(DELETED)];
    let mut values = vec![
      Value::Integer(record_id).to_literal(),
      Value::Bool(entry.manual).to_literal(),
      Value::Bool(entry.deleted).to_literal(),
    ];
    for col in def.columns() {
      if let Some(v) = entry.fields.get(&col.name) {
        columns.push(quote_ident(&col.name));
        values.push(v.to_literal());
      }
    }
    if let Some(user) = &entry.user {
      columns.push(quote_ident(USER));
      values.push(Value::from(user.as_str()).to_literal());
    }
    if let Some(comments) = &entry.comments {
      columns.push(quote_ident(COMMENTS));
      values.push(Value::from(comments.as_str()).to_literal());
    }

    out.push_str(&match op.base_id {
      Some(base) => format!("-- {} record #{record_id} (from entry #{base})\n", op.action),
      None => format!("-- {} record #{record_id}\n", op.action),
    });
    out.push_str(&format!(
      "INSERT INTO {table} ({}) VALUES ({});\n",
      columns.join(", "),
      values.join(", ")
    ));
  }
  Ok(out)
}
