//! Scalar field reconciliation for one record.

use tracing::debug;

use super::{Action, Operation, ReconcilePlan, Reconciler, WarningKind};
use crate::{
  Error, Result,
  entry::{HistoryEntry, NewEntry, last_automatic},
  store::HistoryStore,
  value::{Row, Value},
};

impl<S: HistoryStore> Reconciler<'_, S> {
  /// Plan the update of `current` (a record's latest entry) towards
  /// `desired`, restricted to `keys` when given.
  ///
  /// In an automated run a changed field is left alone when
  /// - it was never set automatically,
  /// - the proposed value is its last automatic value (a curator already
  ///   moved away from it), or
  /// - its latest change was manual.
  ///
  /// Surviving fields are written together as one entry.
  pub async fn plan_update(
    &self,
    current: &HistoryEntry,
    desired: &Row,
    keys: Option<&[String]>,
  ) -> Result<ReconcilePlan> {
    let desired = self.table.coerce_row(desired)?;
    let keys: Vec<String> = match keys {
      Some(keys) => keys.to_vec(),
      None => desired.keys().cloned().collect(),
    };
    self.table.check_fields(&keys)?;

    let mut plan = ReconcilePlan::default();
    let record_key = Row::record(current.record_id);

    let changed: Vec<(&String, &Value)> = keys
      .iter()
      .filter_map(|k| desired.get(k).map(|v| (k, v)))
      .filter(|(k, v)| current.fields.get(k) != Some(*v))
      .collect();

    let mut overrides = Row::new();
    for (field, new_value) in changed {
      if !self.is_manual() {
        let tracked = [field.clone()];
        let changes = self
          .store
          .field_changes(self.table, &record_key, &tracked)
          .await
          .map_err(Error::store)?;

        let kind = match last_automatic(&changes) {
          None => Some(WarningKind::NoAutomaticHistory { field: field.clone() }),
          Some(auto) if auto.new_value.as_slice() == std::slice::from_ref(new_value) => {
            Some(WarningKind::NotReverting {
              field: field.clone(),
              value: new_value.clone(),
            })
          }
          Some(_) if changes.first().is_some_and(|c| c.manual) => {
            Some(WarningKind::ManualOverride {
              field: field.clone(),
              value: new_value.clone(),
            })
          }
          Some(_) => None,
        };
        if let Some(kind) = kind {
          self.warn(&mut plan, &record_key, Some(current.record_id), kind);
          continue;
        }
      }
      debug!(
        table = self.table.name(),
        record_id = current.record_id,
        "{field}: {:?} -> {new_value}",
        current.fields.get(field),
      );
      overrides.insert(field.clone(), new_value.clone());
    }

    if !overrides.is_empty() {
      let entry = NewEntry::derived_from(current, &self.provenance).set(&overrides);
      plan.push(Operation::derived(Action::Update, current, entry));
    }
    Ok(plan)
  }
}
