//! One-to-many reconciliation: converge the set of live values stored under a
//! key (e.g. every cross-reference of one protein) onto a desired set.
//!
//! Every value ever stored under the key has its own record. For each record
//! the latest change decides its fate:
//!
//! - live and desired: nothing to do;
//! - deleted and desired: undelete, unless a curator deleted it and this is
//!   an automated run;
//! - not desired, but its last automatic value is: a curator overrode that
//!   value, so only a manual run may restore it;
//! - otherwise: delete it (automated runs spare manually set values).
//!
//! Records whose latest entry has moved to another key are left alone.
//! Desired values still missing afterwards are written into a deleted or
//! doomed record whose history already held them, or into a new record.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use super::{Action, Operation, ReconcilePlan, Reconciler, WarningKind};
use crate::{
  Error, Result,
  entry::{HistoryEntry, NewEntry, last_automatic},
  store::HistoryStore,
  value::{Row, Value, display_tuple},
};

fn position(wanted: &[Vec<Value>], value: &[Value]) -> Option<usize> {
  wanted.iter().position(|w| w.as_slice() == value)
}

impl<S: HistoryStore> Reconciler<'_, S> {
  /// Plan the convergence of `fields` under `key` onto `desired`, a set of
  /// value tuples in `fields` order. Duplicate tuples are ignored.
  pub async fn plan_one_to_many(
    &self,
    fields: &[String],
    key: &Row,
    desired: Vec<Vec<Value>>,
  ) -> Result<ReconcilePlan> {
    if fields.is_empty() {
      return Err(Error::NoFields);
    }
    self.table.check_fields(fields)?;
    let key = &self.table.coerce_row(key)?;

    let mut wanted: Vec<Vec<Value>> = Vec::with_capacity(desired.len());
    for value in desired {
      if value.len() != fields.len() {
        return Err(Error::Arity { expected: fields.len(), found: value.len() });
      }
      let value = self.table.coerce_tuple(fields, value)?;
      if !wanted.contains(&value) {
        wanted.push(value);
      }
    }

    let mut plan = ReconcilePlan::default();
    let mut bases: HashMap<i64, HistoryEntry> = HashMap::new();
    let mut to_delete: Vec<i64> = Vec::new();
    // (historical value, record id) pairs eligible for reuse
    let mut candidates: Vec<(Vec<Value>, i64)> = Vec::new();

    let record_ids = self
      .store
      .record_ids(self.table, key)
      .await
      .map_err(Error::store)?;

    for record_id in record_ids {
      let record_key = Row::record(record_id);
      let changes = self
        .store
        .field_changes(self.table, &record_key, fields)
        .await
        .map_err(Error::store)?;
      let Some(latest) = changes.first() else {
        continue;
      };
      let base = self
        .store
        .latest_entry(self.table, record_id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::RecordNotFound(record_id))?;
      // A curator moved the record to another key; it is no longer ours.
      if !base.fields.matches(key) {
        debug!(
          table = self.table.name(),
          record_id,
          "record no longer under {key}, skipping"
        );
        continue;
      }
      let value = latest.new_value.clone();

      // The record's current value is desired.
      if let Some(pos) = position(&wanted, &value) {
        if base.is_live() {
          debug!(
            table = self.table.name(),
            record_id,
            "{} already live",
            display_tuple(&value)
          );
        } else if latest.manual && !self.is_manual() {
          self.warn(
            &mut plan,
            key,
            Some(record_id),
            WarningKind::ManualDeletionKept { value: value.clone() },
          );
        } else {
          let kind = if latest.manual {
            WarningKind::UndeletingManualDeletion { value: value.clone() }
          } else {
            WarningKind::UndeletingAutomaticDeletion { value: value.clone() }
          };
          self.warn(&mut plan, key, Some(record_id), kind);
          let entry = NewEntry::derived_from(&base, &self.provenance).deleted(false);
          plan.push(Operation::derived(Action::Undelete, &base, entry));
        }
        wanted.remove(pos);
        bases.insert(record_id, base);
        continue;
      }

      // A curator replaced a value automation still wants.
      if let Some(auto) = last_automatic(&changes)
        && let Some(pos) = position(&wanted, &auto.new_value)
      {
        if self.is_manual() {
          self.warn(
            &mut plan,
            key,
            Some(record_id),
            WarningKind::RevertingOverride { value: auto.new_value.clone() },
          );
          let entry = NewEntry::derived_from(&base, &self.provenance)
            .set(&Row::zip(fields, &auto.new_value))
            .deleted(false);
          plan.push(Operation::derived(Action::Revert, &base, entry));
        } else {
          self.warn(
            &mut plan,
            key,
            Some(record_id),
            WarningKind::OverriddenValueKept { value: auto.new_value.clone() },
          );
        }
        wanted.remove(pos);
        bases.insert(record_id, base);
        continue;
      }

      // The current value is unwanted.
      let doomed = if latest.deleted {
        false
      } else if self.is_manual() {
        self.warn(
          &mut plan,
          key,
          Some(record_id),
          WarningKind::DeletingManually { value: value.clone() },
        );
        true
      } else if latest.manual {
        self.warn(
          &mut plan,
          key,
          Some(record_id),
          WarningKind::ManualValueKept { value: value.clone() },
        );
        false
      } else {
        true
      };
      if doomed {
        to_delete.push(record_id);
      }

      // Dead slots may be repurposed for any value they held before.
      if latest.deleted || doomed {
        for change in &changes {
          let held = (change.new_value.clone(), record_id);
          if wanted.contains(&change.new_value) && !candidates.contains(&held) {
            candidates.push(held);
          }
        }
      }
      bases.insert(record_id, base);
    }

    let mut reused: HashSet<i64> = HashSet::new();
    for value in wanted {
      let slot = candidates
        .iter()
        .find(|(v, id)| *v == value && !reused.contains(id))
        .and_then(|(_, id)| bases.get(id));

      match slot {
        Some(base) => {
          reused.insert(base.record_id);
          self.warn(
            &mut plan,
            key,
            Some(base.record_id),
            WarningKind::ReusingRecord { value: value.clone() },
          );
          let entry = NewEntry::derived_from(base, &self.provenance)
            .set(&Row::zip(fields, &value))
            .deleted(false);
          plan.push(Operation::derived(Action::Reuse, base, entry));
        }
        None => {
          info!(
            table = self.table.name(),
            "new value {} for {key}",
            display_tuple(&value)
          );
          let mut row = key.clone();
          row.merge(&Row::zip(fields, &value));
          plan.push(Operation::insert(NewEntry::new(row, &self.provenance)));
        }
      }
    }

    for record_id in to_delete {
      if reused.contains(&record_id) {
        continue;
      }
      let Some(base) = bases.get(&record_id) else {
        continue;
      };
      info!(table = self.table.name(), record_id, "deleting record for {key}");
      let entry = NewEntry::derived_from(base, &self.provenance).deleted(true);
      plan.push(Operation::derived(Action::Delete, base, entry));
    }

    Ok(plan)
  }
}
