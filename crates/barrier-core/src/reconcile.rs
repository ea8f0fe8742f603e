//! Drift detection between the record store and the in-memory [`Info`].
//!
//! The record store wins: every mismatching field is overwritten with the
//! stored value. `last_update` is left alone; the caller touches it once per
//! cycle that found drift.

use tracing::info;

use crate::device::Info;
use crate::error::StoreResult;
use crate::record::{BarrierRecord, RecordStore};

/// One corrected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

/// Overwrite every comparable field of `info` that differs from `record`.
///
/// Comparison is exact string equality, in [`Info::COMPARABLE_FIELDS`] order.
pub fn apply_record(info: &mut Info, record: &BarrierRecord) -> Vec<FieldChange> {
    let stored = [
        &record.name,
        &record.latitude,
        &record.longitude,
        &record.firmware,
        &record.software,
        &record.modem,
        &record.ip,
        &record.fqdn,
    ];

    let mut changes = Vec::new();
    for ((field, current), stored) in info.comparable_fields_mut().into_iter().zip(stored) {
        if *current != *stored {
            let old = std::mem::replace(current, stored.clone());
            changes.push(FieldChange {
                field,
                old,
                new: stored.clone(),
            });
        }
    }
    changes
}

/// Fetch the stored record for `info.barrier_id` and apply it.
///
/// Performs exactly one store read. Returns whether any field changed.
pub async fn detect_and_apply_drift(info: &mut Info, store: &dyn RecordStore) -> StoreResult<bool> {
    let record = store.lookup_by_id(&info.barrier_id).await?;
    let changes = apply_record(info, &record);
    log_changes(&changes);
    Ok(!changes.is_empty())
}

/// Log each corrected field with its old and new value.
pub fn log_changes(changes: &[FieldChange]) {
    for change in changes {
        info!(
            "{} changed: {} is different than {}",
            change.field, change.old, change.new
        );
    }
}
