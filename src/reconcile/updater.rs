//! Record mutation and the staged-persistence discipline

use tracing::debug;

use crate::traits::BackingStore;
use crate::types::*;

/// Sole writer of discrepancy-record outcome fields
///
/// Mutations are staged in memory on the records themselves; the backing
/// store is only touched twice per run, both times through the
/// [`BackingStore`] seam: once to back up the pre-run state, once to
/// commit the full batch. A crash between the two leaves the store
/// exactly as it was.
pub struct RecordUpdater<S: BackingStore> {
    store: S,
    backup_written: bool,
}

impl<S: BackingStore> RecordUpdater<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            backup_written: false,
        }
    }

    /// Back up the pre-run store, once per run
    ///
    /// Must be called before the first record mutation. A failure here is
    /// fatal for the batch: no mutation may proceed without the backup.
    pub fn begin(&mut self) -> ReconcileResult<()> {
        if self.backup_written {
            return Ok(());
        }
        self.store.write_backup()?;
        self.backup_written = true;
        debug!("Pre-run backup written");
        Ok(())
    }

    /// Merge a located movement into the record
    ///
    /// The movement fields are passed through verbatim; the fallback
    /// justification/status pair is never applied to a matched record.
    /// When the source maps a status column, that status becomes the
    /// record's.
    pub fn apply_match(&self, record: &mut DiscrepancyRecord, movement: Movement) -> Resolution {
        record.movement_found = true;
        record.movement_source = Some(movement.source);
        record.movement_value = movement.value.clone();
        record.movement_detail = serde_json::to_value(&movement.row).ok();
        if let Some(status) = movement.status {
            record.status = DispositionStatus::FromSource(status);
        }
        Resolution::Matched {
            source: movement.source,
            value: movement.value,
        }
    }

    /// Apply the resolver's fallback pair to an unmatched record
    pub fn apply_disposition(
        &self,
        record: &mut DiscrepancyRecord,
        disposition: Disposition,
    ) -> Resolution {
        record.justification = Some(disposition.justification.clone());
        record.status = disposition.status.clone();
        Resolution::Defaulted {
            justification: disposition.justification,
            status: disposition.status,
        }
    }

    /// Close a record claimed by the arqueo/diario same-difference rule
    pub fn apply_paired(&self, record: &mut DiscrepancyRecord) -> Resolution {
        let status = DispositionStatus::ContabilizacionSobranteFisico;
        record.justification = Some("Fisico".to_string());
        record.status = status.clone();
        record.observations = Some(status.to_string());
        Resolution::Paired { status }
    }

    /// Commit the full batch in one replace operation
    pub fn flush(&mut self, records: &[DiscrepancyRecord]) -> ReconcileResult<()> {
        self.store.commit(records)?;
        debug!("Batch of {} records flushed", records.len());
        Ok(())
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }
}
