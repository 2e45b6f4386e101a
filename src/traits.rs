//! Traits for source access, persistence, and extensibility

use crate::types::*;

/// Uniform query capability over one lookup source
///
/// Each of the four source kinds (primary ledger database, secondary
/// ledger file, the two fallback sheet regions) answers the same
/// question: which rows match this (identifier, date) key? The matcher is
/// written once against this trait and never learns which variant backs a
/// given [`SourceSpec`].
///
/// The crate ships a tabular-file implementation ([`crate::utils::CsvSource`])
/// and an in-memory one ([`crate::utils::MemorySource`]); a live database
/// accessor is left to the consumer, with its own connection and timeout
/// handling.
pub trait SourceAccessor: Send + Sync {
    /// Return every row of the source matching the lookup key
    ///
    /// Implementations fail with [`ReconcileError::SourceUnavailable`] on
    /// connectivity or read problems; the matcher treats that as "no match
    /// from this source" and moves on.
    fn query(&self, spec: &SourceSpec, query: &MovementQuery) -> ReconcileResult<Vec<SourceRow>>;
}

/// Persistence seam for the arqueo backing store
///
/// The updater is the only caller. `write_backup` runs at most once per
/// run, before any mutation; `commit` replaces the full store content in
/// one operation so a failure can never leave a half-written store.
pub trait BackingStore: Send + Sync {
    /// Copy the pre-run store aside under the `.backup` suffix
    fn write_backup(&mut self) -> ReconcileResult<()>;

    /// Replace the store content with the given records, all or nothing
    fn commit(&mut self, records: &[DiscrepancyRecord]) -> ReconcileResult<()>;
}

/// Trait for implementing custom record admission rules
pub trait RecordValidator: Send + Sync {
    /// Validate a record before it enters the resolution pipeline
    fn validate_record(&self, record: &DiscrepancyRecord) -> ReconcileResult<()>;
}

/// Default record validator enforcing the overage/shortage contract
pub struct DefaultRecordValidator;

impl RecordValidator for DefaultRecordValidator {
    fn validate_record(&self, record: &DiscrepancyRecord) -> ReconcileResult<()> {
        record.validate()
    }
}
