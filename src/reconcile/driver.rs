//! Batch orchestration: matcher, resolver, and updater per record

use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::reconcile::matcher::MovementMatcher;
use crate::reconcile::pairing::find_equal_difference_pairs;
use crate::reconcile::resolver::resolve_disposition;
use crate::reconcile::updater::RecordUpdater;
use crate::traits::*;
use crate::types::*;
use crate::utils::busdays::BusinessCalendar;
use crate::utils::validation::validate_sources;

/// Drives one reconciliation run over a batch of discrepancy records
///
/// Records are processed strictly in input order and the resulting
/// [`BatchResult`] preserves that order. A failure on one record is
/// itemized and the batch continues; only configuration problems and
/// persistence failures (backup or final flush) abort the run.
pub struct ReconcileDriver<A: SourceAccessor, S: BackingStore> {
    matcher: MovementMatcher<A>,
    updater: RecordUpdater<S>,
    validator: Box<dyn RecordValidator>,
}

impl<A: SourceAccessor, S: BackingStore> ReconcileDriver<A, S> {
    /// Create a driver over the given accessor and backing store
    pub fn new(accessor: A, store: S) -> Self {
        Self {
            matcher: MovementMatcher::new(accessor),
            updater: RecordUpdater::new(store),
            validator: Box::new(DefaultRecordValidator),
        }
    }

    /// Create a driver with a holiday calendar for lookback probes
    pub fn with_calendar(accessor: A, store: S, calendar: BusinessCalendar) -> Self {
        Self {
            matcher: MovementMatcher::with_calendar(accessor, calendar),
            updater: RecordUpdater::new(store),
            validator: Box::new(DefaultRecordValidator),
        }
    }

    /// Replace the record admission rules
    pub fn with_validator(mut self, validator: Box<dyn RecordValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Resolve every record of the batch and commit the outcome
    pub fn run(
        &mut self,
        records: &mut [DiscrepancyRecord],
        sources: &[SourceSpec],
    ) -> ReconcileResult<BatchResult> {
        validate_sources(sources)?;

        let run_id = Uuid::new_v4();
        let mut batch = BatchResult::new(run_id);
        info!(
            "Reconciliation run {run_id} started: {} records, {} sources",
            records.len(),
            sources.len()
        );

        // The backup only makes sense when something will be written
        let will_mutate = records
            .iter()
            .any(|record| self.validator.validate_record(record).is_ok());
        if will_mutate {
            self.updater.begin()?;
        }

        let paired: HashSet<usize> = find_equal_difference_pairs(records)
            .into_iter()
            .flat_map(|(arqueo, diario)| [arqueo, diario])
            .collect();

        for index in 0..records.len() {
            let resolution = if paired.contains(&index) {
                self.updater.apply_paired(&mut records[index])
            } else {
                self.resolve_one(&mut records[index], sources)
            };
            batch.push(RecordOutcome {
                cashier_code: records[index].cashier_code.clone(),
                kind: records[index].kind,
                resolution,
            });
        }

        if will_mutate {
            self.updater.flush(records)?;
        }

        info!(
            "Reconciliation run {run_id} finished: {} matched, {} defaulted, {} paired, {} failed of {}",
            batch.matched, batch.defaulted, batch.paired, batch.failed, batch.total
        );
        Ok(batch)
    }

    /// Access the updater's underlying store
    pub fn store(&self) -> &S {
        self.updater.store()
    }

    fn resolve_one(
        &self,
        record: &mut DiscrepancyRecord,
        sources: &[SourceSpec],
    ) -> Resolution {
        if let Err(err) = self.validator.validate_record(record) {
            warn!("Record rejected: {err}");
            return Resolution::Failed {
                error: err.to_string(),
            };
        }

        match self.matcher.find(record, sources) {
            Ok(MatchResult::Found(movement)) => self.updater.apply_match(record, movement),
            Ok(MatchResult::NotFound) => match resolve_disposition(record) {
                Ok(disposition) => self.updater.apply_disposition(record, disposition),
                Err(err) => Resolution::Failed {
                    error: err.to_string(),
                },
            },
            Err(err) => Resolution::Failed {
                error: err.to_string(),
            },
        }
    }
}
