//! In-memory source and store implementations for testing

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory source accessor for testing and development
///
/// Rows are registered per source name. Individual sources can be made to
/// fail, and every probe is counted, so tests can assert both the
/// fall-through behavior and the short-circuit ("later sources were never
/// queried") guarantee.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Arc<RwLock<HashMap<String, Vec<SourceRow>>>>,
    failing: Arc<RwLock<HashMap<String, String>>>,
    probes: Arc<RwLock<HashMap<String, usize>>>,
}

impl MemorySource {
    /// Create a new memory source instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a row under a source name
    pub fn add_row(&self, source_name: &str, row: SourceRow) {
        self.rows
            .write()
            .unwrap()
            .entry(source_name.to_string())
            .or_default()
            .push(row);
    }

    /// Make every query against a source fail with the given reason
    pub fn fail_source(&self, source_name: &str, reason: &str) {
        self.failing
            .write()
            .unwrap()
            .insert(source_name.to_string(), reason.to_string());
    }

    /// How many times a source has been queried
    pub fn probe_count(&self, source_name: &str) -> usize {
        self.probes
            .read()
            .unwrap()
            .get(source_name)
            .copied()
            .unwrap_or(0)
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.rows.write().unwrap().clear();
        self.failing.write().unwrap().clear();
        self.probes.write().unwrap().clear();
    }
}

impl SourceAccessor for MemorySource {
    fn query(&self, spec: &SourceSpec, query: &MovementQuery) -> ReconcileResult<Vec<SourceRow>> {
        *self
            .probes
            .write()
            .unwrap()
            .entry(spec.name.clone())
            .or_insert(0) += 1;

        if let Some(reason) = self.failing.read().unwrap().get(&spec.name) {
            return Err(ReconcileError::SourceUnavailable(format!(
                "{}: {reason}",
                spec.name
            )));
        }

        let rows = self.rows.read().unwrap();
        Ok(rows
            .get(&spec.name)
            .map(|source_rows| {
                source_rows
                    .iter()
                    .filter(|row| spec.mapping.row_matches(row, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// In-memory backing store for testing
///
/// Mirrors the file-backed store's contract: one backup of the pre-run
/// content, then a single all-or-nothing commit. Both steps can be made
/// to fail to exercise the fatal-error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    content: Arc<RwLock<Vec<DiscrepancyRecord>>>,
    backup: Arc<RwLock<Option<Vec<DiscrepancyRecord>>>>,
    backup_writes: Arc<RwLock<usize>>,
    fail_backup: Arc<RwLock<bool>>,
    fail_commit: Arc<RwLock<bool>>,
}

impl MemoryStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with the given records
    pub fn with_records(records: Vec<DiscrepancyRecord>) -> Self {
        let store = Self::new();
        *store.content.write().unwrap() = records;
        store
    }

    /// Current store content
    pub fn content(&self) -> Vec<DiscrepancyRecord> {
        self.content.read().unwrap().clone()
    }

    /// Backup content, if a backup was written
    pub fn backup(&self) -> Option<Vec<DiscrepancyRecord>> {
        self.backup.read().unwrap().clone()
    }

    /// How many times a backup has been written
    pub fn backup_writes(&self) -> usize {
        *self.backup_writes.read().unwrap()
    }

    /// Make the next backup attempt fail
    pub fn fail_backup(&self) {
        *self.fail_backup.write().unwrap() = true;
    }

    /// Make the next commit attempt fail
    pub fn fail_commit(&self) {
        *self.fail_commit.write().unwrap() = true;
    }
}

impl BackingStore for MemoryStore {
    fn write_backup(&mut self) -> ReconcileResult<()> {
        if *self.fail_backup.read().unwrap() {
            return Err(ReconcileError::WriteFailure(
                "Backup could not be created".to_string(),
            ));
        }
        let snapshot = self.content.read().unwrap().clone();
        *self.backup.write().unwrap() = Some(snapshot);
        *self.backup_writes.write().unwrap() += 1;
        Ok(())
    }

    fn commit(&mut self, records: &[DiscrepancyRecord]) -> ReconcileResult<()> {
        if *self.fail_commit.read().unwrap() {
            // All-or-nothing: the stored content stays untouched
            return Err(ReconcileError::WriteFailure(
                "Commit could not be completed".to_string(),
            ));
        }
        *self.content.write().unwrap() = records.to_vec();
        Ok(())
    }
}
