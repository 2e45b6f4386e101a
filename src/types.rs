//! Core types and data structures for the reconciliation system

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Whether an arqueo row came from the cash-count sheet or the daily sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Cash-count record for one ATM on one date
    Arqueo,
    /// Daily movement record for the same ATM
    Diario,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Arqueo => write!(f, "ARQUEO"),
            RecordKind::Diario => write!(f, "DIARIO"),
        }
    }
}

/// Canonical disposition assigned to a discrepancy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispositionStatus {
    /// Initial state, nothing assigned yet
    Pending,
    /// Unmatched overage settled against the accounting ledger
    SobranteContable,
    /// Unmatched shortage attributed to the physical count
    FaltanteEnArqueo,
    /// Arqueo and Diario rows carry the same difference for one cashier
    ContabilizacionSobranteFisico,
    /// Status carried over verbatim from the matched source row
    FromSource(String),
}

impl DispositionStatus {
    /// Parse a store cell back into a status; unknown labels are kept as
    /// source-side statuses
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "" | "PENDING" => DispositionStatus::Pending,
            "SOBRANTE CONTABLE" => DispositionStatus::SobranteContable,
            "FALTANTE EN ARQUEO" => DispositionStatus::FaltanteEnArqueo,
            "CONTABILIZACION SOBRANTE FISICO" => DispositionStatus::ContabilizacionSobranteFisico,
            other => DispositionStatus::FromSource(other.to_string()),
        }
    }
}

impl fmt::Display for DispositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispositionStatus::Pending => write!(f, "PENDING"),
            DispositionStatus::SobranteContable => write!(f, "SOBRANTE CONTABLE"),
            DispositionStatus::FaltanteEnArqueo => write!(f, "FALTANTE EN ARQUEO"),
            DispositionStatus::ContabilizacionSobranteFisico => {
                write!(f, "CONTABILIZACION SOBRANTE FISICO")
            }
            DispositionStatus::FromSource(status) => write!(f, "{status}"),
        }
    }
}

/// One daily cash-count row with a non-zero overage or shortage
///
/// Exactly one of `overage` and `shortage` may be positive; a record with
/// both positive (or both zero) violates the contract and is rejected by
/// [`DiscrepancyRecord::validate`]. The outcome fields (`justification`,
/// `status`, `movement_*`) start unset and are mutated exclusively by the
/// record updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscrepancyRecord {
    /// Cashier/ATM code the row belongs to
    pub cashier_code: String,
    /// Branch code, when the sheet carries one
    pub branch_code: Option<String>,
    /// Row kind (ARQUEO or DIARIO)
    pub kind: RecordKind,
    /// Date of the cash count
    pub arqueo_date: NaiveDate,
    /// Counted cash above the expected amount (>= 0)
    pub overage: BigDecimal,
    /// Counted cash below the expected amount (>= 0)
    pub shortage: BigDecimal,
    /// Business justification assigned during resolution
    pub justification: Option<String>,
    /// Disposition status assigned during resolution
    pub status: DispositionStatus,
    /// Free-text observations column
    pub observations: Option<String>,
    /// Whether a movement was located in any source
    pub movement_found: bool,
    /// Source kind the movement came from
    pub movement_source: Option<SourceKind>,
    /// Value of the matched movement
    pub movement_value: Option<BigDecimal>,
    /// Full matched row, kept verbatim for the audit trail
    pub movement_detail: Option<serde_json::Value>,
}

impl DiscrepancyRecord {
    /// Create a record carrying an overage
    pub fn overage(cashier_code: String, arqueo_date: NaiveDate, amount: BigDecimal) -> Self {
        Self::new(cashier_code, arqueo_date, amount, BigDecimal::from(0))
    }

    /// Create a record carrying a shortage
    pub fn shortage(cashier_code: String, arqueo_date: NaiveDate, amount: BigDecimal) -> Self {
        Self::new(cashier_code, arqueo_date, BigDecimal::from(0), amount)
    }

    /// Create a record with explicit overage and shortage amounts
    pub fn new(
        cashier_code: String,
        arqueo_date: NaiveDate,
        overage: BigDecimal,
        shortage: BigDecimal,
    ) -> Self {
        Self {
            cashier_code,
            branch_code: None,
            kind: RecordKind::Arqueo,
            arqueo_date,
            overage,
            shortage,
            justification: None,
            status: DispositionStatus::Pending,
            observations: None,
            movement_found: false,
            movement_source: None,
            movement_value: None,
            movement_detail: None,
        }
    }

    /// Set the row kind
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }

    /// Magnitude of the discrepancy, whichever side carries it
    pub fn magnitude(&self) -> BigDecimal {
        if self.overage > BigDecimal::from(0) {
            self.overage.clone()
        } else {
            self.shortage.clone()
        }
    }

    /// Whether the record carries any discrepancy at all
    pub fn has_discrepancy(&self) -> bool {
        self.overage != BigDecimal::from(0) || self.shortage != BigDecimal::from(0)
    }

    /// Validate the overage/shortage contract
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.cashier_code.trim().is_empty() {
            return Err(ReconcileError::InvalidRecord(
                "Cashier code cannot be empty".to_string(),
            ));
        }

        let zero = BigDecimal::from(0);
        if self.overage < zero || self.shortage < zero {
            return Err(ReconcileError::InvalidRecord(format!(
                "Cashier '{}': overage and shortage must be non-negative",
                self.cashier_code
            )));
        }

        if self.overage > zero && self.shortage > zero {
            return Err(ReconcileError::InvalidRecord(format!(
                "Cashier '{}': overage and shortage are mutually exclusive",
                self.cashier_code
            )));
        }

        if !self.has_discrepancy() {
            return Err(ReconcileError::InvalidRecord(format!(
                "Cashier '{}': record carries no discrepancy",
                self.cashier_code
            )));
        }

        Ok(())
    }
}

/// Lookup key used against every source
///
/// The date travels as a numeric `YYYYMMDD` key so comparisons behave the
/// same regardless of how each source stores its dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementQuery {
    pub cashier_code: String,
    pub date_key: u32,
}

impl MovementQuery {
    /// Build the query for a record's own arqueo date
    pub fn for_record(record: &DiscrepancyRecord) -> Self {
        Self::for_date(record.cashier_code.clone(), record.arqueo_date)
    }

    /// Build the query for an explicit date
    pub fn for_date(cashier_code: String, date: NaiveDate) -> Self {
        Self {
            cashier_code,
            date_key: date_key(date),
        }
    }
}

/// Convert a date to its comparable numeric `YYYYMMDD` key
pub fn date_key(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// The four lookup source variants, in their conventional priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Primary ledger, backed by a live database connection
    LedgerDb,
    /// Secondary ledger exported to a tabular file
    LedgerFile,
    /// First fallback spreadsheet region
    FallbackSheetPrimary,
    /// Historic fallback spreadsheet region
    FallbackSheetHistoric,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::LedgerDb => write!(f, "ledger-db"),
            SourceKind::LedgerFile => write!(f, "ledger-file"),
            SourceKind::FallbackSheetPrimary => write!(f, "fallback-sheet-primary"),
            SourceKind::FallbackSheetHistoric => write!(f, "fallback-sheet-historic"),
        }
    }
}

/// Column names needed to interpret one source's rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Column holding the cashier/ATM code (mandatory)
    pub identifier_column: String,
    /// Column holding the movement date (mandatory)
    pub date_column: String,
    /// Column holding the movement value
    pub value_column: Option<String>,
    /// Column holding a source-side status, passed through on a match
    pub status_column: Option<String>,
}

impl FieldMapping {
    pub fn new(identifier_column: impl Into<String>, date_column: impl Into<String>) -> Self {
        Self {
            identifier_column: identifier_column.into(),
            date_column: date_column.into(),
            value_column: None,
            status_column: None,
        }
    }

    pub fn with_value_column(mut self, column: impl Into<String>) -> Self {
        self.value_column = Some(column.into());
        self
    }

    pub fn with_status_column(mut self, column: impl Into<String>) -> Self {
        self.status_column = Some(column.into());
        self
    }

    /// Check that the mandatory columns are present
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.identifier_column.trim().is_empty() {
            return Err(ReconcileError::Config(
                "Field mapping is missing the identifier column".to_string(),
            ));
        }
        if self.date_column.trim().is_empty() {
            return Err(ReconcileError::Config(
                "Field mapping is missing the date column".to_string(),
            ));
        }
        Ok(())
    }

    /// Cashier code of a row, normalized to a string
    pub fn identifier_of(&self, row: &SourceRow) -> Option<String> {
        row.get(&self.identifier_column).and_then(json_identifier)
    }

    /// Date key of a row, normalized to `YYYYMMDD`
    pub fn date_key_of(&self, row: &SourceRow) -> Option<u32> {
        row.get(&self.date_column).and_then(json_date_key)
    }

    /// Movement value of a row, when a value column is mapped
    pub fn value_of(&self, row: &SourceRow) -> Option<BigDecimal> {
        let column = self.value_column.as_ref()?;
        row.get(column).and_then(json_decimal)
    }

    /// Source-side status of a row, when a status column is mapped
    pub fn status_of(&self, row: &SourceRow) -> Option<String> {
        let column = self.status_column.as_ref()?;
        match row.get(column)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    /// Whether a row matches the lookup key on identifier and date
    pub fn row_matches(&self, row: &SourceRow, query: &MovementQuery) -> bool {
        self.identifier_of(row).as_deref() == Some(query.cashier_code.as_str())
            && self.date_key_of(row) == Some(query.date_key)
    }
}

fn json_identifier(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_date_key(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(key) = trimmed.parse::<u32>() {
                return Some(key);
            }
            // Sources exported with ISO timestamps still compare on the numeric key
            let date_part = trimmed.split_whitespace().next()?;
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .ok()
                .map(date_key)
        }
        _ => None,
    }
}

fn json_decimal(value: &serde_json::Value) -> Option<BigDecimal> {
    match value {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Ordered entry describing one lookup source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Human-readable source name, used in logs and outcomes
    pub name: String,
    pub kind: SourceKind,
    pub mapping: FieldMapping,
    /// How many business days before the arqueo date the source is probed.
    /// Zero means same-day only.
    #[serde(default)]
    pub lookback_days: u32,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, kind: SourceKind, mapping: FieldMapping) -> Self {
        Self {
            name: name.into(),
            kind,
            mapping,
            lookback_days: 0,
        }
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }
}

/// One row as returned by a source accessor, keyed by column name
pub type SourceRow = BTreeMap<String, serde_json::Value>;

/// A movement located in one of the sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Source kind that produced the match
    pub source: SourceKind,
    /// Configured name of that source
    pub source_name: String,
    /// Movement value, when the source maps a value column
    pub value: Option<BigDecimal>,
    /// Source-side status, when the source maps a status column
    pub status: Option<String>,
    /// The matched row, verbatim
    pub row: SourceRow,
}

/// Result of walking the source chain for one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchResult {
    Found(Movement),
    NotFound,
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }
}

/// Fallback justification/status pair computed by the resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    pub justification: String,
    pub status: DispositionStatus,
}

/// How one record ended up after the full pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// A movement was located in a source
    Matched {
        source: SourceKind,
        value: Option<BigDecimal>,
    },
    /// No source matched; the canonical fallback pair was applied
    Defaulted {
        justification: String,
        status: DispositionStatus,
    },
    /// Closed by the arqueo/diario same-difference rule
    Paired { status: DispositionStatus },
    /// The record could not be processed
    Failed { error: String },
}

/// Per-record entry of a batch result, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub cashier_code: String,
    pub kind: RecordKind,
    pub resolution: Resolution,
}

/// Aggregated outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Identifier of this run, for the audit trail
    pub run_id: Uuid,
    /// Per-record outcomes, preserving input order
    pub outcomes: Vec<RecordOutcome>,
    pub total: usize,
    pub matched: usize,
    pub defaulted: usize,
    pub paired: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            outcomes: Vec::new(),
            total: 0,
            matched: 0,
            defaulted: 0,
            paired: 0,
            failed: 0,
        }
    }

    /// Append an outcome, keeping the counters in step
    pub fn push(&mut self, outcome: RecordOutcome) {
        self.total += 1;
        match outcome.resolution {
            Resolution::Matched { .. } => self.matched += 1,
            Resolution::Defaulted { .. } => self.defaulted += 1,
            Resolution::Paired { .. } => self.paired += 1,
            Resolution::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Write failure: {0}")]
    WriteFailure(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_key_is_yyyymmdd() {
        assert_eq!(date_key(date(2025, 11, 28)), 20_251_128);
        assert_eq!(date_key(date(2025, 1, 3)), 20_250_103);
    }

    #[test]
    fn validate_rejects_both_positive() {
        let record = DiscrepancyRecord::new(
            "CAJ001".to_string(),
            date(2025, 11, 28),
            BigDecimal::from(50_000),
            BigDecimal::from(20_000),
        );
        assert!(matches!(
            record.validate(),
            Err(ReconcileError::InvalidRecord(_))
        ));
    }

    #[test]
    fn validate_rejects_both_zero() {
        let record = DiscrepancyRecord::new(
            "CAJ003".to_string(),
            date(2025, 11, 28),
            BigDecimal::from(0),
            BigDecimal::from(0),
        );
        assert!(matches!(
            record.validate(),
            Err(ReconcileError::InvalidRecord(_))
        ));
    }

    #[test]
    fn validate_accepts_single_sided_discrepancy() {
        let record = DiscrepancyRecord::overage(
            "CAJ001".to_string(),
            date(2025, 11, 28),
            BigDecimal::from(50_000),
        );
        assert!(record.validate().is_ok());
        assert_eq!(record.magnitude(), BigDecimal::from(50_000));
    }

    #[test]
    fn mapping_matches_numeric_and_iso_dates() {
        let mapping = FieldMapping::new("NIT", "FECHA");
        let query = MovementQuery::for_date("1448".to_string(), date(2025, 11, 28));

        let mut numeric = SourceRow::new();
        numeric.insert("NIT".to_string(), serde_json::json!(1448));
        numeric.insert("FECHA".to_string(), serde_json::json!(20_251_128));
        assert!(mapping.row_matches(&numeric, &query));

        let mut iso = SourceRow::new();
        iso.insert("NIT".to_string(), serde_json::json!("1448"));
        iso.insert(
            "FECHA".to_string(),
            serde_json::json!("2025-11-28 00:00:00"),
        );
        assert!(mapping.row_matches(&iso, &query));
    }

    #[test]
    fn mapping_reads_values_from_strings_and_numbers() {
        let mapping = FieldMapping::new("NIT", "FECHA").with_value_column("VALOR");
        let mut row = SourceRow::new();
        row.insert("VALOR".to_string(), serde_json::json!("1,250,000.50"));
        assert_eq!(mapping.value_of(&row), Some("1250000.50".parse().unwrap()));

        row.insert("VALOR".to_string(), serde_json::json!(50_000));
        assert_eq!(mapping.value_of(&row), Some(BigDecimal::from(50_000)));
    }

    #[test]
    fn batch_result_counts_follow_outcomes() {
        let mut batch = BatchResult::new(Uuid::new_v4());
        batch.push(RecordOutcome {
            cashier_code: "CAJ001".to_string(),
            kind: RecordKind::Arqueo,
            resolution: Resolution::Matched {
                source: SourceKind::LedgerDb,
                value: Some(BigDecimal::from(50_000)),
            },
        });
        batch.push(RecordOutcome {
            cashier_code: "CAJ002".to_string(),
            kind: RecordKind::Arqueo,
            resolution: Resolution::Failed {
                error: "bad".to_string(),
            },
        });
        assert_eq!(batch.total, 2);
        assert_eq!(batch.matched, 1);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.defaulted, 0);
    }
}
