//! Validation utilities

use crate::traits::RecordValidator;
use crate::types::*;

/// Validate the configured source list before a run
///
/// The list must be non-empty and every entry needs a name plus the
/// mandatory identifier/date columns in its mapping. Runs fail fast on
/// the first problem, before any record is touched.
pub fn validate_sources(sources: &[SourceSpec]) -> ReconcileResult<()> {
    if sources.is_empty() {
        return Err(ReconcileError::Config(
            "At least one lookup source must be configured".to_string(),
        ));
    }

    for spec in sources {
        if spec.name.trim().is_empty() {
            return Err(ReconcileError::Config(format!(
                "Source of kind '{}' has an empty name",
                spec.kind
            )));
        }
        spec.mapping.validate().map_err(|err| {
            ReconcileError::Config(format!("Source '{}': {err}", spec.name))
        })?;
    }

    Ok(())
}

/// Validate that a cashier code looks like an ATM identifier
pub fn validate_cashier_code(code: &str) -> ReconcileResult<()> {
    if code.trim().is_empty() {
        return Err(ReconcileError::InvalidRecord(
            "Cashier code cannot be empty".to_string(),
        ));
    }

    if code.len() > 20 {
        return Err(ReconcileError::InvalidRecord(
            "Cashier code cannot exceed 20 characters".to_string(),
        ));
    }

    if !code.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ReconcileError::InvalidRecord(
            "Cashier code can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Record validator with stricter identifier checks
pub struct StrictRecordValidator;

impl RecordValidator for StrictRecordValidator {
    fn validate_record(&self, record: &DiscrepancyRecord) -> ReconcileResult<()> {
        validate_cashier_code(&record.cashier_code)?;
        record.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> FieldMapping {
        FieldMapping::new("NIT", "FECHA").with_value_column("VALOR")
    }

    #[test]
    fn empty_source_list_is_a_config_error() {
        assert!(matches!(
            validate_sources(&[]),
            Err(ReconcileError::Config(_))
        ));
    }

    #[test]
    fn missing_mandatory_column_is_a_config_error() {
        let broken = SourceSpec::new(
            "nacional",
            SourceKind::LedgerDb,
            FieldMapping::new("", "FECHA"),
        );
        let err = validate_sources(&[broken]).unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
        assert!(err.to_string().contains("nacional"));
    }

    #[test]
    fn well_formed_sources_pass() {
        let sources = vec![
            SourceSpec::new("nacional", SourceKind::LedgerDb, mapping()),
            SourceSpec::new("sobrantes", SourceKind::FallbackSheetPrimary, mapping()),
        ];
        assert!(validate_sources(&sources).is_ok());
    }

    #[test]
    fn cashier_codes_reject_odd_characters() {
        assert!(validate_cashier_code("CAJ001").is_ok());
        assert!(validate_cashier_code("CAJ 001").is_err());
        assert!(validate_cashier_code("").is_err());
    }
}
