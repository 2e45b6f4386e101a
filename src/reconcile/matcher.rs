//! Ordered walk over the configured sources for one discrepancy record

use bigdecimal::BigDecimal;
use tracing::{debug, warn};

use crate::traits::SourceAccessor;
use crate::types::*;
use crate::utils::busdays::BusinessCalendar;

/// Locates the movement behind a discrepancy by probing sources in
/// priority order
///
/// The source list order is the priority: the walk stops at the first
/// source that yields a row, and later sources are never queried. A
/// failing source (connection refused, malformed sheet) is logged and
/// skipped; only when every source has been tried without a hit does the
/// matcher report [`MatchResult::NotFound`].
pub struct MovementMatcher<A: SourceAccessor> {
    accessor: A,
    calendar: BusinessCalendar,
}

impl<A: SourceAccessor> MovementMatcher<A> {
    /// Create a matcher over the given accessor, with a weekends-only
    /// business calendar
    pub fn new(accessor: A) -> Self {
        Self {
            accessor,
            calendar: BusinessCalendar::new(),
        }
    }

    /// Create a matcher with an explicit holiday calendar for lookback
    /// probes
    pub fn with_calendar(accessor: A, calendar: BusinessCalendar) -> Self {
        Self { accessor, calendar }
    }

    /// Walk the sources in order and return the first match
    pub fn find(
        &self,
        record: &DiscrepancyRecord,
        sources: &[SourceSpec],
    ) -> ReconcileResult<MatchResult> {
        if sources.is_empty() {
            return Err(ReconcileError::Config(
                "At least one lookup source must be configured".to_string(),
            ));
        }

        for spec in sources {
            match self.probe_source(record, spec) {
                Ok(Some(movement)) => {
                    debug!(
                        "Cashier '{}': movement found in source '{}'",
                        record.cashier_code, spec.name
                    );
                    return Ok(MatchResult::Found(movement));
                }
                Ok(None) => {}
                Err(err) => {
                    // Soft failure: this source is skipped, the walk goes on
                    warn!(
                        "Cashier '{}': source '{}' failed ({err}), continuing with next source",
                        record.cashier_code, spec.name
                    );
                }
            }
        }

        debug!(
            "Cashier '{}': no movement found in any source",
            record.cashier_code
        );
        Ok(MatchResult::NotFound)
    }

    /// Probe one source on the arqueo date and, when the spec allows it,
    /// on earlier business days within the lookback window
    fn probe_source(
        &self,
        record: &DiscrepancyRecord,
        spec: &SourceSpec,
    ) -> ReconcileResult<Option<Movement>> {
        let mut probe_dates = vec![record.arqueo_date];
        if spec.lookback_days > 0 {
            probe_dates.extend(
                self.calendar
                    .business_days_before(record.arqueo_date, spec.lookback_days),
            );
        }

        let magnitude = record.magnitude();
        for date in probe_dates {
            let query = MovementQuery::for_date(record.cashier_code.clone(), date);
            let rows = self.accessor.query(spec, &query)?;
            if let Some(row) = pick_row(&spec.mapping, rows, &magnitude) {
                return Ok(Some(Movement {
                    source: spec.kind,
                    source_name: spec.name.clone(),
                    value: spec.mapping.value_of(&row),
                    status: spec.mapping.status_of(&row),
                    row,
                }));
            }
        }
        Ok(None)
    }
}

/// Choose among rows sharing the lookup key: prefer the one whose value
/// matches the discrepancy magnitude, otherwise take the first
fn pick_row(
    mapping: &FieldMapping,
    mut rows: Vec<SourceRow>,
    magnitude: &BigDecimal,
) -> Option<SourceRow> {
    if rows.is_empty() {
        return None;
    }
    if rows.len() > 1 {
        if let Some(position) = rows.iter().position(|row| {
            mapping
                .value_of(row)
                .is_some_and(|value| value.abs() == magnitude.abs())
        }) {
            return Some(rows.swap_remove(position));
        }
    }
    Some(rows.swap_remove(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory::MemorySource;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mapping() -> FieldMapping {
        FieldMapping::new("NIT", "FECHA").with_value_column("VALOR")
    }

    fn sources() -> Vec<SourceSpec> {
        vec![
            SourceSpec::new("nacional", SourceKind::LedgerDb, mapping()),
            SourceSpec::new("nacional-archivo", SourceKind::LedgerFile, mapping()),
            SourceSpec::new("sobrantes", SourceKind::FallbackSheetPrimary, mapping()),
            SourceSpec::new("historico", SourceKind::FallbackSheetHistoric, mapping()),
        ]
    }

    fn row(nit: &str, fecha: u32, valor: i64) -> SourceRow {
        let mut row = SourceRow::new();
        row.insert("NIT".to_string(), serde_json::json!(nit));
        row.insert("FECHA".to_string(), serde_json::json!(fecha));
        row.insert("VALOR".to_string(), serde_json::json!(valor));
        row
    }

    fn overage_record(code: &str, amount: i64) -> DiscrepancyRecord {
        DiscrepancyRecord::overage(
            code.to_string(),
            date(2025, 11, 28),
            BigDecimal::from(amount),
        )
    }

    #[test]
    fn first_matching_source_wins_and_later_sources_are_not_queried() {
        let accessor = MemorySource::new();
        accessor.add_row("nacional", row("CAJ001", 20_251_128, 50_000));
        accessor.add_row("sobrantes", row("CAJ001", 20_251_128, 50_000));

        let matcher = MovementMatcher::new(accessor.clone());
        let result = matcher
            .find(&overage_record("CAJ001", 50_000), &sources())
            .unwrap();

        match result {
            MatchResult::Found(movement) => {
                assert_eq!(movement.source, SourceKind::LedgerDb);
                assert_eq!(movement.source_name, "nacional");
                assert_eq!(movement.value, Some(BigDecimal::from(50_000)));
            }
            MatchResult::NotFound => panic!("expected a match in the primary ledger"),
        }

        assert_eq!(accessor.probe_count("nacional"), 1);
        assert_eq!(accessor.probe_count("nacional-archivo"), 0);
        assert_eq!(accessor.probe_count("sobrantes"), 0);
        assert_eq!(accessor.probe_count("historico"), 0);
    }

    #[test]
    fn failing_source_falls_through_to_the_next() {
        let accessor = MemorySource::new();
        accessor.fail_source("nacional", "connection refused");
        accessor.add_row("nacional-archivo", row("CAJ001", 20_251_128, 50_000));

        let matcher = MovementMatcher::new(accessor.clone());
        let result = matcher
            .find(&overage_record("CAJ001", 50_000), &sources())
            .unwrap();

        match result {
            MatchResult::Found(movement) => assert_eq!(movement.source, SourceKind::LedgerFile),
            MatchResult::NotFound => panic!("expected a match in the secondary ledger"),
        }
        assert_eq!(accessor.probe_count("nacional"), 1);
    }

    #[test]
    fn exhausting_every_source_reports_not_found() {
        let accessor = MemorySource::new();
        let matcher = MovementMatcher::new(accessor.clone());
        let result = matcher
            .find(&overage_record("CAJ002", 20_000), &sources())
            .unwrap();
        assert_eq!(result, MatchResult::NotFound);
        assert_eq!(accessor.probe_count("historico"), 1);
    }

    #[test]
    fn empty_source_list_is_a_config_error() {
        let matcher = MovementMatcher::new(MemorySource::new());
        assert!(matches!(
            matcher.find(&overage_record("CAJ001", 1), &[]),
            Err(ReconcileError::Config(_))
        ));
    }

    #[test]
    fn value_match_is_preferred_when_several_rows_share_the_key() {
        let accessor = MemorySource::new();
        accessor.add_row("nacional", row("CAJ001", 20_251_128, 99_000));
        accessor.add_row("nacional", row("CAJ001", 20_251_128, 50_000));

        let matcher = MovementMatcher::new(accessor);
        let result = matcher
            .find(&overage_record("CAJ001", 50_000), &sources())
            .unwrap();

        match result {
            MatchResult::Found(movement) => {
                assert_eq!(movement.value, Some(BigDecimal::from(50_000)))
            }
            MatchResult::NotFound => panic!("expected a match"),
        }
    }

    #[test]
    fn lookback_reaches_previous_business_day_only_when_configured() {
        let accessor = MemorySource::new();
        // Movement dated Friday the 28th; arqueo record dated Monday Dec 1st
        accessor.add_row("historico", row("CAJ001", 20_251_128, 50_000));

        let record = DiscrepancyRecord::overage(
            "CAJ001".to_string(),
            date(2025, 12, 1),
            BigDecimal::from(50_000),
        );

        let same_day_only = vec![SourceSpec::new(
            "historico",
            SourceKind::FallbackSheetHistoric,
            mapping(),
        )];
        let matcher = MovementMatcher::new(accessor.clone());
        assert_eq!(
            matcher.find(&record, &same_day_only).unwrap(),
            MatchResult::NotFound
        );

        // A 4-day window spans the weekend back to Friday
        let with_lookback = vec![SourceSpec::new(
            "historico",
            SourceKind::FallbackSheetHistoric,
            mapping(),
        )
        .with_lookback_days(4)];
        assert!(matcher.find(&record, &with_lookback).unwrap().is_found());
    }

    #[test]
    fn status_column_is_passed_through_when_mapped() {
        let accessor = MemorySource::new();
        let mut matched = row("CAJ001", 20_251_128, 50_000);
        matched.insert(
            "ESTADO".to_string(),
            serde_json::json!("APLICADO EN LIBROS"),
        );
        accessor.add_row("nacional", matched);

        let with_status = vec![SourceSpec::new(
            "nacional",
            SourceKind::LedgerDb,
            mapping().with_status_column("ESTADO"),
        )];
        let matcher = MovementMatcher::new(accessor);
        match matcher
            .find(&overage_record("CAJ001", 50_000), &with_status)
            .unwrap()
        {
            MatchResult::Found(movement) => {
                assert_eq!(movement.status.as_deref(), Some("APLICADO EN LIBROS"))
            }
            MatchResult::NotFound => panic!("expected a match"),
        }
    }
}
