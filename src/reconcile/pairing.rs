//! Same-difference rule for paired arqueo/diario rows
//!
//! When one cashier contributes both an ARQUEO and a DIARIO row and the
//! two carry the same discrepancy magnitude, the difference is a
//! physical-count artifact already visible on both sheets. Such pairs are
//! closed directly as "CONTABILIZACION SOBRANTE FISICO" and never reach
//! the source lookup.

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use tracing::debug;

use crate::types::*;

fn tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Find (arqueo index, diario index) pairs whose discrepancy magnitudes
/// agree within 0.01
///
/// Only well-formed records participate; invalid ones are left for the
/// driver to itemize. Each cashier contributes at most one pair.
pub fn find_equal_difference_pairs(records: &[DiscrepancyRecord]) -> Vec<(usize, usize)> {
    let mut arqueo_by_cashier: HashMap<&str, usize> = HashMap::new();
    let mut diario_by_cashier: HashMap<&str, usize> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if record.validate().is_err() {
            continue;
        }
        let slot = match record.kind {
            RecordKind::Arqueo => &mut arqueo_by_cashier,
            RecordKind::Diario => &mut diario_by_cashier,
        };
        slot.entry(record.cashier_code.as_str()).or_insert(index);
    }

    let mut pairs = Vec::new();
    for (cashier, &arqueo_index) in &arqueo_by_cashier {
        let Some(&diario_index) = diario_by_cashier.get(cashier) else {
            continue;
        };
        let arqueo_diff = records[arqueo_index].magnitude();
        let diario_diff = records[diario_index].magnitude();
        if (arqueo_diff - diario_diff).abs() < tolerance() {
            debug!("Cashier '{cashier}': ARQUEO and DIARIO carry the same difference");
            pairs.push((arqueo_index, diario_index));
        }
    }

    // Deterministic order regardless of map iteration
    pairs.sort_unstable();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 28).unwrap()
    }

    fn record(code: &str, kind: RecordKind, shortage: i64) -> DiscrepancyRecord {
        DiscrepancyRecord::shortage(code.to_string(), date(), BigDecimal::from(shortage))
            .with_kind(kind)
    }

    #[test]
    fn equal_differences_pair_up() {
        let records = vec![
            record("544", RecordKind::Arqueo, 100_000),
            record("544", RecordKind::Diario, 100_000),
            record("1448", RecordKind::Arqueo, 70_000),
        ];
        assert_eq!(find_equal_difference_pairs(&records), vec![(0, 1)]);
    }

    #[test]
    fn different_magnitudes_do_not_pair() {
        let records = vec![
            record("544", RecordKind::Arqueo, 100_000),
            record("544", RecordKind::Diario, 90_000),
        ];
        assert!(find_equal_difference_pairs(&records).is_empty());
    }

    #[test]
    fn pairing_crosses_overage_and_shortage_sides() {
        // The daily sheet books the same difference on the overage side
        let arqueo = record("544", RecordKind::Arqueo, 100_000);
        let diario = DiscrepancyRecord::overage(
            "544".to_string(),
            date(),
            BigDecimal::from(100_000),
        )
        .with_kind(RecordKind::Diario);
        assert_eq!(
            find_equal_difference_pairs(&[arqueo, diario]),
            vec![(0, 1)]
        );
    }

    #[test]
    fn invalid_records_never_pair() {
        let arqueo = DiscrepancyRecord::new(
            "544".to_string(),
            date(),
            BigDecimal::from(100_000),
            BigDecimal::from(100_000),
        );
        let diario = record("544", RecordKind::Diario, 100_000);
        assert!(find_equal_difference_pairs(&[arqueo, diario]).is_empty());
    }
}
