//! Fallback disposition rules for unmatched discrepancies

use bigdecimal::BigDecimal;

use crate::types::*;

/// Justification applied to an unmatched overage
pub const OVERAGE_JUSTIFICATION: &str = "SOBRANTE CONTABLE";
/// Justification applied to an unmatched shortage
pub const SHORTAGE_JUSTIFICATION: &str = "Fisico";

/// Assign the canonical disposition to a record no source could explain
///
/// The tie-break is the discrepancy sign, which the record contract keeps
/// mutually exclusive:
///
/// - overage > 0: justification and status both "SOBRANTE CONTABLE"
/// - shortage > 0: justification "Fisico", status "FALTANTE EN ARQUEO"
///
/// A record violating the contract (both sides zero, or both positive)
/// fails with [`ReconcileError::InvalidRecord`]; the resolver never
/// guesses a disposition.
pub fn resolve_disposition(record: &DiscrepancyRecord) -> ReconcileResult<Disposition> {
    record.validate()?;

    if record.overage > BigDecimal::from(0) {
        Ok(Disposition {
            justification: OVERAGE_JUSTIFICATION.to_string(),
            status: DispositionStatus::SobranteContable,
        })
    } else {
        Ok(Disposition {
            justification: SHORTAGE_JUSTIFICATION.to_string(),
            status: DispositionStatus::FaltanteEnArqueo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 28).unwrap()
    }

    #[test]
    fn unmatched_overage_is_sobrante_contable() {
        let record =
            DiscrepancyRecord::overage("CAJ001".to_string(), date(), BigDecimal::from(50_000));
        let disposition = resolve_disposition(&record).unwrap();
        assert_eq!(disposition.justification, "SOBRANTE CONTABLE");
        assert_eq!(disposition.status, DispositionStatus::SobranteContable);
        assert_eq!(disposition.status.to_string(), "SOBRANTE CONTABLE");
    }

    #[test]
    fn unmatched_shortage_is_fisico_faltante_en_arqueo() {
        let record =
            DiscrepancyRecord::shortage("CAJ002".to_string(), date(), BigDecimal::from(20_000));
        let disposition = resolve_disposition(&record).unwrap();
        assert_eq!(disposition.justification, "Fisico");
        assert_eq!(disposition.status, DispositionStatus::FaltanteEnArqueo);
        assert_eq!(disposition.status.to_string(), "FALTANTE EN ARQUEO");
    }

    #[test]
    fn contract_violations_are_never_defaulted() {
        let both_zero = DiscrepancyRecord::new(
            "CAJ003".to_string(),
            date(),
            BigDecimal::from(0),
            BigDecimal::from(0),
        );
        assert!(matches!(
            resolve_disposition(&both_zero),
            Err(ReconcileError::InvalidRecord(_))
        ));

        let both_positive = DiscrepancyRecord::new(
            "CAJ004".to_string(),
            date(),
            BigDecimal::from(1),
            BigDecimal::from(1),
        );
        assert!(matches!(
            resolve_disposition(&both_positive),
            Err(ReconcileError::InvalidRecord(_))
        ));
    }
}
