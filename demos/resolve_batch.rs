//! Basic reconciliation run example

use arqueo_core::utils::{MemorySource, MemoryStore};
use arqueo_core::{
    DiscrepancyRecord, FieldMapping, ReconcileDriver, SourceKind, SourceRow, SourceSpec,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏧 Arqueo Core - Batch Resolution Example\n");

    // 1. Configure the source chain in priority order
    println!("🔗 Configuring lookup sources...");
    let mapping = FieldMapping::new("NIT", "FECHA").with_value_column("VALOR");
    let sources = vec![
        SourceSpec::new("nacional", SourceKind::LedgerDb, mapping.clone()),
        SourceSpec::new("nacional-archivo", SourceKind::LedgerFile, mapping.clone()),
        SourceSpec::new("sobrantes", SourceKind::FallbackSheetPrimary, mapping.clone()),
        SourceSpec::new("historico", SourceKind::FallbackSheetHistoric, mapping)
            .with_lookback_days(30),
    ];
    for spec in &sources {
        println!("  ✓ {} ({})", spec.name, spec.kind);
    }
    println!();

    // 2. Seed the primary ledger with one booked movement
    let accessor = MemorySource::new();
    let mut row = SourceRow::new();
    row.insert("NIT".to_string(), serde_json::json!("CAJ001"));
    row.insert("FECHA".to_string(), serde_json::json!(20_251_128));
    row.insert("VALOR".to_string(), serde_json::json!(50_000));
    accessor.add_row("nacional", row);
    println!("💾 Primary ledger holds one movement: CAJ001 / 50,000\n");

    // 3. The day's discrepancy records
    let arqueo_date = NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
    let mut records = vec![
        DiscrepancyRecord::overage("CAJ001".to_string(), arqueo_date, BigDecimal::from(50_000)),
        DiscrepancyRecord::shortage("CAJ002".to_string(), arqueo_date, BigDecimal::from(20_000)),
    ];

    // 4. Run the batch
    println!("⚙️  Resolving {} discrepancy records...\n", records.len());
    let mut driver = ReconcileDriver::new(accessor, MemoryStore::new());
    let batch = driver.run(&mut records, &sources)?;

    for (record, outcome) in records.iter().zip(&batch.outcomes) {
        println!(
            "  {} [{}] -> {:?}",
            outcome.cashier_code, record.status, outcome.resolution
        );
    }

    println!(
        "\n📊 Run {}: {} matched, {} defaulted, {} failed of {}",
        batch.run_id, batch.matched, batch.defaulted, batch.failed, batch.total
    );

    println!("\n📄 Reporting payload:");
    println!("{}", serde_json::to_string_pretty(&batch)?);

    Ok(())
}
