//! CSV-backed source accessor and arqueo backing store

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::traits::*;
use crate::types::*;

/// Source accessor over a delimited export file
///
/// The file is re-read on every probe so a run always sees the export as
/// it currently is on disk. Read or parse problems surface as
/// [`ReconcileError::SourceUnavailable`], which the matcher downgrades to
/// a soft per-source failure.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_rows(&self) -> ReconcileResult<Vec<SourceRow>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|err| {
            ReconcileError::SourceUnavailable(format!(
                "Cannot open '{}': {err}",
                self.path.display()
            ))
        })?;

        let headers = reader
            .headers()
            .map_err(|err| {
                ReconcileError::SourceUnavailable(format!(
                    "Cannot read headers of '{}': {err}",
                    self.path.display()
                ))
            })?
            .clone();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|err| {
                ReconcileError::SourceUnavailable(format!(
                    "Malformed row in '{}': {err}",
                    self.path.display()
                ))
            })?;
            let mut row = SourceRow::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                row.insert(
                    header.to_string(),
                    serde_json::Value::String(cell.to_string()),
                );
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

impl SourceAccessor for CsvSource {
    fn query(&self, spec: &SourceSpec, query: &MovementQuery) -> ReconcileResult<Vec<SourceRow>> {
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(|row| spec.mapping.row_matches(row, query))
            .collect())
    }
}

const STORE_HEADERS: [&str; 13] = [
    "codigo_cajero",
    "codigo_suc",
    "tipo_registro",
    "fecha_arqueo",
    "sobrantes",
    "faltantes",
    "justificacion",
    "nuevo_estado",
    "observaciones",
    "movimiento_encontrado",
    "movimiento_fuente",
    "movimiento_valor",
    "movimiento_detalle",
];

/// File-backed arqueo store with backup-then-atomic-replace persistence
///
/// `write_backup` copies the pre-run file aside as `<name>.backup`, at
/// most once per run. `commit` writes the full record set to `<name>.tmp`
/// and renames it over the original, so an interrupted flush leaves the
/// real store untouched.
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    backup_written: bool,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_written: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the backup copy (`<name>.backup`)
    pub fn backup_path(&self) -> PathBuf {
        suffixed(&self.path, ".backup")
    }

    /// Read the store into discrepancy records
    pub fn load(&self) -> ReconcileResult<Vec<DiscrepancyRecord>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|err| {
            ReconcileError::Storage(format!("Cannot open '{}': {err}", self.path.display()))
        })?;

        let headers = reader
            .headers()
            .map_err(|err| {
                ReconcileError::Storage(format!(
                    "Cannot read headers of '{}': {err}",
                    self.path.display()
                ))
            })?
            .clone();
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();

        for required in ["codigo_cajero", "fecha_arqueo", "sobrantes", "faltantes"] {
            if !index.contains_key(required) {
                return Err(ReconcileError::Storage(format!(
                    "Store '{}' is missing column '{required}'",
                    self.path.display()
                )));
            }
        }

        let mut records = Vec::new();
        for (row_number, result) in reader.records().enumerate() {
            let row = result.map_err(|err| {
                ReconcileError::Storage(format!(
                    "Malformed row {} in '{}': {err}",
                    row_number + 2,
                    self.path.display()
                ))
            })?;
            records.push(parse_store_row(&row, &index, row_number + 2)?);
        }
        Ok(records)
    }
}

impl BackingStore for CsvStore {
    fn write_backup(&mut self) -> ReconcileResult<()> {
        if self.backup_written {
            return Ok(());
        }
        std::fs::copy(&self.path, self.backup_path()).map_err(|err| {
            ReconcileError::WriteFailure(format!(
                "Backup of '{}' could not be created: {err}",
                self.path.display()
            ))
        })?;
        self.backup_written = true;
        Ok(())
    }

    fn commit(&mut self, records: &[DiscrepancyRecord]) -> ReconcileResult<()> {
        let tmp_path = suffixed(&self.path, ".tmp");

        let mut writer = csv::Writer::from_path(&tmp_path).map_err(|err| {
            ReconcileError::WriteFailure(format!(
                "Cannot write '{}': {err}",
                tmp_path.display()
            ))
        })?;

        let write_err = |err: csv::Error| {
            ReconcileError::WriteFailure(format!("Cannot write '{}': {err}", tmp_path.display()))
        };

        writer.write_record(STORE_HEADERS).map_err(write_err)?;
        for record in records {
            writer
                .write_record(store_row_cells(record))
                .map_err(write_err)?;
        }
        writer.flush().map_err(|err| {
            ReconcileError::WriteFailure(format!("Cannot flush '{}': {err}", tmp_path.display()))
        })?;
        drop(writer);

        std::fs::rename(&tmp_path, &self.path).map_err(|err| {
            ReconcileError::WriteFailure(format!(
                "Cannot replace '{}': {err}",
                self.path.display()
            ))
        })
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn cell<'a>(row: &'a csv::StringRecord, index: &HashMap<&str, usize>, name: &str) -> &'a str {
    index
        .get(name)
        .and_then(|&idx| row.get(idx))
        .unwrap_or("")
        .trim()
}

fn parse_store_row(
    row: &csv::StringRecord,
    index: &HashMap<&str, usize>,
    row_number: usize,
) -> ReconcileResult<DiscrepancyRecord> {
    let bad_cell = |name: &str, value: &str| {
        ReconcileError::Storage(format!(
            "Row {row_number}: cannot parse {name} value '{value}'"
        ))
    };

    let cashier_code = cell(row, index, "codigo_cajero").to_string();
    let date_cell = cell(row, index, "fecha_arqueo");
    let arqueo_date = NaiveDate::parse_from_str(date_cell, "%Y-%m-%d")
        .map_err(|_| bad_cell("fecha_arqueo", date_cell))?;
    let overage_cell = cell(row, index, "sobrantes");
    let overage = parse_amount(overage_cell).ok_or_else(|| bad_cell("sobrantes", overage_cell))?;
    let shortage_cell = cell(row, index, "faltantes");
    let shortage =
        parse_amount(shortage_cell).ok_or_else(|| bad_cell("faltantes", shortage_cell))?;

    let mut record = DiscrepancyRecord::new(cashier_code, arqueo_date, overage, shortage);

    record.kind = match cell(row, index, "tipo_registro") {
        "DIARIO" => RecordKind::Diario,
        _ => RecordKind::Arqueo,
    };
    record.branch_code = non_empty(cell(row, index, "codigo_suc"));
    record.justification = non_empty(cell(row, index, "justificacion"));
    record.status = DispositionStatus::from_label(cell(row, index, "nuevo_estado"));
    record.observations = non_empty(cell(row, index, "observaciones"));
    record.movement_found = cell(row, index, "movimiento_encontrado").eq_ignore_ascii_case("true");
    record.movement_source = source_kind_from_label(cell(row, index, "movimiento_fuente"));
    record.movement_value = parse_amount_opt(cell(row, index, "movimiento_valor"));
    record.movement_detail = non_empty(cell(row, index, "movimiento_detalle"))
        .and_then(|detail| serde_json::from_str(&detail).ok());

    Ok(record)
}

fn store_row_cells(record: &DiscrepancyRecord) -> Vec<String> {
    vec![
        record.cashier_code.clone(),
        record.branch_code.clone().unwrap_or_default(),
        record.kind.to_string(),
        record.arqueo_date.to_string(),
        record.overage.to_string(),
        record.shortage.to_string(),
        record.justification.clone().unwrap_or_default(),
        match record.status {
            DispositionStatus::Pending => String::new(),
            ref status => status.to_string(),
        },
        record.observations.clone().unwrap_or_default(),
        record.movement_found.to_string(),
        record
            .movement_source
            .map(|kind| kind.to_string())
            .unwrap_or_default(),
        record
            .movement_value
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_default(),
        record
            .movement_detail
            .as_ref()
            .map(|detail| detail.to_string())
            .unwrap_or_default(),
    ]
}

fn parse_amount(cell: &str) -> Option<BigDecimal> {
    if cell.is_empty() {
        return Some(BigDecimal::from(0));
    }
    cell.replace(',', "").parse().ok()
}

fn parse_amount_opt(cell: &str) -> Option<BigDecimal> {
    if cell.is_empty() {
        return None;
    }
    cell.replace(',', "").parse().ok()
}

fn non_empty(cell: &str) -> Option<String> {
    (!cell.is_empty()).then(|| cell.to_string())
}

fn source_kind_from_label(cell: &str) -> Option<SourceKind> {
    match cell {
        "ledger-db" => Some(SourceKind::LedgerDb),
        "ledger-file" => Some(SourceKind::LedgerFile),
        "fallback-sheet-primary" => Some(SourceKind::FallbackSheetPrimary),
        "fallback-sheet-historic" => Some(SourceKind::FallbackSheetHistoric),
        _ => None,
    }
}
