//! # Arqueo Core
//!
//! A reconciliation library for daily ATM cash-count ("arqueo") records,
//! resolving overage/shortage discrepancies against a prioritized chain
//! of bank transaction sources and applying deterministic fallback
//! business rules when no source explains the difference.
//!
//! ## Features
//!
//! - **Prioritized source lookup**: primary ledger, secondary ledger
//!   file, and two fallback sheet regions behind one query trait
//! - **Soft per-source failures**: an unreachable source is logged and
//!   skipped, never aborting the walk
//! - **Deterministic dispositions**: unmatched discrepancies get the
//!   canonical justification/status pair for their sign
//! - **Auditable persistence**: one pre-run `.backup` copy, then a single
//!   temp-file-and-rename commit of the whole batch
//! - **Batch isolation**: a bad record is itemized in the result while
//!   the rest of the batch completes
//! - **Source abstraction**: database-agnostic design with trait-based
//!   accessors; CSV and in-memory implementations included
//!
//! ## Quick Start
//!
//! ```rust
//! use arqueo_core::utils::{MemorySource, MemoryStore};
//! use arqueo_core::{DiscrepancyRecord, FieldMapping, ReconcileDriver, SourceKind, SourceSpec};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! let sources = vec![SourceSpec::new(
//!     "nacional",
//!     SourceKind::LedgerDb,
//!     FieldMapping::new("NIT", "FECHA").with_value_column("VALOR"),
//! )];
//!
//! let mut records = vec![DiscrepancyRecord::shortage(
//!     "CAJ002".to_string(),
//!     NaiveDate::from_ymd_opt(2025, 11, 28).unwrap(),
//!     BigDecimal::from(20_000),
//! )];
//!
//! let mut driver = ReconcileDriver::new(MemorySource::new(), MemoryStore::new());
//! let batch = driver.run(&mut records, &sources).unwrap();
//! assert_eq!(batch.defaulted, 1);
//! ```

pub mod reconcile;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconcile::*;
pub use traits::*;
pub use types::*;
