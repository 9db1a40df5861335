//! Staging Validator
//!
//! Checks delimited staging files against a fixed destination schema before
//! they are loaded into a strongly-typed store, and splits their rows into
//! accepted and rejected outputs.
//!
//! ## Features
//!
//! - **Layout Check**: The header must match the schema's columns exactly (names, order, count)
//! - **Type Checks**: Integer, Decimal, Date, Timestamp and Text checkers, one per logical type
//! - **Nullability**: Empty cells are accepted only in nullable columns
//! - **Full Reasons**: Every violation in a row is reported, not just the first
//! - **Stable Split**: Accepted and rejected rows keep their original file order
//!
//! ## Flow
//!
//! ```text
//! staged_file.csv
//!   │
//!   ├─ layout check ──✗──► FileValidationResult { layout: Some(mismatch) }
//!   │
//!   ✓
//!   │
//!   └─ classify every row
//!        ├─► accepted-staged_file.csv
//!        └─► rejected-staged_file.csv   (+ rejection_reasons column)
//! ```

pub mod checks;
pub mod checksum;
pub mod classify;
pub mod config;
pub mod error;
pub mod processed;
pub mod registry;
pub mod report;
pub mod schema;
pub mod splitter;

pub use checksum::Checksum;
pub use classify::{classify, RawRow, ValidationOutcome, Violation};
pub use config::ValidatorConfig;
pub use error::{ErrorCategory, Result, ValidatorError};
pub use processed::{filter_unprocessed, FileLedger, InMemoryLedger, ProcessedLedger};
pub use registry::{mask_matches, SchemaRegistry};
pub use report::{validate_batch, BatchReport, FileReport, FileStatus};
pub use schema::{ColumnDefinition, ColumnSpec, LogicalType, SchemaDefinition, SchemaSpec, TypeKind};
pub use splitter::{
    validate_file, validate_reader, write_partitions, FileValidationResult, LayoutMismatch,
    SplitOptions,
};
