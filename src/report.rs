//! Validation reports
//!
//! Structured, serializable outcomes for single files and batches, so a
//! calling pipeline can branch on layout status and row counts instead of
//! parsing log output.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::checksum::Checksum;
use crate::error::{Result, ValidatorError};
use crate::registry::SchemaRegistry;
use crate::schema::SchemaSpec;
use crate::splitter::{
    validate_file, write_partitions, FileValidationResult, LayoutMismatch, PartitionPaths,
    SplitOptions,
};

/// Reasons for one rejected row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedSummary {
    pub line: u64,
    pub reasons: Vec<String>,
}

/// Outcome of validating one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub schema: String,
    pub checksum: Option<Checksum>,
    pub layout_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_mismatch: Option<LayoutMismatch>,
    pub total_rows: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejected_rows: Vec<RejectedSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<PartitionPaths>,
}

impl FileReport {
    pub fn new(
        source: impl Into<PathBuf>,
        result: &FileValidationResult,
        outputs: Option<PartitionPaths>,
    ) -> Self {
        Self {
            source: source.into(),
            schema: result.schema.clone(),
            checksum: result.checksum.clone(),
            layout_ok: result.layout_ok(),
            layout_mismatch: result.layout.clone(),
            total_rows: result.total_rows(),
            accepted: result.accepted_count(),
            rejected: result.rejected_count(),
            rejected_rows: result
                .rejected_rows
                .iter()
                .map(|row| RejectedSummary {
                    line: row.line,
                    reasons: row.reasons(),
                })
                .collect(),
            outputs,
        }
    }
}

/// Per-file entry of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Validated(FileReport),
    Failed { source: PathBuf, error: String },
}

impl FileStatus {
    pub fn source(&self) -> &Path {
        match self {
            FileStatus::Validated(report) => &report.source,
            FileStatus::Failed { source, .. } => source,
        }
    }

    /// Failed to process, or processed with a layout mismatch
    pub fn is_failure(&self) -> bool {
        match self {
            FileStatus::Validated(report) => !report.layout_ok,
            FileStatus::Failed { .. } => true,
        }
    }
}

/// Totals across a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchTotals {
    pub files: usize,
    pub validated: usize,
    pub layout_failures: usize,
    pub failed: usize,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
}

/// Outcome of validating several files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub totals: BatchTotals,
    pub files: Vec<FileStatus>,
}

impl BatchReport {
    pub fn new(files: Vec<FileStatus>) -> Self {
        let mut totals = BatchTotals {
            files: files.len(),
            ..BatchTotals::default()
        };
        for file in &files {
            match file {
                FileStatus::Validated(report) => {
                    totals.validated += 1;
                    if !report.layout_ok {
                        totals.layout_failures += 1;
                    }
                    totals.accepted_rows += report.accepted;
                    totals.rejected_rows += report.rejected;
                }
                FileStatus::Failed { .. } => totals.failed += 1,
            }
        }

        Self {
            generated_at: Utc::now(),
            totals,
            files,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(FileStatus::is_failure)
    }

    pub fn has_rejects(&self) -> bool {
        self.totals.rejected_rows > 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Validate one file and write its partitions
pub fn process_file(
    path: &Path,
    schema: &SchemaSpec,
    options: &SplitOptions,
) -> Result<FileReport> {
    let result = validate_file(path, schema, options)?;
    let outputs = write_partitions(&result, path, options)?;
    Ok(FileReport::new(path, &result, outputs))
}

/// Validate files one after another, isolating per-file failures
///
/// With `schema` set every file is checked against that schema; otherwise
/// each file is routed through the registry's masks.
pub fn validate_batch(
    paths: &[PathBuf],
    registry: &SchemaRegistry,
    options: &SplitOptions,
    schema: Option<&str>,
) -> Result<BatchReport> {
    options.validate()?;
    let fixed = schema.map(|name| registry.require(name)).transpose()?;

    let files = paths
        .iter()
        .map(|path| {
            let outcome = fixed
                .or_else(|| registry.resolve(path))
                .ok_or_else(|| ValidatorError::NoMatchingSchema(path.display().to_string()))
                .and_then(|spec| process_file(path, spec, options));

            match outcome {
                Ok(report) => FileStatus::Validated(report),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "file not validated");
                    FileStatus::Failed {
                        source: path.clone(),
                        error: e.to_string(),
                    }
                }
            }
        })
        .collect();

    Ok(BatchReport::new(files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        let schema = SchemaSpec::builder("members")
            .integer("id", false)
            .integer("age", true)
            .build()
            .unwrap();
        registry.register(schema, ["members_*.csv"]).unwrap();
        registry
    }

    #[test]
    fn test_batch_isolates_failures() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("members_1.csv");
        let bad_layout = dir.path().join("members_2.csv");
        let unrouted = dir.path().join("sales_1.csv");
        let missing = dir.path().join("members_3.csv");
        fs::write(&good, "id|age\n1|30\nx|1\n").unwrap();
        fs::write(&bad_layout, "id\n1\n").unwrap();
        fs::write(&unrouted, "id|age\n1|2\n").unwrap();

        let paths = vec![good, bad_layout, unrouted, missing];
        let report = validate_batch(&paths, &registry(), &SplitOptions::default(), None).unwrap();

        assert_eq!(report.totals.files, 4);
        assert_eq!(report.totals.validated, 2);
        assert_eq!(report.totals.layout_failures, 1);
        assert_eq!(report.totals.failed, 2);
        assert_eq!(report.totals.accepted_rows, 1);
        assert_eq!(report.totals.rejected_rows, 1);
        assert!(report.has_failures());

        match &report.files[0] {
            FileStatus::Validated(file) => {
                assert!(file.outputs.is_some());
                assert_eq!(file.rejected_rows[0].line, 3);
            }
            other => panic!("Expected Validated, got {:?}", other),
        }
        match &report.files[2] {
            FileStatus::Failed { error, .. } => assert!(error.contains("sales_1.csv")),
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_schema_override_is_config_error() {
        let err = validate_batch(&[], &registry(), &SplitOptions::default(), Some("nope"))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_report_json_shape() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("members_1.csv");
        fs::write(&path, "id|age\n|30\n").unwrap();

        let report =
            validate_batch(&[path], &registry(), &SplitOptions::default(), Some("members")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        let file = &json["files"][0];
        assert_eq!(file["status"], "validated");
        assert_eq!(file["layout_ok"], true);
        assert_eq!(
            file["rejected_rows"][0]["reasons"][0],
            "non-nullable column `id` is empty"
        );
        assert!(file.get("layout_mismatch").is_none());
    }
}
