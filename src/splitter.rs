//! File splitter
//!
//! Reads a delimited file, checks its header against the schema and
//! partitions the data rows into accepted and rejected sets. The header
//! check is all-or-nothing: on a layout mismatch no row is classified and
//! no output is written.
//!
//! Blank lines are skipped by the reader and belong to neither partition.
//! In a single-column file that means an empty line is not rejected as an
//! empty non-nullable cell; it is simply not a row.
//!
//! Output files are named `<prefix><source file name>` so a re-run on the
//! same input overwrites the previous outputs. Both partitions are written
//! on every layout-valid run, even when one of them is empty. They are
//! written under hidden staging names and renamed into place together, so
//! a failed write never leaves one partition without the other.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checksum::Checksum;
use crate::classify::{collect_violations, RawRow, Violation};
use crate::error::{Result, ValidatorError};
use crate::schema::SchemaSpec;

/// Field delimiter used when none is configured
pub const DEFAULT_DELIMITER: u8 = b'|';
pub const DEFAULT_ACCEPTED_PREFIX: &str = "accepted-";
pub const DEFAULT_REJECTED_PREFIX: &str = "rejected-";
/// Extra column appended to the rejected file
pub const DEFAULT_REASONS_COLUMN: &str = "rejection_reasons";
/// Joins several reasons inside the reasons column
pub const DEFAULT_REASON_SEPARATOR: &str = "; ";

/// How files are read and where partitions go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    /// Field delimiter for input and both outputs
    pub delimiter: u8,
    pub accepted_prefix: String,
    pub rejected_prefix: String,
    /// Reasons column on the rejected file; `None` leaves it off
    pub reasons_column: Option<String>,
    pub reason_separator: String,
    /// Output directory; `None` writes next to the source
    pub output_dir: Option<PathBuf>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            accepted_prefix: DEFAULT_ACCEPTED_PREFIX.to_string(),
            rejected_prefix: DEFAULT_REJECTED_PREFIX.to_string(),
            reasons_column: Some(DEFAULT_REASONS_COLUMN.to_string()),
            reason_separator: DEFAULT_REASON_SEPARATOR.to_string(),
            output_dir: None,
        }
    }
}

impl SplitOptions {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Reject option combinations that would produce ambiguous output
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() || matches!(self.delimiter, b'"' | b'\n' | b'\r') {
            return Err(ValidatorError::InvalidDelimiter(format!(
                "{:?} cannot be used as a field delimiter",
                self.delimiter as char
            )));
        }
        if self.reason_separator.is_empty() {
            return Err(ValidatorError::InvalidDelimiter(
                "reason separator is empty".to_string(),
            ));
        }
        if self.reason_separator.contains(self.delimiter as char) {
            return Err(ValidatorError::InvalidDelimiter(format!(
                "reason separator {:?} contains the field delimiter {:?}",
                self.reason_separator, self.delimiter as char
            )));
        }
        if self.accepted_prefix.is_empty() || self.rejected_prefix.is_empty() {
            return Err(ValidatorError::InvalidOutput(
                "output prefixes must not be empty".to_string(),
            ));
        }
        if self.accepted_prefix == self.rejected_prefix {
            return Err(ValidatorError::InvalidOutput(format!(
                "accepted and rejected prefixes are both {:?}",
                self.accepted_prefix
            )));
        }
        Ok(())
    }

    pub fn accepted_name(&self, file_name: &str) -> String {
        format!("{}{}", self.accepted_prefix, file_name)
    }

    pub fn rejected_name(&self, file_name: &str) -> String {
        format!("{}{}", self.rejected_prefix, file_name)
    }
}

/// How a file's header differs from the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutMismatch {
    pub expected: Vec<String>,
    pub found: Vec<String>,
    /// Expected columns absent from the header
    pub missing: Vec<String>,
    /// Header columns the schema does not declare
    pub unexpected: Vec<String>,
}

impl LayoutMismatch {
    /// Compare a header to the schema's columns; `None` means identical
    pub fn compare(expected: &[&str], found: &[String]) -> Option<Self> {
        let found_names: Vec<&str> = found.iter().map(String::as_str).collect();
        if expected == found_names.as_slice() {
            return None;
        }

        let missing = expected
            .iter()
            .filter(|e| !found_names.contains(e))
            .map(|e| e.to_string())
            .collect();
        let unexpected = found
            .iter()
            .filter(|f| !expected.contains(&f.as_str()))
            .cloned()
            .collect();

        Some(Self {
            expected: expected.iter().map(|e| e.to_string()).collect(),
            found: found.to_vec(),
            missing,
            unexpected,
        })
    }

    /// Same column set, different order
    pub fn is_reordering(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

impl fmt::Display for LayoutMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column mismatch: expected {:?}, found {:?}",
            self.expected, self.found
        )
    }
}

/// A rejected row with where it came from and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// 1-based line in the source
    pub line: u64,
    pub row: RawRow,
    pub violations: Vec<Violation>,
}

impl RejectedRow {
    pub fn reasons(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Everything learned from one pass over one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValidationResult {
    /// Name of the schema the file was checked against
    pub schema: String,
    /// Path the content was read from, when it came from a file
    pub source: Option<PathBuf>,
    /// Fingerprint of the validated bytes, when read from a file
    pub checksum: Option<Checksum>,
    /// Header as read (trimmed)
    pub header: Vec<String>,
    /// `Some` when the header did not match the schema
    pub layout: Option<LayoutMismatch>,
    pub accepted_rows: Vec<RawRow>,
    pub rejected_rows: Vec<RejectedRow>,
}

impl FileValidationResult {
    fn new(schema: &SchemaSpec, header: Vec<String>) -> Self {
        Self {
            schema: schema.name().to_string(),
            source: None,
            checksum: None,
            header,
            layout: None,
            accepted_rows: Vec::new(),
            rejected_rows: Vec::new(),
        }
    }

    pub fn layout_ok(&self) -> bool {
        self.layout.is_none()
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted_rows.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected_rows.len()
    }

    pub fn total_rows(&self) -> usize {
        self.accepted_count() + self.rejected_count()
    }
}

/// Paths of the two partition files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionPaths {
    pub accepted: PathBuf,
    pub rejected: PathBuf,
}

/// Validate delimited content from any reader
pub fn validate_reader<R: Read>(
    input: R,
    schema: &SchemaSpec,
    delimiter: u8,
) -> Result<FileValidationResult> {
    split_records(input, schema, delimiter).map_err(|source| ValidatorError::Parse {
        path: None,
        source,
    })
}

fn split_records<R: Read>(
    input: R,
    schema: &SchemaSpec,
    delimiter: u8,
) -> csv::Result<FileValidationResult> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut result = FileValidationResult::new(schema, header);

    if let Some(mismatch) = LayoutMismatch::compare(&schema.column_names(), &result.header) {
        warn!(schema = schema.name(), %mismatch, "layout check failed");
        result.layout = Some(mismatch);
        return Ok(result);
    }

    let width = result.header.len();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        let row = RawRow::from_parts(result.header.iter().map(String::as_str), record.iter());
        let mut violations = collect_violations(&row, schema);
        if record.len() > width {
            violations.push(Violation::FieldCount {
                expected: width,
                found: record.len(),
            });
        }

        if violations.is_empty() {
            result.accepted_rows.push(row);
        } else {
            result.rejected_rows.push(RejectedRow {
                line,
                row,
                violations,
            });
        }
    }

    Ok(result)
}

/// Read and validate one file
///
/// Unreadable or malformed input is an error for this file only.
pub fn validate_file(
    path: impl AsRef<Path>,
    schema: &SchemaSpec,
    options: &SplitOptions,
) -> Result<FileValidationResult> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ValidatorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read source file");

    let mut result = split_records(bytes.as_slice(), schema, options.delimiter).map_err(
        |source| ValidatorError::Parse {
            path: Some(path.to_path_buf()),
            source,
        },
    )?;
    let checksum = Checksum::from_bytes(&bytes);
    info!(
        path = %path.display(),
        %checksum,
        schema = schema.name(),
        layout_ok = result.layout_ok(),
        accepted = result.accepted_count(),
        rejected = result.rejected_count(),
        "validated file"
    );

    result.source = Some(path.to_path_buf());
    result.checksum = Some(checksum);
    Ok(result)
}

/// Write the accepted and rejected partitions for a source file
///
/// Returns `None`, writing nothing, when the layout check failed.
pub fn write_partitions(
    result: &FileValidationResult,
    source: &Path,
    options: &SplitOptions,
) -> Result<Option<PartitionPaths>> {
    if !result.layout_ok() {
        return Ok(None);
    }

    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ValidatorError::InvalidOutput(format!("{:?} has no file name", source)))?;

    let dir = match &options.output_dir {
        Some(dir) => dir.clone(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(&dir).map_err(|e| ValidatorError::Write {
            path: dir.clone(),
            source: e,
        })?;
    }

    let paths = PartitionPaths {
        accepted: dir.join(options.accepted_name(file_name)),
        rejected: dir.join(options.rejected_name(file_name)),
    };
    let staged = PartitionPaths {
        accepted: staging_path(&paths.accepted),
        rejected: staging_path(&paths.rejected),
    };

    let written = write_staged(result, &staged, options).and_then(|()| promote(&staged, &paths));
    if let Err(e) = written {
        for leftover in [&staged.accepted, &staged.rejected] {
            let _ = fs::remove_file(leftover);
        }
        return Err(e);
    }

    debug!(
        accepted = %paths.accepted.display(),
        rejected = %paths.rejected.display(),
        "wrote partitions"
    );

    Ok(Some(paths))
}

/// Hidden sibling a partition is written to before it is renamed into place
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

fn write_staged(
    result: &FileValidationResult,
    staged: &PartitionPaths,
    options: &SplitOptions,
) -> Result<()> {
    let columns: Vec<&str> = result.header.iter().map(String::as_str).collect();

    write_delimited(&staged.accepted, options.delimiter, &columns, None, |writer| {
        for row in &result.accepted_rows {
            writer.write_record(row.values_for(&columns))?;
        }
        Ok(())
    })?;

    let reasons_column = options.reasons_column.as_deref().filter(|c| !c.is_empty());
    write_delimited(&staged.rejected, options.delimiter, &columns, reasons_column, |writer| {
        for rejected in &result.rejected_rows {
            let mut record = rejected.row.values_for(&columns);
            let reasons = rejected.reasons().join(&options.reason_separator);
            if reasons_column.is_some() {
                record.push(&reasons);
            }
            writer.write_record(record)?;
        }
        Ok(())
    })
}

/// Move both staged files into place
///
/// Either both partitions land or neither does: if the rejected rename
/// fails the freshly promoted accepted file is removed again.
fn promote(staged: &PartitionPaths, paths: &PartitionPaths) -> Result<()> {
    let rename = |from: &Path, to: &Path| {
        fs::rename(from, to).map_err(|source| ValidatorError::Write {
            path: to.to_path_buf(),
            source,
        })
    };

    rename(staged.accepted.as_path(), paths.accepted.as_path())?;
    if let Err(e) = rename(staged.rejected.as_path(), paths.rejected.as_path()) {
        warn!(path = %paths.accepted.display(), "removing accepted partition after failed write");
        let _ = fs::remove_file(&paths.accepted);
        return Err(e);
    }
    Ok(())
}

fn write_delimited<F>(
    path: &Path,
    delimiter: u8,
    columns: &[&str],
    extra_column: Option<&str>,
    write_rows: F,
) -> Result<()>
where
    F: FnOnce(&mut csv::Writer<File>) -> csv::Result<()>,
{
    let to_write_error = |e: csv::Error| ValidatorError::Write {
        path: path.to_path_buf(),
        source: io::Error::from(e),
    };

    let file = File::create(path).map_err(|source| ValidatorError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(file);

    let mut header = columns.to_vec();
    header.extend(extra_column);
    writer.write_record(&header).map_err(to_write_error)?;
    write_rows(&mut writer).map_err(to_write_error)?;
    writer.flush().map_err(|source| ValidatorError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
