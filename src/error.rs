//! Error types for the staging validator

use std::path::PathBuf;

use thiserror::Error;

/// Result type for validator operations
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Broad failure class of a [`ValidatorError`]
///
/// Config errors are fatal at startup. Io errors are fatal for the one
/// file being processed; a batch driver records them and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Io,
}

/// Validator errors
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Schema {schema} declares column {column} more than once")]
    DuplicateColumn { schema: String, column: String },

    #[error("Schema {0} declares no columns")]
    EmptySchema(String),

    #[error("Column {column} of type {kind} requires a parse pattern")]
    MissingPattern { column: String, kind: String },

    #[error("Invalid parse pattern {pattern:?} for column {column}: {reason}")]
    InvalidPattern {
        column: String,
        pattern: String,
        reason: String,
    },

    #[error("Invalid decimal specification for column {column}: {reason}")]
    InvalidDecimal { column: String, reason: String },

    #[error("Invalid delimiter configuration: {0}")]
    InvalidDelimiter(String),

    #[error("Invalid output configuration: {0}")]
    InvalidOutput(String),

    #[error("Invalid file mask {mask:?}: {source}")]
    InvalidMask {
        mask: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Schema already registered: {0}")]
    DuplicateSchema(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("No schema matches file: {0}")]
    NoMatchingSchema(String),

    #[error("Invalid schema definition in {path}: {reason}")]
    InvalidDefinition { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed delimited data{}: {source}", location(.path))]
    Parse {
        /// `None` when the input did not come from a file
        path: Option<PathBuf>,
        #[source]
        source: csv::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn location(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl ValidatorError {
    /// Which side of the taxonomy this error falls on
    pub fn category(&self) -> ErrorCategory {
        match self {
            ValidatorError::Read { .. }
            | ValidatorError::Write { .. }
            | ValidatorError::Parse { .. }
            | ValidatorError::Io(_)
            | ValidatorError::Json(_) => ErrorCategory::Io,
            _ => ErrorCategory::Config,
        }
    }

    pub fn is_config(&self) -> bool {
        self.category() == ErrorCategory::Config
    }

    pub fn is_io(&self) -> bool {
        self.category() == ErrorCategory::Io
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err = ValidatorError::DuplicateColumn {
            schema: "members".to_string(),
            column: "id".to_string(),
        };
        assert!(err.is_config());

        let err = ValidatorError::Read {
            path: PathBuf::from("missing.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.is_io());
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_parse_error_location() {
        let csv_error = || {
            let mut reader = csv::Reader::from_reader(&b"id\n\xff\n"[..]);
            reader.records().next().unwrap().unwrap_err()
        };

        let err = ValidatorError::Parse {
            path: Some(PathBuf::from("staged.csv")),
            source: csv_error(),
        };
        assert!(err.to_string().starts_with("Malformed delimited data in staged.csv: "));

        let err = ValidatorError::Parse {
            path: None,
            source: csv_error(),
        };
        assert!(err.to_string().starts_with("Malformed delimited data: "));
        assert!(err.is_io());
    }
}
