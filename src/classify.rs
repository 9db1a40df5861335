//! Row classification
//!
//! Every declared column is checked, in schema order, and every violation
//! is kept. A row is accepted only when the list comes back empty.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::schema::{SchemaSpec, TypeKind};

/// One data row as read from the file: (column, trimmed value) pairs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair header names with values; values are trimmed
    ///
    /// Surplus values (more values than names) are dropped; the caller is
    /// responsible for reporting them.
    pub fn from_parts<'a, N, V>(names: N, values: V) -> Self
    where
        N: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let cells = names
            .into_iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value.trim().to_string()))
            .collect();
        Self { cells }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl AsRef<str>) {
        self.cells
            .push((column.into(), value.as_ref().trim().to_string()));
    }

    /// Value for a column, if the row has one
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    /// Values in the column order given, empty where the row has none
    pub fn values_for<'a>(&'a self, columns: &[&str]) -> Vec<&'a str> {
        columns
            .iter()
            .map(|column| self.get(column).unwrap_or(""))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<S: Into<String>, T: AsRef<str>> FromIterator<(S, T)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.push(column, value);
        }
        row
    }
}

/// A single reason a row failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Empty cell in a non-nullable column
    NullNotAllowed { column: String },
    /// Cell present but not castable to the column's type
    InvalidValue {
        column: String,
        value: String,
        kind: TypeKind,
    },
    /// The row ended before this column
    MissingCell { column: String },
    /// The row has more fields than the header
    FieldCount { expected: usize, found: usize },
}

impl Violation {
    /// Column the violation is about, if it is about one column
    pub fn column(&self) -> Option<&str> {
        match self {
            Violation::NullNotAllowed { column }
            | Violation::InvalidValue { column, .. }
            | Violation::MissingCell { column } => Some(column),
            Violation::FieldCount { .. } => None,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Violation::NullNotAllowed { .. } => "null_not_allowed",
            Violation::InvalidValue { .. } => "invalid_value",
            Violation::MissingCell { .. } => "missing_cell",
            Violation::FieldCount { .. } => "field_count",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NullNotAllowed { column } => {
                write!(f, "non-nullable column `{}` is empty", column)
            }
            Violation::InvalidValue { column, value, kind } => {
                write!(
                    f,
                    "value `{}` is not a valid {} for column `{}`",
                    value, kind, column
                )
            }
            Violation::MissingCell { column } => {
                write!(f, "row has no value for column `{}`", column)
            }
            Violation::FieldCount { expected, found } => {
                write!(f, "row has {} fields but the header declares {}", found, expected)
            }
        }
    }
}

impl Serialize for Violation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Violation", 3)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("column", &self.column())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result of classifying one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(Vec<Violation>),
}

impl ValidationOutcome {
    fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            ValidationOutcome::Accepted
        } else {
            ValidationOutcome::Rejected(violations)
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationOutcome::Accepted => &[],
            ValidationOutcome::Rejected(violations) => violations,
        }
    }

    /// Human-readable reasons, in column order
    pub fn reasons(&self) -> Vec<String> {
        self.violations().iter().map(ToString::to_string).collect()
    }
}

/// Check a row against every column of the schema
pub fn classify(row: &RawRow, schema: &SchemaSpec) -> ValidationOutcome {
    ValidationOutcome::from_violations(collect_violations(row, schema))
}

pub(crate) fn collect_violations(row: &RawRow, schema: &SchemaSpec) -> Vec<Violation> {
    let mut violations = Vec::new();

    for column in schema.columns() {
        let Some(raw) = row.get(&column.name) else {
            violations.push(Violation::MissingCell {
                column: column.name.clone(),
            });
            continue;
        };

        let value = raw.trim();
        if value.is_empty() {
            if !column.nullable {
                violations.push(Violation::NullNotAllowed {
                    column: column.name.clone(),
                });
            }
            continue;
        }

        if !column.logical_type.accepts(value) {
            violations.push(Violation::InvalidValue {
                column: column.name.clone(),
                value: value.to_string(),
                kind: column.logical_type.kind(),
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> SchemaSpec {
        SchemaSpec::builder("members")
            .integer("id", false)
            .integer("age", true)
            .date("joined", "YYYY-MM-DD", true)
            .build()
            .unwrap()
    }

    fn row(values: [&str; 3]) -> RawRow {
        RawRow::from_parts(["id", "age", "joined"], values)
    }

    #[test]
    fn test_valid_row_accepted() {
        let outcome = classify(&row(["1", "30", "2020-01-01"]), &members());
        assert_eq!(outcome, ValidationOutcome::Accepted);
        assert!(outcome.reasons().is_empty());
    }

    #[test]
    fn test_empty_non_nullable_rejected() {
        let outcome = classify(&row(["", "25", "2020-01-01"]), &members());
        assert_eq!(outcome.reasons(), vec!["non-nullable column `id` is empty"]);
    }

    #[test]
    fn test_empty_nullable_accepted() {
        let outcome = classify(&row(["7", "", "  "]), &members());
        assert!(outcome.is_accepted());
    }

    #[test]
    fn test_violations_accumulate_in_column_order() {
        let outcome = classify(&row(["3", "x", "2020-13-40"]), &members());
        assert_eq!(
            outcome.reasons(),
            vec![
                "value `x` is not a valid Integer for column `age`",
                "value `2020-13-40` is not a valid Date for column `joined`",
            ]
        );
        assert_eq!(outcome.violations()[0].column(), Some("age"));
        assert_eq!(outcome.violations()[1].column(), Some("joined"));
    }

    #[test]
    fn test_missing_cell_reported() {
        let short = RawRow::from_parts(["id", "age"], ["1", "2"]);
        let outcome = classify(&short, &members());
        assert_eq!(
            outcome.violations(),
            &[Violation::MissingCell {
                column: "joined".to_string()
            }]
        );
    }

    #[test]
    fn test_values_are_trimmed() {
        let padded = row(["  12 ", " 30", "2020-01-01  "]);
        assert_eq!(padded.get("id"), Some("12"));
        assert!(classify(&padded, &members()).is_accepted());
    }

    #[test]
    fn test_violation_serializes_with_message() {
        let violation = Violation::NullNotAllowed {
            column: "id".to_string(),
        };
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["code"], "null_not_allowed");
        assert_eq!(json["column"], "id");
        assert_eq!(json["message"], "non-nullable column `id` is empty");

        let json = serde_json::to_value(Violation::FieldCount {
            expected: 3,
            found: 4,
        })
        .unwrap();
        assert!(json["column"].is_null());
    }
}
