//! Schema types and structures
//!
//! A [`SchemaSpec`] is the ordered column contract a staging file must meet:
//! every column has a [`LogicalType`] and a nullability flag. Specs are
//! immutable once built; construction is where malformed definitions
//! (duplicate names, missing date patterns) are rejected.

use std::collections::HashSet;
use std::fmt;

use chrono::format::{Fixed, Item, Numeric, StrftimeItems};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidatorError};

/// Destination-side type of a column, without its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[serde(alias = "int", alias = "bigint", alias = "smallint")]
    Integer,
    #[serde(alias = "numeric", alias = "float")]
    Decimal,
    Date,
    #[serde(alias = "datetime")]
    Timestamp,
    #[serde(alias = "varchar", alias = "nvarchar", alias = "string")]
    Text,
}

impl TypeKind {
    /// Whether columns of this kind need a parse pattern
    pub fn requires_pattern(&self) -> bool {
        matches!(self, TypeKind::Date | TypeKind::Timestamp)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Integer => "Integer",
            TypeKind::Decimal => "Decimal",
            TypeKind::Date => "Date",
            TypeKind::Timestamp => "Timestamp",
            TypeKind::Text => "Text",
        };
        f.write_str(name)
    }
}

/// Parse pattern for date and timestamp columns
///
/// Accepts either strftime syntax (`%Y-%m-%d`) or token syntax
/// (`YYYY-MM-DD HH:mm:SS`). Token patterns are translated to strftime
/// on construction; `source()` keeps what the user wrote.
///
/// chrono's parser is looser than the pattern text: `%Y` takes any width
/// and a sign, and a space matches nothing. Each pattern therefore also
/// compiles an anchored shape that a value must match before parsing.
#[derive(Debug, Clone)]
pub struct TemporalPattern {
    source: String,
    strftime: String,
    shape: Regex,
}

impl PartialEq for TemporalPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.strftime == other.strftime
    }
}

impl Eq for TemporalPattern {}

const PATTERN_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("SS", "%S"),
    ("ss", "%S"),
];

impl TemporalPattern {
    /// Parse a pattern, returning a human-readable reason on failure
    pub fn parse(pattern: &str) -> std::result::Result<Self, String> {
        if pattern.trim().is_empty() {
            return Err("pattern is empty".to_string());
        }

        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate_tokens(pattern)
        };

        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(format!("unsupported specifier in {:?}", strftime));
        }

        let shape = Regex::new(&shape_of(&strftime)).map_err(|e| e.to_string())?;

        Ok(Self {
            source: pattern.to_string(),
            strftime,
            shape,
        })
    }

    /// Whether a value has the exact layout of the pattern
    ///
    /// Field widths and literals only; calendar validity is left to chrono.
    pub fn matches_shape(&self, raw: &str) -> bool {
        self.shape.is_match(raw)
    }

    /// The pattern as written in the definition
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The equivalent strftime pattern used for parsing
    pub fn strftime(&self) -> &str {
        &self.strftime
    }
}

/// Anchored regex for the layout a strftime pattern describes
///
/// Widths follow `strptime`: four-digit years, one or two digits for the
/// other calendar fields, at least one character per whitespace run.
fn shape_of(strftime: &str) -> String {
    let mut out = String::from("^");

    for item in StrftimeItems::new(strftime) {
        let part = match item {
            Item::Literal(text) => regex::escape(text),
            Item::Space(_) => r"\s+".to_string(),
            Item::Numeric(numeric, _) => match numeric {
                Numeric::Year => r"\d{4}",
                Numeric::YearDiv100 | Numeric::YearMod100 => r"\d{2}",
                Numeric::Ordinal => r"\d{1,3}",
                Numeric::Nanosecond => r"\d{1,9}",
                Numeric::Timestamp => r"-?\d+",
                Numeric::WeekdayFromMon | Numeric::NumDaysFromSun => r"\d",
                Numeric::Month
                | Numeric::Day
                | Numeric::Hour
                | Numeric::Hour12
                | Numeric::Minute
                | Numeric::Second => r"\d{1,2}",
                _ => r"\d+",
            }
            .to_string(),
            Item::Fixed(fixed) => match fixed {
                Fixed::ShortMonthName | Fixed::ShortWeekdayName => r"[A-Za-z]{3}",
                Fixed::LongMonthName | Fixed::LongWeekdayName => r"[A-Za-z]+",
                Fixed::LowerAmPm | Fixed::UpperAmPm => r"[AaPp][Mm]",
                _ => r".*?",
            }
            .to_string(),
            _ => r".+?".to_string(),
        };
        out.push_str(&part);
    }

    out.push('$');
    out
}

fn translate_tokens(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    'scan: while !rest.is_empty() {
        for (token, spec) in PATTERN_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

impl fmt::Display for TemporalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Precision and scale of a destination DECIMAL(p, s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecimalSpec {
    pub precision: u32,
    pub scale: u32,
}

impl DecimalSpec {
    pub fn new(precision: u32, scale: u32) -> std::result::Result<Self, String> {
        if precision == 0 {
            return Err("precision must be positive".to_string());
        }
        if scale > precision {
            return Err(format!(
                "scale ({}) cannot exceed precision ({})",
                scale, precision
            ));
        }
        Ok(Self { precision, scale })
    }

    /// Digits allowed before the decimal point
    pub fn integer_digits(&self) -> u32 {
        self.precision - self.scale
    }
}

/// Logical type of a column, carrying whatever its checker needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalType {
    Integer,
    /// Optional DECIMAL(p, s) bounds; `None` accepts any plain decimal
    Decimal(Option<DecimalSpec>),
    Date(TemporalPattern),
    Timestamp(TemporalPattern),
    /// Optional maximum length in characters
    Text(Option<usize>),
}

impl LogicalType {
    pub fn kind(&self) -> TypeKind {
        match self {
            LogicalType::Integer => TypeKind::Integer,
            LogicalType::Decimal(_) => TypeKind::Decimal,
            LogicalType::Date(_) => TypeKind::Date,
            LogicalType::Timestamp(_) => TypeKind::Timestamp,
            LogicalType::Text(_) => TypeKind::Text,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Decimal(Some(spec)) => {
                write!(f, "Decimal({}, {})", spec.precision, spec.scale)
            }
            LogicalType::Date(pattern) => write!(f, "Date \"{}\"", pattern),
            LogicalType::Timestamp(pattern) => write!(f, "Timestamp \"{}\"", pattern),
            LogicalType::Text(Some(max)) => write!(f, "Text({})", max),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// A single validated column of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable,
        }
    }
}

/// Column as written in a definition file or config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name as it appears in the file header
    pub name: String,
    /// Logical type
    #[serde(rename = "type")]
    pub kind: TypeKind,
    /// Whether an empty cell is allowed
    #[serde(default)]
    pub nullable: bool,
    /// Parse pattern (date and timestamp only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// DECIMAL precision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// DECIMAL scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Maximum text length in characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind, nullable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable,
            format: None,
            precision: None,
            scale: None,
            max_length: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Resolve into a checked column
    pub fn to_spec(&self) -> Result<ColumnSpec> {
        let logical_type = match self.kind {
            TypeKind::Integer => LogicalType::Integer,
            TypeKind::Decimal => {
                let spec = match (self.precision, self.scale) {
                    (None, None) => None,
                    (None, Some(_)) => {
                        return Err(ValidatorError::InvalidDecimal {
                            column: self.name.clone(),
                            reason: "scale given without precision".to_string(),
                        })
                    }
                    (Some(precision), scale) => Some(
                        DecimalSpec::new(precision, scale.unwrap_or(0)).map_err(|reason| {
                            ValidatorError::InvalidDecimal {
                                column: self.name.clone(),
                                reason,
                            }
                        })?,
                    ),
                };
                LogicalType::Decimal(spec)
            }
            TypeKind::Date => LogicalType::Date(self.pattern()?),
            TypeKind::Timestamp => LogicalType::Timestamp(self.pattern()?),
            TypeKind::Text => LogicalType::Text(self.max_length),
        };

        Ok(ColumnSpec::new(self.name.clone(), logical_type, self.nullable))
    }

    fn pattern(&self) -> Result<TemporalPattern> {
        let raw = self
            .format
            .as_deref()
            .ok_or_else(|| ValidatorError::MissingPattern {
                column: self.name.clone(),
                kind: self.kind.to_string(),
            })?;

        TemporalPattern::parse(raw).map_err(|reason| ValidatorError::InvalidPattern {
            column: self.name.clone(),
            pattern: raw.to_string(),
            reason,
        })
    }
}

impl From<&ColumnSpec> for ColumnDefinition {
    fn from(column: &ColumnSpec) -> Self {
        let mut def = ColumnDefinition::new(
            column.name.clone(),
            column.logical_type.kind(),
            column.nullable,
        );
        match &column.logical_type {
            LogicalType::Decimal(Some(spec)) => {
                def.precision = Some(spec.precision);
                def.scale = Some(spec.scale);
            }
            LogicalType::Date(p) | LogicalType::Timestamp(p) => {
                def.format = Some(p.source().to_string());
            }
            LogicalType::Text(max) => def.max_length = *max,
            _ => {}
        }
        def
    }
}

/// A named schema as written in a definition file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Unique schema name
    pub name: String,
    /// Glob masks selecting the files this schema applies to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_masks: Vec<String>,
    /// Columns in file order
    pub columns: Vec<ColumnDefinition>,
}

impl SchemaDefinition {
    pub fn to_spec(&self) -> Result<SchemaSpec> {
        SchemaSpec::from_definitions(&self.name, &self.columns)
    }
}

/// The ordered column contract for one staging file layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSpec {
    name: String,
    columns: Vec<ColumnSpec>,
}

impl SchemaSpec {
    /// Build a schema from resolved columns
    ///
    /// Fails if there are no columns or a name repeats.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(ValidatorError::EmptySchema(name));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ValidatorError::DuplicateColumn {
                    schema: name,
                    column: column.name.clone(),
                });
            }
        }

        Ok(Self { name, columns })
    }

    /// Build a schema from column definitions
    pub fn from_definitions(name: impl Into<String>, columns: &[ColumnDefinition]) -> Result<Self> {
        let columns = columns
            .iter()
            .map(ColumnDefinition::to_spec)
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, columns)
    }

    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert back into the serializable definition form
    pub fn to_definition(&self, file_masks: Vec<String>) -> SchemaDefinition {
        SchemaDefinition {
            name: self.name.clone(),
            file_masks,
            columns: self.columns.iter().map(ColumnDefinition::from).collect(),
        }
    }
}

/// Incremental construction of a [`SchemaSpec`]
///
/// Definitions are collected as written and checked once in `build()`,
/// so errors carry column names.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    columns: Vec<ColumnDefinition>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, definition: ColumnDefinition) -> Self {
        self.columns.push(definition);
        self
    }

    pub fn integer(self, name: impl Into<String>, nullable: bool) -> Self {
        self.column(ColumnDefinition::new(name, TypeKind::Integer, nullable))
    }

    pub fn decimal(self, name: impl Into<String>, nullable: bool) -> Self {
        self.column(ColumnDefinition::new(name, TypeKind::Decimal, nullable))
    }

    pub fn bounded_decimal(
        self,
        name: impl Into<String>,
        precision: u32,
        scale: u32,
        nullable: bool,
    ) -> Self {
        let mut def = ColumnDefinition::new(name, TypeKind::Decimal, nullable);
        def.precision = Some(precision);
        def.scale = Some(scale);
        self.column(def)
    }

    pub fn date(self, name: impl Into<String>, format: &str, nullable: bool) -> Self {
        self.column(ColumnDefinition::new(name, TypeKind::Date, nullable).with_format(format))
    }

    pub fn timestamp(self, name: impl Into<String>, format: &str, nullable: bool) -> Self {
        self.column(ColumnDefinition::new(name, TypeKind::Timestamp, nullable).with_format(format))
    }

    pub fn text(self, name: impl Into<String>, nullable: bool) -> Self {
        self.column(ColumnDefinition::new(name, TypeKind::Text, nullable))
    }

    pub fn bounded_text(self, name: impl Into<String>, max_length: usize, nullable: bool) -> Self {
        let mut def = ColumnDefinition::new(name, TypeKind::Text, nullable);
        def.max_length = Some(max_length);
        self.column(def)
    }

    pub fn build(self) -> Result<SchemaSpec> {
        SchemaSpec::from_definitions(self.name, &self.columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let schema = SchemaSpec::builder("members")
            .integer("id", false)
            .text("name", false)
            .date("joined", "YYYY-MM-DD", true)
            .build()
            .unwrap();

        assert_eq!(schema.name(), "members");
        assert_eq!(schema.column_names(), vec!["id", "name", "joined"]);
        assert!(schema.column("joined").unwrap().nullable);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = SchemaSpec::builder("dup")
            .integer("id", false)
            .text("id", true)
            .build()
            .unwrap_err();

        assert!(matches!(err, ValidatorError::DuplicateColumn { ref column, .. } if column == "id"));
        assert!(err.is_config());
    }

    #[test]
    fn test_date_without_pattern_rejected() {
        let err = SchemaSpec::builder("dates")
            .column(ColumnDefinition::new("joined", TypeKind::Date, true))
            .build()
            .unwrap_err();

        assert!(matches!(err, ValidatorError::MissingPattern { ref column, .. } if column == "joined"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = SchemaSpec::new("nothing", Vec::new()).unwrap_err();
        assert!(matches!(err, ValidatorError::EmptySchema(_)));
    }

    #[test]
    fn test_token_pattern_translation() {
        let pattern = TemporalPattern::parse("YYYY-MM-DD HH:mm:SS").unwrap();
        assert_eq!(pattern.strftime(), "%Y-%m-%d %H:%M:%S");
        assert_eq!(pattern.source(), "YYYY-MM-DD HH:mm:SS");

        let pattern = TemporalPattern::parse("%d/%m/%Y").unwrap();
        assert_eq!(pattern.strftime(), "%d/%m/%Y");
    }

    #[test]
    fn test_pattern_shape() {
        let pattern = TemporalPattern::parse("YYYY-MM-DD HH:mm:SS").unwrap();
        assert!(pattern.matches_shape("2020-01-01 10:00:00"));
        assert!(pattern.matches_shape("2020-1-1 9:05:00"));
        assert!(!pattern.matches_shape("20-01-01 10:00:00"));
        assert!(!pattern.matches_shape("+2020-01-01 10:00:00"));
        assert!(!pattern.matches_shape("2020-01-0110:00:00"));
        assert!(!pattern.matches_shape("2020/01/01 10:00:00"));

        // Literals are escaped, not treated as regex syntax
        let pattern = TemporalPattern::parse("%d.%m.%Y").unwrap();
        assert!(pattern.matches_shape("31.12.1999"));
        assert!(!pattern.matches_shape("31x12x1999"));
    }

    #[test]
    fn test_invalid_strftime_rejected() {
        assert!(TemporalPattern::parse("%Y-%Q").is_err());
        assert!(TemporalPattern::parse("   ").is_err());
    }

    #[test]
    fn test_decimal_spec_bounds() {
        assert!(DecimalSpec::new(0, 0).is_err());
        assert!(DecimalSpec::new(4, 5).is_err());
        assert_eq!(DecimalSpec::new(10, 2).unwrap().integer_digits(), 8);

        let mut def = ColumnDefinition::new("salary", TypeKind::Decimal, true);
        def.scale = Some(2);
        assert!(matches!(def.to_spec(), Err(ValidatorError::InvalidDecimal { .. })));
    }

    #[test]
    fn test_type_aliases_deserialize() {
        let def: SchemaDefinition = toml::from_str(
            r#"
            name = "staged"
            file_masks = ["staged_*.csv"]

            [[columns]]
            name = "id"
            type = "int"

            [[columns]]
            name = "created_at"
            type = "datetime"
            format = "%Y-%m-%d %H:%M:%S"

            [[columns]]
            name = "name"
            type = "varchar"
            nullable = true
            "#,
        )
        .unwrap();

        let schema = def.to_spec().unwrap();
        assert_eq!(schema.columns()[0].logical_type, LogicalType::Integer);
        assert_eq!(schema.columns()[1].logical_type.kind(), TypeKind::Timestamp);
        assert!(!schema.columns()[0].nullable);
        assert!(schema.columns()[2].nullable);
    }

    #[test]
    fn test_definition_round_trip_keeps_pattern_source() {
        let schema = SchemaSpec::builder("members")
            .date("joined", "YYYY-MM-DD", true)
            .bounded_decimal("salary", 10, 2, true)
            .build()
            .unwrap();

        let def = schema.to_definition(vec!["members_*.csv".to_string()]);
        assert_eq!(def.columns[0].format.as_deref(), Some("YYYY-MM-DD"));
        assert_eq!(def.columns[1].precision, Some(10));
        assert_eq!(def.to_spec().unwrap(), schema);
    }
}
