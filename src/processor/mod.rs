use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

pub mod aggregate;
pub mod column;
pub mod filter;
pub mod query_builder;
pub mod schema;
pub mod table;

use column::ColumnType;

/// A row as read from a table: raw text fields in column order.
pub type Row = Vec<String>;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("source not found: {path}")]
    SourceNotFound { path: String },

    #[error("failed to read table: {0}")]
    SourceRead(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write table: {0}")]
    SinkWrite(#[source] csv::Error),

    #[error("table has no header row")]
    MissingHeader,

    #[error("duplicate column '{column}' in header")]
    DuplicateColumn { column: String },

    #[error("row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row has {found} fields, column '{column}' is at position {position}")]
    MissingField {
        column: String,
        position: usize,
        found: usize,
    },

    #[error("header changed since schema inference: expected {expected:?}, found {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("incorrect filter syntax: '{expression}' (expected <column><op><value>)")]
    InvalidSyntax { expression: String },

    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error(
        "value '{literal}' has type '{literal_type}', column '{column}' has type '{column_type}'"
    )]
    TypeMismatch {
        column: String,
        column_type: ColumnType,
        literal: String,
        literal_type: ColumnType,
    },

    #[error(
        "'{op}' aggregation can only be applied to numeric columns, '{column}' is '{column_type}'"
    )]
    IncompatibleAggregation {
        op: AggregateOp,
        column: String,
        column_type: ColumnType,
    },

    #[error("cannot parse '{value}' in column '{column}' as '{column_type}'")]
    ValueParse {
        column: String,
        column_type: ColumnType,
        value: String,
    },

    #[error("'{aggregate}' is undefined for an empty group")]
    EmptyGroup { aggregate: String },

    #[error("'{aggregate}' overflows a 64-bit integer")]
    SumOverflow { aggregate: String },
}

/// A parsed cell value, or the result of an aggregation.
#[derive(Debug, Clone)]
pub enum Value {
    /// Integer column
    Int(i64),
    /// Float column
    Float(f64),
    /// String column
    Str(String),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

/// Values of different variants are unordered.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // Debug keeps the fractional part ("20.0") and round-trips.
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Str(v) => f.write_str(v),
        }
    }
}

/// Comparison operator of a filter expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl CompareOp {
    /// Operator tokens, two-character operators first so matching is longest-first.
    pub const TOKENS: [(&'static str, CompareOp); 6] = [
        ("!=", CompareOp::NotEqual),
        (">=", CompareOp::GreaterOrEqual),
        ("<=", CompareOp::LessOrEqual),
        ("=", CompareOp::Equal),
        (">", CompareOp::GreaterThan),
        ("<", CompareOp::LessThan),
    ];

    pub fn token(self) -> &'static str {
        match self {
            CompareOp::Equal => "=",
            CompareOp::NotEqual => "!=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterOrEqual => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessOrEqual => "<=",
        }
    }

    /// Whether `ordering` (row value relative to the literal) satisfies the operator.
    /// `None` (incomparable) satisfies only `!=`.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CompareOp::NotEqual, None) => true,
            (_, None) => false,
            (CompareOp::Equal, Some(o)) => o == Ordering::Equal,
            (CompareOp::NotEqual, Some(o)) => o != Ordering::Equal,
            (CompareOp::GreaterThan, Some(o)) => o == Ordering::Greater,
            (CompareOp::GreaterOrEqual, Some(o)) => o != Ordering::Less,
            (CompareOp::LessThan, Some(o)) => o == Ordering::Less,
            (CompareOp::LessOrEqual, Some(o)) => o != Ordering::Greater,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Aggregate operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOp {
    /// Sum of all numeric values
    Sum,
    /// Average of numeric values
    Avg,
    /// Maximum value under the column's ordering
    Max,
    /// Minimum value under the column's ordering
    Min,
    /// Number of collected values
    Count,
    /// Number of distinct raw values
    CountDistinct,
}

impl AggregateOp {
    /// Suffix used in result column names (`<column>_<token>`).
    pub fn token(self) -> &'static str {
        match self {
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Max => "max",
            AggregateOp::Min => "min",
            AggregateOp::Count => "count",
            AggregateOp::CountDistinct => "countd",
        }
    }

    pub fn requires_numeric(self) -> bool {
        matches!(self, AggregateOp::Sum | AggregateOp::Avg)
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
