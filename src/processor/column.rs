use std::fmt;

use crate::helpers::parse_helpers::{parse_finite_f64, parse_i64};
use crate::processor::Value;

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
}

impl ColumnType {
    /// Narrowest type a raw value fits: integer, then finite float, then string.
    pub fn classify(raw: &str) -> ColumnType {
        if parse_i64(raw).is_some() {
            ColumnType::Int64
        } else if parse_finite_f64(raw).is_some() {
            ColumnType::Float64
        } else {
            ColumnType::Str
        }
    }

    /// Parses a raw field as this type. String parsing never fails.
    pub fn parse(self, raw: &str) -> Option<Value> {
        match self {
            ColumnType::Int64 => parse_i64(raw).map(Value::Int),
            ColumnType::Float64 => parse_finite_f64(raw).map(Value::Float),
            ColumnType::Str => Some(Value::Str(raw.to_string())),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int64 => "int",
            ColumnType::Float64 => "float",
            ColumnType::Str => "string",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
