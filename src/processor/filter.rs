use std::fmt;

use crate::processor::{
    CompareOp, ProcessorError, Value,
    column::ColumnType,
    schema::{ResolvedColumn, Schema},
};

/// A `<column><op><value>` predicate bound to a schema column.
///
/// The literal is parsed once, as the column's type, when the filter is built;
/// row values are parsed on every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: ResolvedColumn,
    op: CompareOp,
    literal: String,
    target: Value,
}

impl Filter {
    /// Parses a filter expression such as `age>=30` or `name!=Bob`.
    ///
    /// The whole expression must be a column token (`[A-Za-z0-9_]+`), one of
    /// `!=`, `>=`, `<=`, `=`, `>`, `<`, and a value token (`[A-Za-z0-9_.+-]+`)
    /// with nothing in between.
    ///
    /// # Errors
    /// - [`ProcessorError::InvalidSyntax`] if the expression has another shape
    /// - [`ProcessorError::UnknownColumn`] if the column is not in `schema`
    /// - [`ProcessorError::TypeMismatch`] if the column is numeric and the
    ///   value's type differs from it
    pub fn parse(expression: &str, schema: &Schema) -> Result<Self, ProcessorError> {
        let (column, op, literal) =
            split_expression(expression).ok_or_else(|| ProcessorError::InvalidSyntax {
                expression: expression.to_string(),
            })?;
        Self::new(column, op, literal, schema)
    }

    /// Builds a filter from already separated parts.
    pub fn new(
        column: &str,
        op: CompareOp,
        literal: &str,
        schema: &Schema,
    ) -> Result<Self, ProcessorError> {
        let column = schema.resolve(column)?;

        // String columns compare any literal lexicographically.
        let literal_type = ColumnType::classify(literal);
        if column.column_type != ColumnType::Str && literal_type != column.column_type {
            return Err(ProcessorError::TypeMismatch {
                column: column.name,
                column_type: column.column_type,
                literal: literal.to_string(),
                literal_type,
            });
        }

        let target = column.parse(literal)?;

        Ok(Filter {
            column,
            op,
            literal: literal.to_string(),
            target,
        })
    }

    pub fn column(&self) -> &ResolvedColumn {
        &self.column
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Compares the row's value in the filter column against the literal.
    ///
    /// # Errors
    /// - [`ProcessorError::ValueParse`] if the row's value does not parse as the
    ///   column's type
    /// - [`ProcessorError::MissingField`] if the row is too short
    pub fn evaluate(&self, row: &[String]) -> Result<bool, ProcessorError> {
        let value = self.column.parse(self.column.field(row)?)?;
        Ok(self.op.holds(value.partial_cmp(&self.target)))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.column.name, self.op, self.literal)
    }
}

/// True if the row passes every filter. Stops at the first failing filter.
pub fn passes_all(filters: &[Filter], row: &[String]) -> Result<bool, ProcessorError> {
    for filter in filters {
        if !filter.evaluate(row)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn is_column_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

fn split_expression(expression: &str) -> Option<(&str, CompareOp, &str)> {
    let column_end = expression
        .find(|c: char| !is_column_char(c))
        .unwrap_or(expression.len());
    if column_end == 0 {
        return None;
    }
    let (column, rest) = expression.split_at(column_end);

    let (op, literal) = CompareOp::TOKENS
        .iter()
        .find_map(|(token, op)| rest.strip_prefix(token).map(|literal| (*op, literal)))?;

    if literal.is_empty() || !literal.chars().all(is_literal_char) {
        return None;
    }

    Some((column, op, literal))
}
