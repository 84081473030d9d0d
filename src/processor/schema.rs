use log::debug;
use std::collections::HashMap;

use crate::processor::{ProcessorError, Row, Value, column::ColumnType, table::TableSource};

/// Position and inferred type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnInfo {
    pub position: usize,
    pub column_type: ColumnType,
}

/// Column names in header order plus per-name position and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    headers: Vec<String>,
    columns: HashMap<String, ColumnInfo>,
}

/// A column looked up in a schema, carrying its name for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub name: String,
    pub position: usize,
    pub column_type: ColumnType,
}

impl ResolvedColumn {
    /// Raw field of this column in `row`.
    ///
    /// # Errors
    /// [`ProcessorError::MissingField`] if `row` is too short to hold the column.
    pub fn field<'r>(&self, row: &'r [String]) -> Result<&'r str, ProcessorError> {
        row.get(self.position)
            .map(String::as_str)
            .ok_or_else(|| ProcessorError::MissingField {
                column: self.name.clone(),
                position: self.position,
                found: row.len(),
            })
    }

    /// Parses a raw field as the column's type.
    pub fn parse(&self, raw: &str) -> Result<Value, ProcessorError> {
        self.column_type
            .parse(raw)
            .ok_or_else(|| self.parse_error(raw))
    }

    pub(crate) fn parse_error(&self, raw: &str) -> ProcessorError {
        ProcessorError::ValueParse {
            column: self.name.clone(),
            column_type: self.column_type,
            value: raw.to_string(),
        }
    }
}

impl Schema {
    /// Builds a schema from `(name, type)` pairs in column order.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, ProcessorError>
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let mut headers = Vec::new();
        let mut map = HashMap::new();

        for (position, (name, column_type)) in columns.into_iter().enumerate() {
            let name = name.into();
            let info = ColumnInfo {
                position,
                column_type,
            };
            if map.insert(name.clone(), info).is_some() {
                return Err(ProcessorError::DuplicateColumn { column: name });
            }
            headers.push(name);
        }

        Ok(Schema {
            headers,
            columns: map,
        })
    }

    fn all_strings(headers: Row) -> Result<Self, ProcessorError> {
        Self::from_columns(headers.into_iter().map(|h| (h, ColumnType::Str)))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.get(name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }

    /// Looks a column up by name.
    ///
    /// # Errors
    /// [`ProcessorError::UnknownColumn`] if the schema has no such column.
    pub fn resolve(&self, name: &str) -> Result<ResolvedColumn, ProcessorError> {
        let info = self
            .columns
            .get(name)
            .ok_or_else(|| ProcessorError::UnknownColumn {
                column: name.to_string(),
            })?;

        Ok(ResolvedColumn {
            name: name.to_string(),
            position: info.position,
            column_type: info.column_type,
        })
    }

    fn set_type(&mut self, position: usize, column_type: ColumnType) {
        if let Some(info) = self
            .headers
            .get(position)
            .and_then(|name| self.columns.get_mut(name))
        {
            info.column_type = column_type;
        }
    }

    /// Checks that a row has one field per column.
    pub(crate) fn check_width(&self, row: &Row, row_number: usize) -> Result<(), ProcessorError> {
        if row.len() != self.headers.len() {
            return Err(ProcessorError::RaggedRow {
                row: row_number,
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        Ok(())
    }
}

/// Next state of a numeric candidate after observing a value of type `observed`.
///
/// Integer candidates widen to float; anything string-shaped drops the candidate.
fn next_candidate(candidate: ColumnType, observed: ColumnType) -> Option<ColumnType> {
    match (candidate, observed) {
        (_, ColumnType::Str) | (ColumnType::Str, _) => None,
        (ColumnType::Int64, ColumnType::Int64) => Some(ColumnType::Int64),
        (ColumnType::Int64, ColumnType::Float64) | (ColumnType::Float64, _) => {
            Some(ColumnType::Float64)
        }
    }
}

/// Infers the schema of a table.
///
/// Every column starts as a string. The first data row proposes numeric
/// candidates, and the rest of the table is scanned until every candidate has
/// been ruled out or the data ends: a column is numeric only if all of its
/// values are.
///
/// # Errors
/// Returns a [`ProcessorError`] if:
/// - the source cannot be opened or read
/// - there is no header row, or the header repeats a name
/// - a data row's width differs from the header's
///
/// # Example
/// ```rust
/// # use tabular_processor::{infer_schema, ColumnType, Table, TableFormat};
/// let csv = "name,age\nAlice,30\n";
/// let table = Table::from_reader(csv.as_bytes(), &TableFormat::default()).unwrap();
/// let schema = infer_schema(&table).unwrap();
/// assert_eq!(schema.column_type("age"), Some(ColumnType::Int64));
/// ```
pub fn infer_schema<S: TableSource + ?Sized>(source: &S) -> Result<Schema, ProcessorError> {
    let mut rows = source.rows()?;

    let headers = rows.next().ok_or(ProcessorError::MissingHeader)??;
    let mut schema = Schema::all_strings(headers)?;

    let probe = match rows.next() {
        Some(row) => row?,
        None => {
            debug!("no data rows, all {} columns are strings", schema.len());
            return Ok(schema);
        }
    };
    schema.check_width(&probe, 1)?;

    let mut candidates: Vec<(usize, ColumnType)> = probe
        .iter()
        .enumerate()
        .filter_map(|(position, value)| {
            let column_type = ColumnType::classify(value);
            column_type.is_numeric().then_some((position, column_type))
        })
        .collect();
    debug!("numeric candidates after probe row: {:?}", candidates);

    let mut row_number = 1;
    while !candidates.is_empty() {
        let Some(row) = rows.next() else {
            break;
        };
        let row = row?;
        row_number += 1;
        schema.check_width(&row, row_number)?;

        candidates.retain_mut(|(position, candidate)| {
            match next_candidate(*candidate, ColumnType::classify(&row[*position])) {
                Some(next) => {
                    *candidate = next;
                    true
                }
                None => false,
            }
        });
    }
    debug!("scanned {} data rows for numeric columns", row_number);

    for (position, column_type) in candidates {
        schema.set_type(position, column_type);
    }

    for name in schema.headers() {
        debug!("column '{}' inferred as {}", name, schema.columns[name].column_type);
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::table::{CsvTable, Table, TableFormat};

    fn table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes(), &TableFormat::default()).unwrap()
    }

    #[test]
    fn test_infer_basic_types() {
        let schema = infer_schema(&table("name,age,score\nAlice,30,1.5\nBob,25,2\n")).unwrap();
        assert_eq!(schema.headers(), &["name", "age", "score"]);
        assert_eq!(schema.column_type("name"), Some(ColumnType::Str));
        assert_eq!(schema.column_type("age"), Some(ColumnType::Int64));
        assert_eq!(schema.column_type("score"), Some(ColumnType::Float64));
        assert_eq!(schema.column("score").unwrap().position, 2);
    }

    #[test]
    fn test_late_non_numeric_value_demotes_to_string() {
        let schema = infer_schema(&table("id,code\n1,10\n2,20\n3,x9\n")).unwrap();
        assert_eq!(schema.column_type("id"), Some(ColumnType::Int64));
        assert_eq!(schema.column_type("code"), Some(ColumnType::Str));
    }

    #[test]
    fn test_integer_column_with_one_float_is_float() {
        let schema = infer_schema(&table("v\n1\n2\n3.5\n4\n")).unwrap();
        assert_eq!(schema.column_type("v"), Some(ColumnType::Float64));
    }

    #[test]
    fn test_string_probe_is_never_numeric() {
        let schema = infer_schema(&table("v\nabc\n1\n2\n")).unwrap();
        assert_eq!(schema.column_type("v"), Some(ColumnType::Str));
    }

    #[test]
    fn test_header_only_is_all_strings() {
        let schema = infer_schema(&table("a,b\n")).unwrap();
        assert_eq!(schema.column_type("a"), Some(ColumnType::Str));
        assert_eq!(schema.column_type("b"), Some(ColumnType::Str));
    }

    #[test]
    fn test_empty_source_is_missing_header() {
        let err = infer_schema(&table("")).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingHeader));
    }

    #[test]
    fn test_duplicate_header_is_rejected() {
        let err = infer_schema(&table("a,a\n1,2\n")).unwrap_err();
        assert!(matches!(err, ProcessorError::DuplicateColumn { column } if column == "a"));
    }

    #[test]
    fn test_ragged_in_memory_row_is_rejected() {
        let source = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into()]],
        );
        let err = infer_schema(&source).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::RaggedRow {
                row: 2,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_inference_is_idempotent_on_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "name,age\nAlice,30\nBob,25\nCara,30\n").unwrap();
        let source = CsvTable::new(tmp.path());

        let first = infer_schema(&source).unwrap();
        let second = infer_schema(&source).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_unknown_column() {
        let schema = Schema::from_columns([("a", ColumnType::Int64)]).unwrap();
        assert!(matches!(
            schema.resolve("b"),
            Err(ProcessorError::UnknownColumn { column }) if column == "b"
        ));
        let a = schema.resolve("a").unwrap();
        assert_eq!(a.parse("5").unwrap(), Value::Int(5));
        assert!(matches!(
            a.parse("five"),
            Err(ProcessorError::ValueParse { column, .. }) if column == "a"
        ));
    }

    #[test]
    fn test_field_of_short_row_is_error() {
        let schema =
            Schema::from_columns([("a", ColumnType::Str), ("b", ColumnType::Int64)]).unwrap();
        let b = schema.resolve("b").unwrap();
        assert_eq!(b.field(&["x".to_string(), "7".to_string()]).unwrap(), "7");
        assert!(matches!(
            b.field(&["x".to_string()]),
            Err(ProcessorError::MissingField { column, position: 1, found: 1 }) if column == "b"
        ));
    }
}
