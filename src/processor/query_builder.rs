use indexmap::IndexMap;
use log::debug;

use crate::processor::{
    AggregateOp, ProcessorError, Row,
    aggregate::Aggregator,
    filter::{Filter, passes_all},
    schema::{ResolvedColumn, Schema},
    table::{Table, TableSource},
};

/// Group key (raw group-by values) to the raw values collected per aggregated column.
type Groups = IndexMap<Vec<String>, Vec<Vec<String>>>;

/// Output shape of a query, picked from which inputs are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// No grouping, no aggregation: matching rows are copied through
    Filter,
    /// Aggregations over all matching rows, one output row
    Aggregate,
    /// One output row per distinct group-by key
    GroupBy,
}

/// Collects textual query parts; [`QueryBuilder::build`] validates them all
/// against a schema before any row is read.
///
/// # Example
/// ```rust
/// # use tabular_processor::{infer_schema, AggregateOp, QueryBuilder, Table, TableFormat};
/// let csv = "name,age\nAlice,30\nBob,25\nCara,30\n";
/// let table = Table::from_reader(csv.as_bytes(), &TableFormat::default()).unwrap();
/// let schema = infer_schema(&table).unwrap();
///
/// let result = QueryBuilder::new()
///     .filter("age>20")
///     .group_by("age")
///     .aggregate("name", AggregateOp::Count)
///     .build(&schema)
///     .unwrap()
///     .execute(&table)
///     .unwrap();
/// assert_eq!(result.headers, vec!["age", "name_count"]);
/// assert_eq!(result.rows.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    filters: Vec<String>,
    group_by_columns: Vec<String>,
    aggregations: Vec<(String, AggregateOp)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter expression such as `age>=30`
    pub fn filter(mut self, expression: &str) -> Self {
        self.filters.push(expression.to_string());
        self
    }

    /// Add multiple filter expressions
    pub fn filters(mut self, expressions: Vec<&str>) -> Self {
        for expression in expressions {
            self.filters.push(expression.to_string());
        }
        self
    }

    /// Add a single group-by column
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by_columns.push(column.to_string());
        self
    }

    /// Add multiple group-by columns
    pub fn group_by_multi(mut self, columns: Vec<&str>) -> Self {
        for col in columns {
            self.group_by_columns.push(col.to_string());
        }
        self
    }

    /// Add an aggregation
    pub fn aggregate(mut self, column: &str, op: AggregateOp) -> Self {
        self.aggregations.push((column.to_string(), op));
        self
    }

    /// Add multiple aggregations at once
    pub fn aggregates(mut self, aggs: Vec<(&str, AggregateOp)>) -> Self {
        for (col, op) in aggs {
            self.aggregations.push((col.to_string(), op));
        }
        self
    }

    /// Resolves every filter, group-by column and aggregation against `schema`.
    ///
    /// # Errors
    /// The first construction error: [`ProcessorError::InvalidSyntax`],
    /// [`ProcessorError::UnknownColumn`], [`ProcessorError::TypeMismatch`] or
    /// [`ProcessorError::IncompatibleAggregation`].
    pub fn build(self, schema: &Schema) -> Result<Query, ProcessorError> {
        let filters = self
            .filters
            .iter()
            .map(|expression| Filter::parse(expression, schema))
            .collect::<Result<Vec<_>, _>>()?;

        let group_by = self
            .group_by_columns
            .iter()
            .map(|column| schema.resolve(column))
            .collect::<Result<Vec<_>, _>>()?;

        let aggregators = self
            .aggregations
            .iter()
            .map(|(column, op)| Aggregator::new(column, *op, schema))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Query::new(schema, filters, group_by, aggregators))
    }
}

/// A validated query, ready to stream a table once per [`Query::execute`].
#[derive(Debug, Clone)]
pub struct Query {
    source_headers: Vec<String>,
    filters: Vec<Filter>,
    group_by: Vec<ResolvedColumn>,
    aggregators: Vec<Aggregator>,
    /// Distinct aggregated columns; each group collects one value list per entry.
    value_columns: Vec<ResolvedColumn>,
    /// For each aggregator, its index into `value_columns`.
    value_slots: Vec<usize>,
}

impl Query {
    /// Assembles a query from parts already built against `schema`.
    pub fn new(
        schema: &Schema,
        filters: Vec<Filter>,
        group_by: Vec<ResolvedColumn>,
        aggregators: Vec<Aggregator>,
    ) -> Self {
        let mut value_columns: Vec<ResolvedColumn> = Vec::new();
        let mut value_slots = Vec::with_capacity(aggregators.len());

        for aggregator in &aggregators {
            let column = aggregator.column();
            let slot = match value_columns
                .iter()
                .position(|c| c.position == column.position)
            {
                Some(slot) => slot,
                None => {
                    value_columns.push(column.clone());
                    value_columns.len() - 1
                }
            };
            value_slots.push(slot);
        }

        Query {
            source_headers: schema.headers().to_vec(),
            filters,
            group_by,
            aggregators,
            value_columns,
            value_slots,
        }
    }

    pub fn shape(&self) -> QueryShape {
        match (self.group_by.is_empty(), self.aggregators.is_empty()) {
            (false, _) => QueryShape::GroupBy,
            (true, false) => QueryShape::Aggregate,
            (true, true) => QueryShape::Filter,
        }
    }

    /// Header of the table [`Query::execute`] produces.
    pub fn output_headers(&self) -> Vec<String> {
        match self.shape() {
            QueryShape::Filter => self.source_headers.clone(),
            QueryShape::Aggregate | QueryShape::GroupBy => self
                .group_by
                .iter()
                .map(|c| c.name.clone())
                .chain(self.aggregators.iter().map(|a| a.name().to_string()))
                .collect(),
        }
    }

    /// Streams `source` once: filter, then group and aggregate per the query shape.
    ///
    /// Any read, parse or aggregation error aborts the whole run; no partial
    /// table is returned.
    ///
    /// Groups are emitted in the order their keys first appeared.
    pub fn execute<S: TableSource + ?Sized>(&self, source: &S) -> Result<Table, ProcessorError> {
        let shape = self.shape();
        debug!(
            "executing {:?} query: {} filters, {} group-by columns, {} aggregations",
            shape,
            self.filters.len(),
            self.group_by.len(),
            self.aggregators.len()
        );

        let mut rows = source.rows()?;
        let header = rows.next().ok_or(ProcessorError::MissingHeader)??;
        if header != self.source_headers {
            return Err(ProcessorError::HeaderMismatch {
                expected: self.source_headers.clone(),
                found: header,
            });
        }

        let mut passed: Vec<Row> = Vec::new();
        let mut groups: Groups = IndexMap::new();
        if shape == QueryShape::Aggregate {
            // The single implicit group exists even when no row matches.
            groups.insert(Vec::new(), vec![Vec::new(); self.value_columns.len()]);
        }

        let mut scanned = 0usize;
        let mut matched = 0usize;
        for row in rows {
            let row = row?;
            scanned += 1;
            if row.len() != self.source_headers.len() {
                return Err(ProcessorError::RaggedRow {
                    row: scanned,
                    expected: self.source_headers.len(),
                    found: row.len(),
                });
            }

            if !passes_all(&self.filters, &row)? {
                continue;
            }
            matched += 1;

            match shape {
                QueryShape::Filter => passed.push(row),
                QueryShape::Aggregate | QueryShape::GroupBy => self.collect(&mut groups, &row)?,
            }
        }
        debug!("scanned {} rows, {} matched filters", scanned, matched);

        let rows = match shape {
            QueryShape::Filter => passed,
            QueryShape::Aggregate | QueryShape::GroupBy => {
                debug!("emitting {} groups", groups.len());
                self.emit(groups)?
            }
        };

        Ok(Table::new(self.output_headers(), rows))
    }

    fn collect(&self, groups: &mut Groups, row: &[String]) -> Result<(), ProcessorError> {
        let key = self
            .group_by
            .iter()
            .map(|c| c.field(row).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let values = groups
            .entry(key)
            .or_insert_with(|| vec![Vec::new(); self.value_columns.len()]);
        for (collected, column) in values.iter_mut().zip(&self.value_columns) {
            collected.push(column.field(row)?.to_string());
        }
        Ok(())
    }

    fn emit(&self, groups: Groups) -> Result<Vec<Row>, ProcessorError> {
        let mut out = Vec::with_capacity(groups.len());
        for (key, values) in groups {
            let mut record = key;
            record.reserve(self.aggregators.len());
            for (aggregator, &slot) in self.aggregators.iter().zip(&self.value_slots) {
                record.push(aggregator.evaluate(&values[slot])?.to_string());
            }
            out.push(record);
        }
        Ok(out)
    }
}
