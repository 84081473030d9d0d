//! # TabularProcessor
//!
//! `TabularProcessor` is a single-pass query engine for delimited text tables.
//! It supports:
//!
//! - Schema inference (int, float, string) from the whole table
//! - Typed filters written as `<column><op><value>`
//! - Group-by on any number of columns
//! - Aggregations: sum, avg, min, max, count, count distinct
//!
//! # Query shapes
//!
//! - **Filter**: no group-by, no aggregations. Matching rows are copied through.
//! - **Aggregate**: aggregations only. One row of results over all matching rows.
//! - **GroupBy**: one row per distinct group-by key, followed by its aggregations.
//!
//! # Example
//!
//! ```rust
//! use tabular_processor::{infer_schema, AggregateOp, QueryBuilder, Table, TableFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let csv = "name,age\nAlice,30\nBob,25\nCara,30\n";
//!     let table = Table::from_reader(csv.as_bytes(), &TableFormat::default())?;
//!
//!     // Infer column types
//!     let schema = infer_schema(&table)?;
//!
//!     // Filter rows
//!     let adults = QueryBuilder::new().filter("age>25").build(&schema)?.execute(&table)?;
//!     assert_eq!(adults.rows.len(), 2);
//!
//!     // Group by age and count names
//!     let grouped = QueryBuilder::new()
//!         .group_by("age")
//!         .aggregate("name", AggregateOp::Count)
//!         .build(&schema)?
//!         .execute(&table)?;
//!     for row in &grouped.rows {
//!         println!("age {} => {}", row[0], row[1]);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
mod helpers;
pub mod processor;

pub use processor::{
    AggregateOp, CompareOp, ProcessorError, Row, Value,
    aggregate::Aggregator,
    column::ColumnType,
    filter::Filter,
    query_builder::{Query, QueryBuilder, QueryShape},
    schema::{ColumnInfo, ResolvedColumn, Schema, infer_schema},
    table::{CsvTable, CsvTableWriter, Table, TableFormat, TableSink, TableSource},
};
