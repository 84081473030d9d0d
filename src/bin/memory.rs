use std::env;

use tabular_processor::{AggregateOp, CsvTable, QueryBuilder, infer_schema};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _profiler = dhat::Profiler::new_heap();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "data/data_10m.csv".to_string());
    let source = CsvTable::new(path);

    let schema = infer_schema(&source)?;

    // Grouped state is the dominant allocation: one value list per group and column.
    let result = QueryBuilder::new()
        .filter("value>100")
        .group_by("category")
        .aggregate("value", AggregateOp::Sum)
        .aggregate("price", AggregateOp::Avg)
        .build(&schema)?
        .execute(&source)?;

    println!(
        "Memory benchmark finished ({} groups). See dhat-heap.json for details",
        result.row_count()
    );
    Ok(())
}
