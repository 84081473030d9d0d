use std::io;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;

use crate::processor::{
    AggregateOp, ProcessorError,
    aggregate::Aggregator,
    filter::Filter,
    query_builder::Query,
    schema::infer_schema,
    table::{CsvTable, CsvTableWriter, Table, TableFormat, TableSink, TableSource},
};

/// Command-line surface of the `tabular-processor` binary.
#[derive(Parser, Debug)]
#[command(name = "tabular-processor")]
#[command(about = "Filter, group and aggregate CSV data in a single pass")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a CSV file, filter rows, group them and compute aggregations
    Parse(ParseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Input file ('-' reads standard input)
    #[arg(short, long)]
    pub input: String,

    /// Output file ('-' writes standard output)
    #[arg(short, long)]
    pub output: String,

    /// Filters in the format "<column><op><value>", repeatable or comma separated.
    /// Operations: =, !=, >, >=, <, <=
    #[arg(short = 'f', long = "filter", value_delimiter = ',')]
    pub filters: Vec<String>,

    /// Columns to group by, in output order
    #[arg(short = 'g', long = "group-by", value_delimiter = ',')]
    pub group_by: Vec<String>,

    /// Columns for 'sum' aggregation
    #[arg(short = 's', long, value_delimiter = ',')]
    pub sum: Vec<String>,

    /// Columns for 'avg' aggregation
    #[arg(short = 'a', long, value_delimiter = ',')]
    pub avg: Vec<String>,

    /// Columns for 'max' aggregation
    #[arg(short = 'M', long, value_delimiter = ',')]
    pub max: Vec<String>,

    /// Columns for 'min' aggregation
    #[arg(short = 'm', long, value_delimiter = ',')]
    pub min: Vec<String>,

    /// Columns for 'count' aggregation
    #[arg(short = 'c', long, value_delimiter = ',')]
    pub count: Vec<String>,

    /// Columns for 'count distinct' aggregation
    #[arg(short = 'C', long, value_delimiter = ',')]
    pub countd: Vec<String>,

    /// Field delimiter of input and output
    #[arg(short = 'd', long, default_value_t = ',')]
    pub delimiter: char,
}

impl ParseArgs {
    fn table_format(&self) -> Result<TableFormat> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter must be a single ASCII character, got '{}'", self.delimiter);
        }
        Ok(TableFormat::with_delimiter(self.delimiter as u8))
    }

    /// Requested aggregations, grouped by kind: sum, avg, max, min, count, countd.
    fn aggregation_requests(&self) -> impl Iterator<Item = (AggregateOp, &str)> {
        [
            (AggregateOp::Sum, &self.sum),
            (AggregateOp::Avg, &self.avg),
            (AggregateOp::Max, &self.max),
            (AggregateOp::Min, &self.min),
            (AggregateOp::Count, &self.count),
            (AggregateOp::CountDistinct, &self.countd),
        ]
        .into_iter()
        .flat_map(|(op, columns)| columns.iter().map(move |c| (op, c.as_str())))
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse(args) => parse(&args),
    }
}

fn parse(args: &ParseArgs) -> Result<()> {
    let format = args.table_format()?;

    if args.input == "-" {
        let table = Table::from_reader(io::stdin().lock(), &format)
            .context("Error reading standard input")?;
        process(&table, args, &format)
    } else {
        let table = CsvTable::new(&args.input).with_format(format);
        process(&table, args, &format)
    }
}

fn process<S: TableSource + ?Sized>(
    source: &S,
    args: &ParseArgs,
    format: &TableFormat,
) -> Result<()> {
    info!("Parsing file structure...");
    let schema = infer_schema(source).context("Error parsing csv structure")?;

    let mut filters = Vec::with_capacity(args.filters.len());
    if !args.filters.is_empty() {
        info!("Parsing filters...");
        for expression in &args.filters {
            let filter = Filter::parse(expression, &schema)
                .with_context(|| format!("Filter '{}' parsing error", expression))?;
            filters.push(filter);
        }
    }

    let mut group_by = Vec::with_capacity(args.group_by.len());
    for column in &args.group_by {
        let resolved = schema
            .resolve(column)
            .with_context(|| format!("Group-by column '{}' error", column))?;
        group_by.push(resolved);
    }

    let mut aggregators = Vec::new();
    let mut requests = args.aggregation_requests().peekable();
    if requests.peek().is_some() {
        info!("Parsing aggregations...");
        for (op, column) in requests {
            let aggregator = Aggregator::new(column, op, &schema)
                .with_context(|| format!("Aggregation {}('{}') parsing error", op, column))?;
            aggregators.push(aggregator);
        }
    }

    let query = Query::new(&schema, filters, group_by, aggregators);

    info!("Parsing file...");
    let result = query.execute(source).context("Error parsing csv file")?;

    info!("Saving processed data...");
    write_output(&result, &args.output, format).context("Error saving csv file")?;

    info!("CSV data was processed correctly ({} rows)", result.row_count());
    Ok(())
}

fn write_output(table: &Table, output: &str, format: &TableFormat) -> Result<(), ProcessorError> {
    if output == "-" {
        CsvTableWriter::from_writer(io::stdout().lock(), format).write_table(table)
    } else {
        CsvTableWriter::create(output, format)?.write_table(table)
    }
}
