use rand::Rng;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Writes a synthetic table for benchmarks and profiling.
///
/// Usage: `data_generator [path] [rows]`
fn main() -> std::io::Result<()> {
    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/data_10m.csv".to_string());
    let rows: usize = args
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(10_000_000);

    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "id,value,price,category,region")?;

    let mut rng = rand::rng();
    for i in 0..rows {
        let value = rng.random_range(1..1000);
        let price = rng.random_range(0.0..500.0f64);
        let category = ['A', 'B', 'C', 'D'][rng.random_range(0..4)];
        let region =
            ["US", "EU", "ASIA", "AFRICA", "AUSTRALIA", "SOUTH AMERICA"][rng.random_range(0..6)];
        writeln!(writer, "{},{},{:.2},{},{}", i, value, price, category, region)?;
    }
    writer.flush()?;

    println!("Sample CSV generated: {} ({} rows)", path, rows);
    Ok(())
}
