//! Convert a delimited file into a spreadsheet
//!
//! Usage: cargo run --example csv_to_xlsx -- <input.csv> [delimiter] [output-dir]
//!
//! Set `RUST_LOG=debug` to see what the codec is doing.

use sheetcodec::{
    persist_artifact, read_delimited, write_spreadsheet, DirectoryStore, Record, RecordSet, Value,
    WriteOptions, WriteOutcome,
};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .ok_or("usage: csv_to_xlsx <input.csv> [delimiter] [output-dir]")?;
    let delimiter = args.next().unwrap_or_else(|| ",".to_string());
    let output_dir = args.next().unwrap_or_else(|| ".".to_string());

    println!("Converting {} to xlsx...\n", input);

    let records = read_delimited(&input, &delimiter)?;

    // The delimited reader returns text only; promote numeric fields for the sheet
    let typed: RecordSet = records
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|(name, value)| {
                    let value = match value.as_str().map(str::trim) {
                        Some(s) if !s.is_empty() && s.parse::<f64>().is_ok() => {
                            Value::Number(s.parse().unwrap_or_default())
                        }
                        _ => value.clone(),
                    };
                    (name.to_string(), value)
                })
                .collect::<Record>()
        })
        .collect();

    let stem = Path::new(&input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("converted")
        .to_string();

    match write_spreadsheet(&typed, &WriteOptions::default())? {
        WriteOutcome::Empty(message) => println!("{}", message),
        WriteOutcome::Written(artifact) => {
            let store = DirectoryStore::new(&output_dir);
            let path = persist_artifact(&store, &stem, &artifact)?;
            println!("Conversion complete!");
            println!("Records: {}", typed.len());
            println!("Output: {}", path.display());
        }
    }

    Ok(())
}
