//! Run the extractor over a captured device tree snapshot.
//!
//! Prints the resulting metric record as JSON, in the exact shape the
//! regression fixtures expect, so its output can be saved next to the
//! snapshot as the expected result.

use anyhow::{Context, Result};
use clap::Parser;
use sagemcom2mqtt::extract::extract;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "parse-file",
    about = "Parse a captured Sagemcom JSON snapshot and print the extracted metric record"
)]
struct Args {
    /// Path to the captured snapshot (e.g. modems/FAST3896.json)
    input_file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let text = std::fs::read_to_string(&args.input_file)
        .with_context(|| format!("failed to read {}", args.input_file.display()))?;
    let tree: Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", args.input_file.display()))?;

    let record = extract(&tree).context("extraction failed")?;
    println!("{}", serde_json::to_string_pretty(&record.to_json())?);
    Ok(())
}
