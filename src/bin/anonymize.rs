//! Scrub identifying data from a captured device tree snapshot.

use anyhow::{Context, Result};
use clap::Parser;
use sagemcom2mqtt::anonymize::Anonymizer;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "anonymize",
    about = "Anonymize a Sagemcom snapshot so it can be shared as a test fixture"
)]
struct Args {
    /// Path to the input JSON file
    input_file: PathBuf,
    /// Output path; defaults to <input>.anonymized.json
    output_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let output_file = args.output_file.unwrap_or_else(|| {
        let mut path = args.input_file.clone();
        path.set_extension("anonymized.json");
        path
    });

    let text = std::fs::read_to_string(&args.input_file)
        .with_context(|| format!("failed to read {}", args.input_file.display()))?;
    let tree: Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", args.input_file.display()))?;

    let scrubbed = Anonymizer::new().anonymize(&tree);
    std::fs::write(&output_file, serde_json::to_string_pretty(&scrubbed)?)
        .with_context(|| format!("failed to write {}", output_file.display()))?;
    println!("Anonymized data written to {}", output_file.display());
    Ok(())
}
