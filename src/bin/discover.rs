//! Dump a subtree of the modem's device tree as JSON.
//!
//! Exploration tool for finding candidate paths on a new model: log in
//! with the usual MODEM_* environment variables and print whatever lives
//! under the given xpath.

use anyhow::{Context, Result};
use clap::Parser;
use sagemcom2mqtt::config::Settings;
use sagemcom2mqtt::transport::SagemcomClient;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "discover",
    about = "Explore the modem API: fetch and print the subtree at an xpath"
)]
struct Args {
    /// Starting xpath
    #[arg(default_value = "Device")]
    xpath: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = Settings::from_env().context("invalid configuration")?;
    let client = SagemcomClient::new(&settings.modem).context("failed to build modem client")?;

    let value = client
        .get_value(&args.xpath)
        .await
        .with_context(|| format!("failed to fetch xpath {}", args.xpath))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
