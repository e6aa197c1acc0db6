//! sagemcom2mqtt - Sagemcom DOCSIS modem telemetry bridge
//!
//! Continuous mode (MQTT_HOSTNAME set): poll the modem on a fixed interval
//! and republish normalized metrics as retained, expiring MQTT topics,
//! with optional Home Assistant discovery.
//! One-shot mode (MQTT_HOSTNAME unset): a single fetch and extraction,
//! printed to stdout, exiting nonzero on failure.

use anyhow::{Context, Result};
use sagemcom2mqtt::bus::MqttPublisher;
use sagemcom2mqtt::config::Settings;
use sagemcom2mqtt::poller::{self, Poller};
use sagemcom2mqtt::transport::SagemcomClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // LOG_LEVEL mirrors the container convention; RUST_LOG wins if set
    let default_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},rumqttc=warn")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env().context("invalid configuration")?;
    let transport =
        SagemcomClient::new(&settings.modem).context("failed to build modem client")?;

    match settings.mqtt.clone() {
        Some(mqtt) => {
            info!(
                broker = %mqtt.hostname,
                port = mqtt.port,
                "starting continuous mode"
            );
            let publisher = MqttPublisher::connect(&mqtt);
            let mut poller = Poller::new(transport, publisher.clone(), settings);
            poller
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
            publisher.disconnect().await;
        }
        None => {
            info!("MQTT_HOSTNAME not set, running one-shot diagnostic");
            let record = poller::run_once(&transport).await?;
            println!("{}", serde_json::to_string_pretty(&record.to_json())?);
        }
    }

    Ok(())
}
