//! MQTT bus client
//!
//! Thin wrapper over rumqttc's v5 client: message expiry rides on MQTT 5
//! publish properties. The event loop runs in a background task; reconnect
//! policy stays with rumqttc, this module only publishes what the pipeline
//! hands it.

use crate::config::MqttSettings;
use crate::publish::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::v5::PublishProperties;
use rumqttc::v5::mqttbytes::QoS;
use rumqttc::v5::{AsyncClient, MqttOptions};
use std::time::Duration;
use tokio::task;
use tracing::{debug, error};

/// Destination for publish operations; the poller only sees this trait.
#[async_trait]
pub trait MessageSink {
    async fn publish(&self, message: &Message) -> Result<()>;
}

#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect and spawn the event loop. Connection errors surface in the
    /// background task log; rumqttc retries on its own.
    pub fn connect(settings: &MqttSettings) -> Self {
        let client_id = format!("sagemcom2mqtt-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, &settings.hostname, settings.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let Some(username) = &settings.username {
            options.set_credentials(username, settings.password.clone().unwrap_or_default());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        task::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!(?event, "mqtt event"),
                    Err(e) => {
                        error!("MQTT connection error: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        });

        Self { client }
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            error!("MQTT disconnect failed: {e}");
        }
    }
}

#[async_trait]
impl MessageSink for MqttPublisher {
    async fn publish(&self, message: &Message) -> Result<()> {
        let properties = PublishProperties {
            message_expiry_interval: message.expiry_seconds,
            ..Default::default()
        };
        self.client
            .publish_with_properties(
                message.topic.clone(),
                QoS::AtLeastOnce,
                message.retained,
                message.payload.clone(),
                properties,
            )
            .await
            .with_context(|| format!("failed to publish to {}", message.topic))
    }
}
