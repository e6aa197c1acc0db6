//! Polling scheduler
//!
//! Continuous mode drives fetch -> extract -> publish on a fixed interval,
//! measured start-to-start so processing time does not drift the schedule.
//! Any failure inside a cycle is logged and the cycle abandoned; the next
//! interval simply tries again, there is no intra-interval retry. Shutdown
//! is cooperative and takes effect at the sleeping boundary, so an
//! in-flight cycle always publishes a complete metric set or nothing.

use crate::bus::MessageSink;
use crate::config::Settings;
use crate::discovery::DiscoveryCache;
use crate::extract::{extract, MetricRecord};
use crate::publish::build_messages;
use crate::transport::DeviceTransport;
use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

pub struct Poller<T, S> {
    transport: T,
    sink: S,
    settings: Settings,
    discovery: DiscoveryCache,
}

impl<T: DeviceTransport, S: MessageSink> Poller<T, S> {
    pub fn new(transport: T, sink: S, settings: Settings) -> Self {
        Self {
            transport,
            sink,
            settings,
            discovery: DiscoveryCache::new(),
        }
    }

    /// Continuous mode. Runs until `shutdown` resolves; the signal is only
    /// honored between cycles.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(Duration::from_secs(self.settings.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval = self.settings.poll_interval_secs,
            base_topic = %self.settings.base_topic,
            "starting poll loop"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        // fault isolation: log, drop the cycle, wait for the next tick
                        error!("poll cycle failed: {e:#}");
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping poll loop");
                    break;
                }
            }
        }
    }

    async fn cycle(&mut self) -> Result<()> {
        let tree = self.transport.fetch().await.context("device fetch failed")?;
        let record = extract(&tree).context("extraction failed")?;

        if let Some(descriptors) = self.discovery.messages_for(&record.identity, &self.settings) {
            for message in &descriptors {
                self.sink
                    .publish(message)
                    .await
                    .context("discovery publish failed")?;
            }
            // commit only now: a failed publish above leaves the set
            // pending, so the next cycle sends the descriptors again
            self.discovery.mark_emitted(&record.identity);
            info!(
                serial = %record.identity.serial_number,
                "published {} discovery descriptors", descriptors.len()
            );
        }

        let messages = build_messages(&record, &self.settings);
        for message in &messages {
            self.sink
                .publish(message)
                .await
                .context("telemetry publish failed")?;
        }
        info!(
            serial = %record.identity.serial_number,
            "published {} metrics", messages.len()
        );
        Ok(())
    }
}

/// One-shot diagnostic mode: a single fetch and extraction, no bus.
pub async fn run_once<T: DeviceTransport>(transport: &T) -> Result<MetricRecord> {
    let tree = transport.fetch().await.context("device fetch failed")?;
    let record = extract(&tree).context("extraction failed")?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::publish::Message;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct StubTransport {
        tree: Value,
    }

    #[async_trait]
    impl DeviceTransport for StubTransport {
        async fn fetch(&self) -> Result<Value, TransportError> {
            if self.tree.is_null() {
                Err(TransportError::Auth("login rejected".to_string()))
            } else {
                Ok(self.tree.clone())
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl MessageSink for &RecordingSink {
        async fn publish(&self, message: &Message) -> Result<()> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn sample_tree() -> Value {
        json!({
            "device": {
                "device_info": {"serial_number": "JW360000112233"},
                "docsis": {
                    "cable_modem": {
                        "status": "OPERATIONAL",
                        "downstreams": [
                            {"power_level": "-2.1", "SNR": 38},
                            {"power_level": "-1.0", "SNR": 40}
                        ],
                        "upstreams": []
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn discovery_publishes_once_across_cycles() {
        let sink = RecordingSink::default();
        let transport = StubTransport {
            tree: sample_tree(),
        };
        let mut poller = Poller::new(transport, &sink, test_settings());

        poller.cycle().await.unwrap();
        let after_first = sink.messages.lock().unwrap().len();
        poller.cycle().await.unwrap();
        poller.cycle().await.unwrap();
        let total = sink.messages.lock().unwrap().len();

        let discovery_count = sink
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic.starts_with("homeassistant/"))
            .count();
        assert_eq!(discovery_count, crate::schema::FIELDS.len());
        // cycles two and three publish telemetry only
        let telemetry_per_cycle = after_first - discovery_count;
        assert_eq!(total, after_first + 2 * telemetry_per_cycle);
    }

    struct FlakySink {
        messages: Mutex<Vec<Message>>,
        failures_left: Mutex<u32>,
    }

    #[async_trait]
    impl MessageSink for &FlakySink {
        async fn publish(&self, message: &Message) -> Result<()> {
            {
                let mut left = self.failures_left.lock().unwrap();
                if *left > 0 {
                    *left -= 1;
                    anyhow::bail!("broker unavailable");
                }
            }
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_discovery_publish_is_retried_next_cycle() {
        let sink = FlakySink {
            messages: Mutex::new(Vec::new()),
            failures_left: Mutex::new(1),
        };
        let transport = StubTransport {
            tree: sample_tree(),
        };
        let mut poller = Poller::new(transport, &sink, test_settings());

        // first cycle dies on the very first descriptor publish
        assert!(poller.cycle().await.is_err());
        assert!(sink.messages.lock().unwrap().is_empty());

        // the emission was never committed, so the next cycle sends the
        // complete descriptor set before its telemetry
        poller.cycle().await.unwrap();
        let discovery_count = sink
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic.starts_with("homeassistant/"))
            .count();
        assert_eq!(discovery_count, crate::schema::FIELDS.len());

        // and once on the bus, a further cycle publishes telemetry only
        poller.cycle().await.unwrap();
        let final_discovery_count = sink
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic.starts_with("homeassistant/"))
            .count();
        assert_eq!(final_discovery_count, crate::schema::FIELDS.len());
    }

    #[tokio::test]
    async fn missing_serial_publishes_nothing() {
        let sink = RecordingSink::default();
        let transport = StubTransport {
            tree: json!({"device": {"docsis": {"cable_modem": {}}}}),
        };
        let mut poller = Poller::new(transport, &sink, test_settings());

        assert!(poller.cycle().await.is_err());
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_aborts_cycle() {
        let sink = RecordingSink::default();
        let transport = StubTransport { tree: Value::Null };
        let mut poller = Poller::new(transport, &sink, test_settings());

        assert!(poller.cycle().await.is_err());
        assert!(sink.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_once_returns_the_record_without_publishing() {
        let transport = StubTransport {
            tree: sample_tree(),
        };
        let record = run_once(&transport).await.unwrap();
        assert_eq!(record.identity.serial_number, "JW360000112233");

        let transport = StubTransport { tree: Value::Null };
        assert!(run_once(&transport).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let sink = RecordingSink::default();
        let transport = StubTransport {
            tree: sample_tree(),
        };
        let mut poller = Poller::new(transport, &sink, test_settings());
        // already-resolved shutdown: the loop must exit promptly
        poller.run(std::future::ready(())).await;
    }
}
