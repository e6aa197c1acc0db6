//! Mapping metric records onto bus messages
//!
//! One message per present metric, namespaced by device serial. Telemetry
//! is retained (late subscribers get the last snapshot immediately) and
//! expires after the configured interval so a dead bridge reads as stale
//! rather than frozen. Absent fields publish nothing at all: consumers keep
//! their last-known value instead of seeing a false null.

use crate::config::Settings;
use crate::extract::MetricRecord;

/// One publish operation, ready for the bus client.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub retained: bool,
    /// MQTT v5 message expiry; None for metadata that should never expire.
    pub expiry_seconds: Option<u32>,
}

/// Topic shared between telemetry and discovery state references. Keeping
/// this in one place guarantees the two always agree.
pub fn state_topic(base_topic: &str, serial: &str, slug: &str) -> String {
    format!("{base_topic}/{serial}/{slug}")
}

/// Build the ordered publish set for one metric record.
pub fn build_messages(record: &MetricRecord, settings: &Settings) -> Vec<Message> {
    let serial = &record.identity.serial_number;
    record
        .iter()
        .filter_map(|(spec, value)| {
            value.render().map(|payload| Message {
                topic: state_topic(&settings.base_topic, serial, spec.slug),
                payload,
                retained: true,
                expiry_seconds: Some(settings.message_expiry_secs),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use crate::extract::extract;
    use serde_json::json;

    fn sample_tree() -> serde_json::Value {
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

    #[test]
    fn topics_are_namespaced_by_serial_and_slug() {
        let record = extract(&sample_tree()).unwrap();
        let messages = build_messages(&record, &test_settings());

        let status = messages
            .iter()
            .find(|m| m.topic.ends_with("/status"))
            .unwrap();
        assert_eq!(status.topic, "sagemcom/docsis/JW360000112233/status");
        assert_eq!(status.payload, "OPERATIONAL");
        assert!(status.retained);
        assert_eq!(status.expiry_seconds, Some(120));
    }

    #[test]
    fn absent_fields_publish_nothing() {
        let record = extract(&sample_tree()).unwrap();
        let messages = build_messages(&record, &test_settings());

        // empty upstream array: count publishes as 0, aggregates do not
        let count = messages
            .iter()
            .find(|m| m.topic.ends_with("upstream/channels"))
            .unwrap();
        assert_eq!(count.payload, "0");
        assert!(!messages
            .iter()
            .any(|m| m.topic.contains("upstream/power")));
        // no system metrics in this snapshot
        assert!(!messages.iter().any(|m| m.topic.contains("system/")));
    }

    #[test]
    fn messages_follow_schema_order() {
        let record = extract(&sample_tree()).unwrap();
        let messages = build_messages(&record, &test_settings());
        let order: Vec<_> = record
            .iter()
            .filter(|(_, v)| !v.is_absent())
            .map(|(spec, _)| state_topic("sagemcom/docsis", "JW360000112233", spec.slug))
            .collect();
        let actual: Vec<_> = messages.iter().map(|m| m.topic.clone()).collect();
        assert_eq!(actual, order);
    }
}
