//! Home Assistant MQTT discovery
//!
//! When a discovery prefix is configured, one sensor config payload per
//! metric is published under `{prefix}/sensor/{serial}/{object_id}/config`.
//! Descriptors are metadata, not telemetry: they are retained without
//! expiry and emitted once per device identity. The cache is owned by the
//! scheduler and only invalidates when the serial number changes (e.g.
//! after a modem swap or factory reset).

use crate::config::Settings;
use crate::extract::DeviceIdentity;
use crate::publish::{state_topic, Message};
use crate::schema::{self, FieldSpec};
use serde_json::json;
use tracing::info;

/// Per-identity emission cache, keyed by serial number.
#[derive(Debug, Default)]
pub struct DiscoveryCache {
    serial: Option<String>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors for this identity, or None if discovery is disabled or
    /// they were already emitted for the same serial. This does not record
    /// the emission: callers commit via `mark_emitted` once every
    /// descriptor actually reached the bus, so a failed publish leaves the
    /// full set pending for the next cycle.
    pub fn messages_for(
        &self,
        identity: &DeviceIdentity,
        settings: &Settings,
    ) -> Option<Vec<Message>> {
        let prefix = settings.discovery_prefix.as_deref()?;
        if self.serial.as_deref() == Some(identity.serial_number.as_str()) {
            return None;
        }
        if self.serial.is_some() {
            info!(
                serial = %identity.serial_number,
                "device identity changed, re-publishing discovery config"
            );
        }
        Some(build_descriptors(prefix, identity, settings))
    }

    /// Record that the descriptors for this identity are on the bus.
    pub fn mark_emitted(&mut self, identity: &DeviceIdentity) {
        self.serial = Some(identity.serial_number.clone());
    }
}

/// Build the full descriptor set for one device identity. Pure and static:
/// everything derives from the schema table and the identity.
pub fn build_descriptors(
    prefix: &str,
    identity: &DeviceIdentity,
    settings: &Settings,
) -> Vec<Message> {
    let serial = &identity.serial_number;

    let device_payload = json!({
        "identifiers": [serial],
        "name": identity.display_name(),
        "manufacturer": identity.manufacturer,
        "model": identity.model_number,
        "sw_version": identity.software_version,
        "hw_version": identity.hardware_version,
    });
    let origin_payload = json!({
        "name": "sagemcom2mqtt",
        "sw_version": env!("CARGO_PKG_VERSION"),
    });

    schema::FIELDS
        .iter()
        .map(|spec| {
            descriptor(
                prefix,
                serial,
                spec,
                settings,
                &device_payload,
                &origin_payload,
            )
        })
        .collect()
}

fn descriptor(
    prefix: &str,
    serial: &str,
    spec: &FieldSpec,
    settings: &Settings,
    device_payload: &serde_json::Value,
    origin_payload: &serde_json::Value,
) -> Message {
    let object_id = spec.object_id();
    // Stable across restarts: the hub keys entity registration on this.
    let unique_id = format!("{serial}_{object_id}");

    let mut payload = json!({
        "name": format!("Sagemcom {}", spec.label),
        "state_topic": state_topic(&settings.base_topic, serial, spec.slug),
        "unique_id": unique_id,
        "device": device_payload,
        "origin": origin_payload,
        "availability_topic": state_topic(&settings.base_topic, serial, "status"),
        "payload_available": "OPERATIONAL",
        // the modem never reports an offline state itself; expiry handles it
        "payload_not_available": "OFFLINE",
        "expire_after": settings.message_expiry_secs,
    });
    if let serde_json::Value::Object(map) = &mut payload {
        if let Some(unit) = spec.unit {
            map.insert("unit_of_measurement".to_string(), json!(unit));
        }
        if let Some(class) = spec.device_class {
            map.insert("device_class".to_string(), json!(class));
        }
        if let Some(class) = spec.state_class {
            map.insert("state_class".to_string(), json!(class));
        }
        if let Some(icon) = spec.icon {
            map.insert("icon".to_string(), json!(icon));
        }
    }

    Message {
        topic: format!("{prefix}/sensor/{serial}/{object_id}/config"),
        payload: payload.to_string(),
        retained: true,
        expiry_seconds: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;
    use serde_json::Value;

    fn identity() -> DeviceIdentity {
        DeviceIdentity {
            serial_number: "JW360000112233".to_string(),
            mac_address: Some("A4:12:42:00:11:22".to_string()),
            manufacturer: Some("Sagemcom".to_string()),
            model_number: Some("FAST3896".to_string()),
            hardware_version: Some("1.0".to_string()),
            software_version: Some("FAST3896_SIP_50.10".to_string()),
        }
    }

    #[test]
    fn descriptors_cover_every_metric() {
        let settings = test_settings();
        let messages = build_descriptors("homeassistant", &identity(), &settings);
        assert_eq!(messages.len(), schema::FIELDS.len());
        for message in &messages {
            assert!(message.retained);
            assert_eq!(message.expiry_seconds, None);
            assert!(message.topic.starts_with("homeassistant/sensor/JW360000112233/"));
            assert!(message.topic.ends_with("/config"));
        }
    }

    #[test]
    fn state_topic_matches_publisher_rule() {
        let settings = test_settings();
        let messages = build_descriptors("homeassistant", &identity(), &settings);
        let payload: Value =
            serde_json::from_str(&messages[0].payload).unwrap();
        assert_eq!(
            payload["state_topic"],
            state_topic(&settings.base_topic, "JW360000112233", schema::FIELDS[0].slug)
        );
        assert_eq!(payload["unique_id"], "JW360000112233_status");
        assert_eq!(payload["availability_topic"], "sagemcom/docsis/JW360000112233/status");
        assert_eq!(payload["expire_after"], 120);
        assert_eq!(payload["device"]["name"], "Sagemcom FAST3896");
    }

    #[test]
    fn unit_and_class_metadata_come_from_the_schema() {
        let settings = test_settings();
        let messages = build_descriptors("homeassistant", &identity(), &settings);
        let avg = messages
            .iter()
            .find(|m| m.topic.contains("downstream_power_avg_dbmv"))
            .unwrap();
        let payload: Value = serde_json::from_str(&avg.payload).unwrap();
        assert_eq!(payload["unit_of_measurement"], "dBmV");
        assert_eq!(payload["device_class"], "signal_strength");
        assert_eq!(payload["state_class"], "measurement");
    }

    #[test]
    fn cache_emits_once_per_identity() {
        let settings = test_settings();
        let mut cache = DiscoveryCache::new();
        let id = identity();

        assert!(cache.messages_for(&id, &settings).is_some());
        cache.mark_emitted(&id);
        for _ in 0..10 {
            assert!(cache.messages_for(&id, &settings).is_none());
        }
    }

    #[test]
    fn unmarked_emission_stays_pending() {
        let settings = test_settings();
        let cache = DiscoveryCache::new();
        let id = identity();

        // the emission is only committed via mark_emitted; until then the
        // descriptors keep being offered (a failed publish must retry)
        assert!(cache.messages_for(&id, &settings).is_some());
        assert!(cache.messages_for(&id, &settings).is_some());
    }

    #[test]
    fn cache_invalidates_on_identity_change() {
        let settings = test_settings();
        let mut cache = DiscoveryCache::new();
        let first = identity();
        let mut second = identity();
        second.serial_number = "JW360000445566".to_string();

        assert!(cache.messages_for(&first, &settings).is_some());
        cache.mark_emitted(&first);
        let reissued = cache.messages_for(&second, &settings).unwrap();
        assert!(reissued[0].topic.contains("JW360000445566"));
        cache.mark_emitted(&second);
        assert!(cache.messages_for(&second, &settings).is_none());
    }

    #[test]
    fn disabled_discovery_emits_nothing() {
        let mut settings = test_settings();
        settings.discovery_prefix = None;
        let cache = DiscoveryCache::new();
        assert!(cache.messages_for(&identity(), &settings).is_none());
    }
}
