//! Runtime configuration
//!
//! Everything comes from environment variables (a `.env` file is honored in
//! the binaries via dotenvy). The MQTT destination is optional: leaving
//! `MQTT_HOSTNAME` unset selects one-shot diagnostic mode at startup.

use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_BASE_TOPIC: &str = "sagemcom/docsis";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },
}

/// Hash algorithm used by the modem's login challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMethod {
    Md5,
    Sha512,
}

impl FromStr for EncryptionMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(EncryptionMethod::Md5),
            "SHA512" => Ok(EncryptionMethod::Sha512),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModemSettings {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub encryption: EncryptionMethod,
    pub ssl: bool,
}

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub modem: ModemSettings,
    /// None selects one-shot diagnostic mode.
    pub mqtt: Option<MqttSettings>,
    pub poll_interval_secs: u64,
    /// MQTT v5 message expiry for telemetry; default 4x the poll interval
    /// so a value goes stale after four missed cycles.
    pub message_expiry_secs: u32,
    pub base_topic: String,
    /// Setting this enables Home Assistant discovery publication.
    pub discovery_prefix: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source; tests inject a map here.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };

        let encryption = match lookup("MODEM_ENCRYPTION") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidVar {
                    name: "MODEM_ENCRYPTION",
                    value: raw,
                })?,
            None => EncryptionMethod::Sha512,
        };

        let modem = ModemSettings {
            hostname: required("MODEM_HOSTNAME")?,
            username: required("MODEM_USERNAME")?,
            password: required("MODEM_PASSWORD")?,
            encryption,
            ssl: parse_or("MODEM_SSL", true, &lookup)?,
        };

        let mqtt = match lookup("MQTT_HOSTNAME").filter(|v| !v.is_empty()) {
            Some(hostname) => Some(MqttSettings {
                hostname,
                port: parse_or("MQTT_PORT", DEFAULT_MQTT_PORT, &lookup)?,
                username: lookup("MQTT_USERNAME"),
                password: lookup("MQTT_PASSWORD"),
            }),
            None => None,
        };

        let poll_interval_secs = parse_or("POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS, &lookup)?;
        let message_expiry_secs = parse_or(
            "MESSAGE_EXPIRY",
            (poll_interval_secs * 4) as u32,
            &lookup,
        )?;

        Ok(Settings {
            modem,
            mqtt,
            poll_interval_secs,
            message_expiry_secs,
            base_topic: lookup("MQTT_TOPIC").unwrap_or_else(|| DEFAULT_BASE_TOPIC.to_string()),
            discovery_prefix: lookup("HOMEASSISTANT_DISCOVERY_PREFIX").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    default: T,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Canned settings for unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        modem: ModemSettings {
            hostname: "192.168.100.1".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            encryption: EncryptionMethod::Sha512,
            ssl: true,
        },
        mqtt: None,
        poll_interval_secs: 30,
        message_expiry_secs: 120,
        base_topic: "sagemcom/docsis".to_string(),
        discovery_prefix: Some("homeassistant".to_string()),
    }
}
