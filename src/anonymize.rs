//! Snapshot anonymizer
//!
//! Captured device trees are the raw material for regression fixtures, but
//! they are full of identifiers nobody should post on an issue tracker.
//! This scrubs serial numbers, credentials, SSIDs, MAC and IPv4 addresses
//! while keeping replacements consistent within one file, so cross
//! references inside the tree still line up after scrubbing.

use rand::Rng;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

const WITTY_SSIDS: &[&str] = &[
    "Tell my WiFi love her",
    "Pretty Fly for a Wi-Fi",
    "The LAN Before Time",
    "Searching...",
    "Get off my LAN",
];

pub struct Anonymizer {
    mac_pattern: Regex,
    ipv4_pattern: Regex,
    fake_serial: String,
    /// original -> replacement, shared across the whole tree
    replacements: HashMap<String, String>,
}

impl Default for Anonymizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Anonymizer {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let digits: String = (0..12).map(|_| rng.gen_range(0..10).to_string()).collect();
        Self {
            mac_pattern: Regex::new(r"\b(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}\b")
                .expect("static regex"),
            ipv4_pattern: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("static regex"),
            fake_serial: format!("JW{digits}"),
            replacements: HashMap::new(),
        }
    }

    /// Anonymize a whole tree, recursing through objects and arrays.
    pub fn anonymize(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, v)| {
                        let inner = self.anonymize(v);
                        (key.clone(), self.anonymize_field(key, inner))
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.anonymize(v)).collect()),
            other => other.clone(),
        }
    }

    fn anonymize_field(&mut self, key: &str, value: Value) -> Value {
        let Value::String(text) = &value else {
            return value;
        };
        if text.is_empty() {
            return value;
        }

        let key_lower = key.to_ascii_lowercase();
        // version strings look like addresses to the regexes; leave them
        if key_lower.contains("version") || key_lower.contains("ssid_reference") {
            return value;
        }
        if key_lower == "serial_number" {
            return Value::String(self.fake_serial.clone());
        }
        if key_lower.contains("password") || key_lower.contains("passphrase") {
            let mut rng = rand::thread_rng();
            let scrambled: String = (0..12)
                .map(|_| {
                    let chars = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
                    let i = rng.gen_range(0..chars.len());
                    chars.as_bytes()[i] as char
                })
                .collect();
            return Value::String(scrambled);
        }
        if key_lower == "ssid" {
            return Value::String(self.replace_ssid(text));
        }

        let scrubbed = self.scrub_text(text);
        Value::String(scrubbed)
    }

    fn scrub_text(&mut self, text: &str) -> String {
        // two passes: MACs first so their hex pairs never match as IPs
        let pass = self
            .mac_pattern
            .clone()
            .replace_all(text, |caps: &Captures| self.replace_mac(&caps[0]))
            .into_owned();
        self.ipv4_pattern
            .clone()
            .replace_all(&pass, |caps: &Captures| self.replace_ipv4(&caps[0]))
            .into_owned()
    }

    fn replace_ssid(&mut self, original: &str) -> String {
        if let Some(existing) = self.replacements.get(original) {
            return existing.clone();
        }
        let mut rng = rand::thread_rng();
        let pick = WITTY_SSIDS[rng.gen_range(0..WITTY_SSIDS.len())].to_string();
        self.replacements.insert(original.to_string(), pick.clone());
        pick
    }

    /// Keep the vendor prefix, randomize the device half.
    fn replace_mac(&mut self, original: &str) -> String {
        if let Some(existing) = self.replacements.get(original) {
            return existing.clone();
        }
        let separator = original.as_bytes()[2] as char;
        let parts: Vec<&str> = original.split(separator).collect();
        let mut rng = rand::thread_rng();
        let replacement = format!(
            "{}{sep}{}{sep}{}{sep}{:02X}{sep}{:02X}{sep}{:02X}",
            parts[0].to_uppercase(),
            parts[1].to_uppercase(),
            parts[2].to_uppercase(),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            sep = separator,
        );
        self.replacements
            .insert(original.to_string(), replacement.clone());
        replacement
    }

    fn replace_ipv4(&mut self, original: &str) -> String {
        if let Some(existing) = self.replacements.get(original) {
            return existing.clone();
        }
        let octets: Vec<u8> = match original.split('.').map(str::parse).collect() {
            Ok(o) => o,
            Err(_) => return original.to_string(), // out-of-range octet, not an IP
        };
        // structural addresses keep their meaning
        if octets[0] == 127 || original == "0.0.0.0" || octets[0] == 255 {
            return original.to_string();
        }

        let mut rng = rand::thread_rng();
        let replacement = if octets[0] == 192 && octets[1] == 168 {
            // keep private-LAN shape, randomize only a "real" host octet
            match octets[3] {
                0 | 1 | 255 => return original.to_string(),
                _ => format!(
                    "192.168.{}.{}",
                    octets[2],
                    rng.gen_range(2..255)
                ),
            }
        } else {
            let last = match octets[3] {
                0 | 1 | 255 => octets[3],
                _ => rng.gen_range(2..255),
            };
            format!(
                "10.{}.{}.{last}",
                rng.gen_range(0..=255),
                rng.gen_range(0..=255)
            )
        };
        self.replacements
            .insert(original.to_string(), replacement.clone());
        replacement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serial_number_is_replaced() {
        let mut anon = Anonymizer::new();
        let tree = json!({"device_info": {"serial_number": "JW360000112233"}});
        let out = anon.anonymize(&tree);
        let serial = out["device_info"]["serial_number"].as_str().unwrap();
        assert_ne!(serial, "JW360000112233");
        assert!(serial.starts_with("JW"));
        assert_eq!(serial.len(), 14);
    }

    #[test]
    fn mac_replacement_is_consistent_and_keeps_prefix() {
        let mut anon = Anonymizer::new();
        let tree = json!({
            "a": {"mac_address": "A4:12:42:00:11:22"},
            "b": {"client": "A4:12:42:00:11:22"}
        });
        let out = anon.anonymize(&tree);
        let first = out["a"]["mac_address"].as_str().unwrap();
        let second = out["b"]["client"].as_str().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("A4:12:42:"));
        assert_ne!(first, "A4:12:42:00:11:22");
    }

    #[test]
    fn version_fields_are_untouched() {
        let mut anon = Anonymizer::new();
        let tree = json!({"software_version": "50.10.18.4"});
        let out = anon.anonymize(&tree);
        assert_eq!(out["software_version"], "50.10.18.4");
    }

    #[test]
    fn structural_addresses_are_kept() {
        let mut anon = Anonymizer::new();
        let tree = json!({
            "loopback": "127.0.0.1",
            "unspecified": "0.0.0.0",
            "gateway": "192.168.0.1"
        });
        let out = anon.anonymize(&tree);
        assert_eq!(out["loopback"], "127.0.0.1");
        assert_eq!(out["unspecified"], "0.0.0.0");
        assert_eq!(out["gateway"], "192.168.0.1");
    }

    #[test]
    fn public_addresses_move_to_ten_slash_eight() {
        let mut anon = Anonymizer::new();
        let tree = json!({"wan": "203.0.113.20"});
        let out = anon.anonymize(&tree);
        let ip = out["wan"].as_str().unwrap();
        assert!(ip.starts_with("10."));
    }

    #[test]
    fn passwords_are_scrambled() {
        let mut anon = Anonymizer::new();
        let tree = json!({"wifi_password": "correct horse"});
        let out = anon.anonymize(&tree);
        let pw = out["wifi_password"].as_str().unwrap();
        assert_ne!(pw, "correct horse");
        assert_eq!(pw.len(), 12);
    }

    #[test]
    fn non_string_values_pass_through() {
        let mut anon = Anonymizer::new();
        let tree = json!({"channels": [1, 2, 3], "enabled": true});
        assert_eq!(anon.anonymize(&tree), tree);
    }
}
