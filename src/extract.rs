//! Metric extraction from one device tree snapshot
//!
//! `extract` is a pure function of one fetched tree: it resolves every
//! field of the static schema, applies per-field coercion and returns a
//! flat, immutable record. A field that cannot be resolved or parsed is
//! `Absent` — never an error and never a fake zero. The single exception
//! is the serial number: it namespaces every topic and discovery unique
//! id, so a tree without it fails the whole cycle.

use crate::schema::{self, AggOp, Coerce, FieldSpec};
use crate::tree::{as_number, as_text, resolve};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("serial number not found in device tree")]
    SerialNumberMissing,
}

/// One extracted metric value. `Absent` is an explicit state so consumers
/// can tell "not supported by this device" from a legitimate zero.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Absent,
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Bus payload rendering; absent values produce no payload at all.
    pub fn render(&self) -> Option<String> {
        match self {
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Absent => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Number(n) => json!(n),
            FieldValue::Integer(i) => json!(i),
            FieldValue::Text(s) => json!(s),
            FieldValue::Absent => Value::Null,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Device identity attached to every record, used for topic namespacing
/// and the discovery device payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub serial_number: String,
    pub mac_address: Option<String>,
    pub manufacturer: Option<String>,
    pub model_number: Option<String>,
    pub hardware_version: Option<String>,
    pub software_version: Option<String>,
}

impl DeviceIdentity {
    pub fn display_name(&self) -> String {
        match (&self.manufacturer, &self.model_number) {
            (Some(m), Some(n)) => format!("{m} {n}"),
            (Some(m), None) => m.clone(),
            (None, Some(n)) => n.clone(),
            (None, None) => "Sagemcom modem".to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "serial_number": self.serial_number,
            "mac_address": self.mac_address,
            "manufacturer": self.manufacturer,
            "model_number": self.model_number,
            "hardware_version": self.hardware_version,
            "software_version": self.software_version,
        })
    }
}

/// Flat metric record for one poll cycle. Holds exactly one value per
/// schema field, in schema order; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub identity: DeviceIdentity,
    values: Vec<FieldValue>,
}

impl MetricRecord {
    pub fn get(&self, name: &str) -> &FieldValue {
        schema::FIELDS
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.values[i])
            .unwrap_or(&FieldValue::Absent)
    }

    /// Iterate (spec, value) pairs in schema (publish) order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldSpec, &FieldValue)> {
        schema::FIELDS.iter().zip(self.values.iter())
    }

    /// Human-readable rendering for one-shot mode and the parse-file tool.
    pub fn to_json(&self) -> Value {
        let metrics: serde_json::Map<String, Value> = self
            .iter()
            .map(|(spec, value)| (spec.name.to_string(), value.to_json()))
            .collect();
        json!({
            "device": self.identity.to_json(),
            "metrics": metrics,
        })
    }
}

/// Known modem registration states. Anything else passes through raw so a
/// new firmware state shows up on the bus instead of being dropped.
const STATUS_VOCABULARY: &[&str] = &["OPERATIONAL", "SCANNING", "RANGING", "REGISTERED", "OFFLINE"];

fn normalize_status(raw: String) -> String {
    STATUS_VOCABULARY
        .iter()
        .find(|known| raw.eq_ignore_ascii_case(known))
        .map(|known| known.to_string())
        .unwrap_or(raw)
}

/// Extract a metric record from one device tree snapshot.
pub fn extract(tree: &Value) -> Result<MetricRecord, ExtractError> {
    let serial_number = resolve(tree, schema::SERIAL_NUMBER)
        .and_then(as_text)
        .ok_or(ExtractError::SerialNumberMissing)?;

    let identity = DeviceIdentity {
        serial_number,
        mac_address: resolve(tree, schema::MAC_ADDRESS).and_then(as_text),
        manufacturer: resolve(tree, schema::MANUFACTURER).and_then(as_text),
        model_number: resolve(tree, schema::MODEL_NUMBER).and_then(as_text),
        hardware_version: resolve(tree, schema::HARDWARE_VERSION).and_then(as_text),
        software_version: resolve(tree, schema::SOFTWARE_VERSION).and_then(as_text),
    };

    let values = schema::FIELDS
        .iter()
        .map(|spec| coerce_field(tree, spec))
        .collect();

    Ok(MetricRecord { identity, values })
}

fn coerce_field(tree: &Value, spec: &FieldSpec) -> FieldValue {
    match spec.coerce {
        Coerce::Number { paths } => resolve(tree, paths)
            .and_then(as_number)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Absent),
        Coerce::Integer { paths } => resolve(tree, paths)
            .and_then(as_number)
            .map(|n| FieldValue::Integer(n as i64))
            .unwrap_or(FieldValue::Absent),
        Coerce::Status { paths } => resolve(tree, paths)
            .and_then(as_text)
            .map(|s| FieldValue::Text(normalize_status(s)))
            .unwrap_or(FieldValue::Absent),
        Coerce::WanIpv4 => wan_ipv4(tree),
        Coerce::Aggregate { arrays, field, op } => aggregate(tree, arrays, field, op),
    }
}

/// Per-channel aggregation. Count is the array length (an empty array is a
/// real reading of 0); the other operators skip channels lacking the
/// sub-field and go absent when nothing is left.
fn aggregate(tree: &Value, arrays: &[&str], field: &[&str], op: AggOp) -> FieldValue {
    let channels = match resolve(tree, arrays) {
        Some(Value::Array(items)) => items,
        _ => return FieldValue::Absent,
    };

    if op == AggOp::Count {
        return FieldValue::Integer(channels.len() as i64);
    }

    let readings: Vec<f64> = channels
        .iter()
        .filter_map(|channel| field.iter().find_map(|f| channel.get(f)).and_then(as_number))
        .collect();
    if readings.is_empty() {
        return FieldValue::Absent;
    }

    match op {
        AggOp::Min => FieldValue::Number(readings.iter().copied().fold(f64::INFINITY, f64::min)),
        AggOp::Max => {
            FieldValue::Number(readings.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        }
        AggOp::Avg => {
            let avg = readings.iter().sum::<f64>() / readings.len() as f64;
            FieldValue::Number((avg * 100.0).round() / 100.0)
        }
        AggOp::Sum => FieldValue::Integer(readings.iter().sum::<f64>() as i64),
        AggOp::Count => unreachable!(),
    }
}

/// The WAN address is not at a fixed path: scan the IP interface table for
/// the IPv4 entry aliased as the data address.
fn wan_ipv4(tree: &Value) -> FieldValue {
    let interfaces = match resolve(tree, schema::IP_INTERFACES) {
        Some(Value::Array(items)) => items,
        _ => return FieldValue::Absent,
    };
    for interface in interfaces {
        let addresses = schema::IPV4_ADDRESS_LISTS
            .iter()
            .find_map(|key| interface.get(key))
            .and_then(Value::as_array);
        let Some(addresses) = addresses else {
            continue;
        };
        for address in addresses {
            if address.get("alias").and_then(Value::as_str) == Some(schema::WAN_ALIAS) {
                if let Some(ip) = address.get("ip_address").and_then(Value::as_str) {
                    return FieldValue::Text(ip.to_string());
                }
            }
        }
    }
    FieldValue::Absent
}
