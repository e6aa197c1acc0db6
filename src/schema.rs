//! Static metric schema
//!
//! One declarative table maps every logical metric onto its candidate device
//! tree paths, its coercion rule and its Home Assistant metadata. Supporting
//! a new modem model means adding candidate paths here, not new code.
//!
//! The topic slug is the stable identity of a metric on the bus. Display
//! labels may be reworded freely; slugs must never change, otherwise every
//! downstream automation breaks.

/// How a resolved leaf (or channel array) becomes a metric value.
#[derive(Debug, Clone, Copy)]
pub enum Coerce {
    /// Floating point reading, parsed from a JSON number or string.
    Number { paths: &'static [&'static str] },
    /// Integer reading (counters, percentages).
    Integer { paths: &'static [&'static str] },
    /// Modem state string, normalized against a closed vocabulary.
    Status { paths: &'static [&'static str] },
    /// WAN IPv4 address, located by scanning the IP interface table.
    WanIpv4,
    /// Aggregate over a per-channel array.
    Aggregate {
        arrays: &'static [&'static str],
        field: &'static [&'static str],
        op: AggOp,
    },
}

/// Aggregation operator for channel arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    /// Array length. Empty array counts as 0; a missing array is absent.
    Count,
    Min,
    Max,
    /// Arithmetic mean over present values, rounded to two decimals.
    Avg,
    /// Integer sum over present values (codeword counters).
    Sum,
}

/// One logical metric: where it lives, how it coerces, how it presents.
#[derive(Debug)]
pub struct FieldSpec {
    /// Logical metric name, used as the record key.
    pub name: &'static str,
    /// Stable topic path under `{base_topic}/{serial}/`.
    pub slug: &'static str,
    /// Display label for discovery. Safe to reword.
    pub label: &'static str,
    pub coerce: Coerce,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub icon: Option<&'static str>,
}

impl FieldSpec {
    /// Discovery object id: the slug flattened to a single token.
    pub fn object_id(&self) -> String {
        self.slug.replace('/', "_")
    }
}

// Candidate paths, ordered newest firmware layout first.
const DOWNSTREAMS: &[&str] = &[
    "device/docsis/cable_modem/downstreams",
    "device/docsis/cable_modem/downstream_channels",
];
const UPSTREAMS: &[&str] = &[
    "device/docsis/cable_modem/upstreams",
    "device/docsis/cable_modem/upstream_channels",
];
const CHANNEL_POWER: &[&str] = &["power_level", "power"];
const CHANNEL_SNR: &[&str] = &["SNR", "snr"];

pub const SERIAL_NUMBER: &[&str] = &[
    "device/device_info/serial_number",
    "device/device_info/serialnumber",
];
pub const MAC_ADDRESS: &[&str] = &["device/device_info/mac_address"];
pub const MANUFACTURER: &[&str] = &["device/device_info/manufacturer"];
pub const MODEL_NUMBER: &[&str] = &[
    "device/device_info/model_number",
    "device/device_info/model_name",
];
pub const HARDWARE_VERSION: &[&str] = &["device/device_info/hardware_version"];
pub const SOFTWARE_VERSION: &[&str] = &["device/device_info/software_version"];

pub const IP_INTERFACES: &[&str] = &["device/IP/interfaces", "device/ip/interfaces"];
pub const IPV4_ADDRESS_LISTS: &[&str] = &["i_pv4_addresses", "ipv4_addresses"];
/// Alias marking the WAN data address among the interface address entries.
pub const WAN_ALIAS: &str = "IP_DATA_ADDRESS";

/// The complete metric set, in publish order.
pub const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "status",
        slug: "status",
        label: "Status",
        coerce: Coerce::Status {
            paths: &[
                "device/docsis/cable_modem/status",
                "device/docsis/cable_modem/registration_status",
            ],
        },
        unit: None,
        device_class: None,
        state_class: None,
        icon: Some("mdi:check-circle"),
    },
    FieldSpec {
        name: "ipv4_address",
        slug: "ipv4_address",
        label: "WAN IPv4 Address",
        coerce: Coerce::WanIpv4,
        unit: None,
        device_class: None,
        state_class: None,
        icon: Some("mdi:ip-network"),
    },
    FieldSpec {
        name: "downstream_power_avg_dbmv",
        slug: "downstream/power_avg_dbmv",
        label: "Downstream Power Avg",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Avg,
        },
        unit: Some("dBmV"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:signal-cellular-2"),
    },
    FieldSpec {
        name: "downstream_power_min_dbmv",
        slug: "downstream/power_min_dbmv",
        label: "Downstream Power Min",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Min,
        },
        unit: Some("dBmV"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:signal-cellular-1"),
    },
    FieldSpec {
        name: "downstream_power_max_dbmv",
        slug: "downstream/power_max_dbmv",
        label: "Downstream Power Max",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Max,
        },
        unit: Some("dBmV"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:signal-cellular-3"),
    },
    FieldSpec {
        name: "downstream_snr_avg_db",
        slug: "downstream/snr_avg_db",
        label: "Downstream SNR Avg",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: CHANNEL_SNR,
            op: AggOp::Avg,
        },
        unit: Some("dB"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:gauge"),
    },
    FieldSpec {
        name: "downstream_snr_max_db",
        slug: "downstream/snr_max_db",
        label: "Downstream SNR Max",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: CHANNEL_SNR,
            op: AggOp::Max,
        },
        unit: Some("dB"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:gauge-full"),
    },
    FieldSpec {
        name: "downstream_channel_count",
        slug: "downstream/channels",
        label: "Downstream Channels",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Count,
        },
        unit: None,
        device_class: None,
        state_class: Some("measurement"),
        icon: Some("mdi:counter"),
    },
    FieldSpec {
        name: "downstream_codewords_correctable",
        slug: "downstream/codewords_correctable",
        label: "Downstream Correctable Codewords",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: &["correctable_codewords"],
            op: AggOp::Sum,
        },
        unit: None,
        device_class: None,
        state_class: Some("total_increasing"),
        icon: Some("mdi:wifi-check"),
    },
    FieldSpec {
        name: "downstream_codewords_uncorrectable",
        slug: "downstream/codewords_uncorrectable",
        label: "Downstream Uncorrectable Codewords",
        coerce: Coerce::Aggregate {
            arrays: DOWNSTREAMS,
            field: &["uncorrectable_codewords"],
            op: AggOp::Sum,
        },
        unit: None,
        device_class: None,
        state_class: Some("total_increasing"),
        icon: Some("mdi:wifi-cancel"),
    },
    FieldSpec {
        name: "upstream_power_avg_dbmv",
        slug: "upstream/power_avg_dbmv",
        label: "Upstream Power Avg",
        coerce: Coerce::Aggregate {
            arrays: UPSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Avg,
        },
        unit: Some("dBmV"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:signal-cellular-2"),
    },
    FieldSpec {
        name: "upstream_power_min_dbmv",
        slug: "upstream/power_min_dbmv",
        label: "Upstream Power Min",
        coerce: Coerce::Aggregate {
            arrays: UPSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Min,
        },
        unit: Some("dBmV"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:signal-cellular-1"),
    },
    FieldSpec {
        name: "upstream_power_max_dbmv",
        slug: "upstream/power_max_dbmv",
        label: "Upstream Power Max",
        coerce: Coerce::Aggregate {
            arrays: UPSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Max,
        },
        unit: Some("dBmV"),
        device_class: Some("signal_strength"),
        state_class: Some("measurement"),
        icon: Some("mdi:signal-cellular-3"),
    },
    FieldSpec {
        name: "upstream_channel_count",
        slug: "upstream/channels",
        label: "Upstream Channels",
        coerce: Coerce::Aggregate {
            arrays: UPSTREAMS,
            field: CHANNEL_POWER,
            op: AggOp::Count,
        },
        unit: None,
        device_class: None,
        state_class: Some("measurement"),
        icon: Some("mdi:counter"),
    },
    FieldSpec {
        name: "system_cpu_usage",
        slug: "system/cpu_usage",
        label: "CPU Usage",
        coerce: Coerce::Integer {
            paths: &["device/device_info/process_status/cpu_usage"],
        },
        unit: Some("%"),
        device_class: None,
        state_class: Some("measurement"),
        icon: Some("mdi:cpu-64-bit"),
    },
    FieldSpec {
        name: "system_load_average_1m",
        slug: "system/load_average_1m",
        label: "Load Average (1m)",
        coerce: Coerce::Number {
            paths: &["device/device_info/process_status/load_average/load1"],
        },
        unit: None,
        device_class: None,
        state_class: Some("measurement"),
        icon: Some("mdi:chip"),
    },
    FieldSpec {
        name: "system_free_memory_percentage",
        slug: "system/free_memory_percentage",
        label: "Free Memory",
        coerce: Coerce::Integer {
            paths: &["device/device_info/memory_status/free_memory_percentage"],
        },
        unit: Some("%"),
        device_class: None,
        state_class: Some("measurement"),
        icon: Some("mdi:memory"),
    },
];

/// Look up a spec by logical name.
pub fn field(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}
