//! Sagemcom DOCSIS modem telemetry bridge to MQTT
//!
//! The crate is organized around three core pieces:
//! - extraction: walk the modem's nested device tree and derive a fixed,
//!   typed metric record (`tree`, `schema`, `extract`)
//! - publishing: map a metric record onto retained/expiring MQTT messages
//!   and Home Assistant discovery payloads (`publish`, `discovery`)
//! - scheduling: drive fetch -> extract -> publish on a fixed interval with
//!   per-cycle fault isolation (`poller`)
//!
//! The modem transport (`transport`) and the MQTT client (`bus`) are the
//! only components performing I/O; everything in between is pure.

pub mod anonymize;
pub mod bus;
pub mod config;
pub mod discovery;
pub mod extract;
pub mod poller;
pub mod publish;
pub mod schema;
pub mod transport;
pub mod tree;
