//! RAID Health Exporter
//!
//! Prometheus exporter for HPE Smart Array controllers. Controller, physical
//! drive and logical drive state comes from `ssacli`; per-disk SMART counters
//! come from `smartctl -d cciss,N`.
//!
//! # Architecture
//!
//! ```text
//! ssacli / smartctl ──▶ Collector ──▶ Parsers ──▶ Snapshot ──▶ Exporter ──▶ /metrics
//!     (processes)      (fan-out)    (pure text)   (records)   (gauges)
//! ```
//!
//! # Modules
//!
//! - [`collector`] - Command execution and per-poll orchestration
//! - [`error`] - Error types
//! - [`exporter`] - Prometheus projection of collected records
//! - [`parser`] - smartctl and ssacli text parsers

pub mod collector;
pub mod error;
pub mod exporter;
pub mod parser;

// Re-export commonly used types
pub use collector::{Collector, CollectorConfig, Snapshot};
pub use error::{Error, Result};
pub use parser::{
    parse_health_report, parse_inventory_blocks, parse_logical_drives, parse_physical_drives,
    DiskHealthReport, InventoryEntity,
};
