//! Metrics Exposition
//!
//! Projects a [`Snapshot`] onto Prometheus gauges. A fresh registry is built
//! for every scrape so nothing from a previous poll can leak into the next.
//!
//! # Metric names
//!
//! | metric | value |
//! |---|---|
//! | `smartctl_physical_disk_<attribute>` | SMART raw value, see [`DiskAttribute::metric_suffix`] |
//! | `ssacli_sum_status` | 1 if a controller, cache or battery component reports `OK`, else 0 |
//! | `ssacli_phys_disk_status` | 1 if the physical drive reports `OK`, else 0 |
//! | `ssacli_log_disk_status` | 1 if the logical drive reports `OK`, else 0 |
//! | `ssacli_phys_disk_current_temperature_celsius` | controller-reported temperature |
//! | `ssacli_phys_disk_maximum_temperature_celsius` | controller-reported peak temperature |
//!
//! These names and their labels are consumed by dashboards and alerts;
//! renaming one is a breaking change.
//!
//! Absent values are never exported as zero. A SMART attribute the drive did
//! not report has no sample at all.

use std::collections::HashMap;

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::collector::Snapshot;
use crate::error::{Error, Result};
use crate::parser::{DiskAttribute, EntityField, InventoryEntity, STATUS_OK};

const SMART_PREFIX: &str = "smartctl_physical_disk_";

const SMART_LABELS: &[&str] = &["diskID", "model", "sn", "rotRate", "fromFact", "slotID"];

const SUM_LABELS: &[&str] = &["slotID", "component", "status"];

/// Controller summary fields and their `component` label
const SUM_COMPONENTS: &[(EntityField, &str)] = &[
    (EntityField::ControllerStatus, "controller"),
    (EntityField::CacheStatus, "cache"),
    (EntityField::BatteryStatus, "battery"),
];

const PHYS_DISK_LABELS: &[&str] = &[
    "physDiskID",
    "physDiskDriveType",
    "physDiskInterfaceType",
    "physDiskSize",
    "physDiskStatus",
    "physDiskSerialNumber",
    "physDiskModel",
    "physDiskCurrentTemperature",
    "physDiskMaximumTemperature",
    "physDiskBay",
    "physDiskSlotID",
];

const PHYS_TEMP_LABELS: &[&str] = &["physDiskID", "physDiskSlotID"];

const LOG_DISK_LABELS: &[&str] = &[
    "logDiskID",
    "logDiskSize",
    "logDiskFaultTolerance",
    "logDiskStatus",
    "logDiskCaching",
    "logDiskUME",
    "logDiskSlotID",
];

/// Full metric name for a SMART attribute
pub fn smart_metric_name(attribute: DiskAttribute) -> String {
    format!("{SMART_PREFIX}{}", attribute.metric_suffix())
}

/// Content type of [`render`]'s output
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Render a snapshot in the Prometheus text format
pub fn render(snapshot: &Snapshot) -> Result<String> {
    let metrics = MetricSet::new()?;
    metrics.observe(snapshot);
    metrics.encode()
}

// =============================================================================
// Metric Set
// =============================================================================

/// Gauges for one scrape, registered on a private registry
pub struct MetricSet {
    registry: Registry,
    smart: HashMap<DiskAttribute, GaugeVec>,
    sum_status: GaugeVec,
    phys_disk_status: GaugeVec,
    phys_disk_current_temp: GaugeVec,
    phys_disk_max_temp: GaugeVec,
    log_disk_status: GaugeVec,
    collection_errors: Gauge,
    controllers: Gauge,
    scrape_duration: Gauge,
}

impl MetricSet {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let mut smart = HashMap::with_capacity(DiskAttribute::ALL.len());
        for attr in DiskAttribute::ALL {
            let gauge = gauge_vec(
                &registry,
                &smart_metric_name(attr),
                attr.help(),
                SMART_LABELS,
            )?;
            smart.insert(attr, gauge);
        }

        let sum_status = gauge_vec(
            &registry,
            "ssacli_sum_status",
            "Hardware raid controller component status (1 if OK, 0 otherwise)",
            SUM_LABELS,
        )?;
        let phys_disk_status = gauge_vec(
            &registry,
            "ssacli_phys_disk_status",
            "Hardware raid physical disk status (1 if OK, 0 otherwise)",
            PHYS_DISK_LABELS,
        )?;
        let phys_disk_current_temp = gauge_vec(
            &registry,
            "ssacli_phys_disk_current_temperature_celsius",
            "Hardware raid physical disk current temperature",
            PHYS_TEMP_LABELS,
        )?;
        let phys_disk_max_temp = gauge_vec(
            &registry,
            "ssacli_phys_disk_maximum_temperature_celsius",
            "Hardware raid physical disk maximum recorded temperature",
            PHYS_TEMP_LABELS,
        )?;
        let log_disk_status = gauge_vec(
            &registry,
            "ssacli_log_disk_status",
            "Hardware raid logical drive status (1 if OK, 0 otherwise)",
            LOG_DISK_LABELS,
        )?;

        let collection_errors = gauge(
            &registry,
            "raid_exporter_collection_errors",
            "Entities or commands that failed during the last collection",
        )?;
        let controllers = gauge(
            &registry,
            "raid_exporter_controllers",
            "Controller slots discovered during the last collection",
        )?;
        let scrape_duration = gauge(
            &registry,
            "raid_exporter_scrape_duration_seconds",
            "Time spent collecting controller and SMART data",
        )?;

        Ok(Self {
            registry,
            smart,
            sum_status,
            phys_disk_status,
            phys_disk_current_temp,
            phys_disk_max_temp,
            log_disk_status,
            collection_errors,
            controllers,
            scrape_duration,
        })
    }

    /// Record every value present in `snapshot`
    pub fn observe(&self, snapshot: &Snapshot) {
        for sample in &snapshot.disk_health {
            let info = &sample.report.info;
            let labels = [
                sample.disk_id.as_str(),
                info.model.as_str(),
                info.serial_number.as_str(),
                info.rotation_rate.as_str(),
                info.form_factor.as_str(),
                sample.slot_id.as_str(),
            ];
            for (attr, value) in sample.report.attributes.present() {
                if let Some(gauge) = self.smart.get(&attr) {
                    gauge.with_label_values(&labels).set(value);
                }
            }
        }

        for controller in &snapshot.controller_status {
            for &(field, component) in SUM_COMPONENTS {
                let status = controller.text(field);
                if status.is_empty() {
                    continue;
                }
                let value = if status == STATUS_OK { 1.0 } else { 0.0 };
                self.sum_status
                    .with_label_values(&[controller.id.as_str(), component, status])
                    .set(value);
            }
        }

        for sample in &snapshot.physical_drives {
            self.observe_physical_drive(&sample.slot_id, &sample.drive);
        }

        for sample in &snapshot.logical_drives {
            let ld = &sample.drive;
            let labels = [
                ld.id.as_str(),
                ld.text(EntityField::Size),
                ld.text(EntityField::FaultTolerance),
                ld.status(),
                ld.text(EntityField::Caching),
                ld.text(EntityField::UnrecoverableMediaErrors),
                sample.slot_id.as_str(),
            ];
            self.log_disk_status
                .with_label_values(&labels)
                .set(ld.status_value());
        }

        self.collection_errors.set(snapshot.errors as f64);
        self.controllers.set(snapshot.controllers.len() as f64);
        self.scrape_duration.set(snapshot.duration_seconds);
    }

    fn observe_physical_drive(&self, slot_id: &str, pd: &InventoryEntity) {
        let current = pd.number(EntityField::CurrentTemperature);
        let maximum = pd.number(EntityField::MaximumTemperature);
        let current_label = temperature_label(current);
        let maximum_label = temperature_label(maximum);

        let labels = [
            pd.id.as_str(),
            pd.text(EntityField::DriveType),
            pd.text(EntityField::InterfaceType),
            pd.text(EntityField::Size),
            pd.status(),
            pd.text(EntityField::SerialNumber),
            pd.text(EntityField::Model),
            current_label.as_str(),
            maximum_label.as_str(),
            pd.text(EntityField::Bay),
            slot_id,
        ];
        self.phys_disk_status
            .with_label_values(&labels)
            .set(pd.status_value());

        let temp_labels = [pd.id.as_str(), slot_id];
        if let Some(t) = current {
            self.phys_disk_current_temp
                .with_label_values(&temp_labels)
                .set(t);
        }
        if let Some(t) = maximum {
            self.phys_disk_max_temp.with_label_values(&temp_labels).set(t);
        }
    }

    /// Encode the registry in the text exposition format
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics not UTF-8: {e}")))
    }
}

fn temperature_label(value: Option<f64>) -> String {
    value.map(|t| format!("{t:.0}")).unwrap_or_default()
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge> {
    let gauge = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}
