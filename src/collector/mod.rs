//! Collector
//!
//! Drives `ssacli` and `smartctl` for one poll and gathers the parsed
//! records into a [`Snapshot`].
//!
//! ```text
//! ctrl all show status ─┬─▶ slot 0 ─┬─▶ pd all show status ─▶ pd <id> show detail ─┐
//!                       │           │                        smartctl -d cciss,N  ─┤
//!                       │           └─▶ ld all show status ─▶ ld <id> show ────────┤─▶ Snapshot
//!                       └─▶ slot N ...                                             │
//! ```
//!
//! Every detail command for a slot runs concurrently. A failing entity is
//! logged, counted in [`Snapshot::errors`] and left out; its siblings are
//! unaffected. This holds in bulk mode too: an `all show detail` dump is cut
//! into per-drive blocks and each block is parsed on its own. Nothing is
//! cached between polls and nothing is retried.

mod command;

pub use command::{
    command_line, CommandOutput, CommandRunner, InMemoryCommandRunner, SystemCommandRunner,
};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::parser::{
    parse_controller_slots, parse_controllers, parse_health_report, parse_inventory_block,
    parse_logical_drive_ids, parse_logical_drives, parse_physical_drive_ids,
    parse_physical_drives, split_inventory_blocks, BlockSchema, DiskHealthReport,
    InventoryEntity, LogicalDriveSchema, PhysicalDriveSchema,
};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the collector
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// ssacli binary
    pub ssacli_path: String,

    /// smartctl binary
    pub smartctl_path: String,

    /// Block device behind the controller, passed to `smartctl -d cciss,N`
    pub device_path: String,

    /// Per-slot overrides of `device_path`. The cciss index restarts at 0 on
    /// every slot, so hosts with several controllers need one device each.
    pub slot_devices: BTreeMap<String, String>,

    /// Per-command timeout
    pub command_timeout: Duration,

    /// Read all drives of a slot with one `show detail` call
    pub bulk_detail: bool,

    /// Query smartctl for every physical drive
    pub smart_enabled: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            ssacli_path: "ssacli".to_string(),
            smartctl_path: "smartctl".to_string(),
            device_path: "/dev/sda".to_string(),
            slot_devices: BTreeMap::new(),
            command_timeout: Duration::from_secs(30),
            bulk_detail: false,
            smart_enabled: true,
        }
    }
}

impl CollectorConfig {
    /// Device queried by smartctl for drives on `slot`
    pub fn device_for(&self, slot: &str) -> &str {
        self.slot_devices
            .get(slot)
            .map(String::as_str)
            .unwrap_or(&self.device_path)
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A physical drive seen on a controller slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalDriveSample {
    pub slot_id: String,
    pub drive: InventoryEntity,
}

/// A logical drive seen on a controller slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalDriveSample {
    pub slot_id: String,
    pub drive: InventoryEntity,
}

/// SMART report for one physical drive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskHealthSample {
    pub slot_id: String,
    pub disk_id: String,
    pub report: DiskHealthReport,
}

/// Everything gathered in one poll
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub collected_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub controllers: Vec<String>,
    /// Controller, cache and battery status per slot
    pub controller_status: Vec<InventoryEntity>,
    pub physical_drives: Vec<PhysicalDriveSample>,
    pub logical_drives: Vec<LogicalDriveSample>,
    pub disk_health: Vec<DiskHealthSample>,
    /// Entities or commands that failed during this poll
    pub errors: usize,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            collected_at: Utc::now(),
            duration_seconds: 0.0,
            controllers: Vec::new(),
            controller_status: Vec::new(),
            physical_drives: Vec::new(),
            logical_drives: Vec::new(),
            disk_health: Vec::new(),
            errors: 0,
        }
    }

    fn record_error(&mut self, what: &str, err: &Error) {
        warn!(error = %err, "Failed collecting {}", what);
        self.errors += 1;
    }

    fn merge(&mut self, other: Snapshot) {
        self.physical_drives.extend(other.physical_drives);
        self.logical_drives.extend(other.logical_drives);
        self.disk_health.extend(other.disk_health);
        self.errors += other.errors;
    }
}

// =============================================================================
// Collector
// =============================================================================

/// Polls the RAID controller tools
#[derive(Clone)]
pub struct Collector {
    config: CollectorConfig,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("config", &self.config)
            .finish()
    }
}

impl Collector {
    /// Create a collector that runs real commands
    pub fn new(config: CollectorConfig) -> Self {
        let runner = Arc::new(SystemCommandRunner::new(config.command_timeout));
        Self::with_runner(config, runner)
    }

    /// Create a collector with a custom command runner
    pub fn with_runner(config: CollectorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run one full poll.
    ///
    /// Never fails; problems are logged and counted in `errors`.
    #[instrument(skip(self))]
    pub async fn collect(&self) -> Snapshot {
        let started = Instant::now();
        let mut snapshot = Snapshot::empty();

        match self.ssacli(&["ctrl", "all", "show", "status"]).await {
            Ok(out) => {
                snapshot.controllers = parse_controller_slots(&out);
                match parse_controllers(&out) {
                    Ok(status) => snapshot.controller_status = status,
                    Err(e) => snapshot.record_error("controller status", &e),
                }
            }
            Err(e) => snapshot.record_error("controller slots", &e),
        }

        let slots = join_all(snapshot.controllers.iter().map(|slot| self.collect_slot(slot))).await;
        for slot in slots {
            snapshot.merge(slot);
        }

        snapshot.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            controllers = snapshot.controllers.len(),
            physical_drives = snapshot.physical_drives.len(),
            logical_drives = snapshot.logical_drives.len(),
            smart_reports = snapshot.disk_health.len(),
            errors = snapshot.errors,
            "Collection finished in {:.3}s",
            snapshot.duration_seconds
        );
        snapshot
    }

    async fn collect_slot(&self, slot: &str) -> Snapshot {
        if self.config.bulk_detail {
            self.collect_slot_bulk(slot).await
        } else {
            self.collect_slot_per_entity(slot).await
        }
    }

    /// One detail command per drive
    async fn collect_slot_per_entity(&self, slot: &str) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        let slot_arg = slot_arg(slot);

        let pd_ids = match self
            .ssacli(&["ctrl", slot_arg.as_str(), "pd", "all", "show", "status"])
            .await
        {
            Ok(out) => parse_physical_drive_ids(&out),
            Err(e) => {
                snapshot.record_error(&format!("physical drives on slot {slot}"), &e);
                Vec::new()
            }
        };
        let ld_ids = match self
            .ssacli(&["ctrl", slot_arg.as_str(), "ld", "all", "show", "status"])
            .await
        {
            Ok(out) => parse_logical_drive_ids(&out),
            Err(e) => {
                snapshot.record_error(&format!("logical drives on slot {slot}"), &e);
                Vec::new()
            }
        };
        debug!(slot, pds = pd_ids.len(), lds = ld_ids.len(), "Discovered drives");

        let (pd_details, ld_details, smart) = futures::join!(
            join_all(pd_ids.iter().map(|id| self.physical_drive_detail(slot, id))),
            join_all(ld_ids.iter().map(|id| self.logical_drive_detail(slot, id))),
            self.collect_smart(slot, &pd_ids)
        );

        for (id, result) in pd_ids.iter().zip(pd_details) {
            match result {
                Ok(drives) => snapshot
                    .physical_drives
                    .extend(drives.into_iter().map(|drive| PhysicalDriveSample {
                        slot_id: slot.to_string(),
                        drive,
                    })),
                Err(e) => snapshot.record_error(&format!("physical drive {id} on slot {slot}"), &e),
            }
        }
        for (id, result) in ld_ids.iter().zip(ld_details) {
            match result {
                Ok(drives) => snapshot
                    .logical_drives
                    .extend(drives.into_iter().map(|drive| LogicalDriveSample {
                        slot_id: slot.to_string(),
                        drive,
                    })),
                Err(e) => snapshot.record_error(&format!("logical drive {id} on slot {slot}"), &e),
            }
        }
        snapshot.merge(smart);
        snapshot
    }

    /// One `show detail` per slot for all drives
    async fn collect_slot_bulk(&self, slot: &str) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        let slot_arg = slot_arg(slot);

        let pd_status_args = ["ctrl", slot_arg.as_str(), "pd", "all", "show", "status"];
        let pd_detail_args = ["ctrl", slot_arg.as_str(), "pd", "all", "show", "detail"];
        let ld_detail_args = ["ctrl", slot_arg.as_str(), "ld", "all", "show", "detail"];
        let (pd_status, pd_detail, ld_detail) = futures::join!(
            self.ssacli(&pd_status_args),
            self.ssacli(&pd_detail_args),
            self.ssacli(&ld_detail_args)
        );

        // SMART indexes follow the status listing, never the detail parse
        let pd_ids = match pd_status {
            Ok(out) => parse_physical_drive_ids(&out),
            Err(e) => {
                snapshot.record_error(&format!("physical drives on slot {slot}"), &e);
                Vec::new()
            }
        };

        match pd_detail {
            Ok(out) => {
                let drives = parse_each_block(&mut snapshot, slot, &out, &PhysicalDriveSchema);
                snapshot
                    .physical_drives
                    .extend(drives.into_iter().map(|drive| PhysicalDriveSample {
                        slot_id: slot.to_string(),
                        drive,
                    }));
            }
            Err(e) => snapshot.record_error(&format!("physical drive detail on slot {slot}"), &e),
        }
        match ld_detail {
            Ok(out) => {
                let drives = parse_each_block(&mut snapshot, slot, &out, &LogicalDriveSchema);
                snapshot
                    .logical_drives
                    .extend(drives.into_iter().map(|drive| LogicalDriveSample {
                        slot_id: slot.to_string(),
                        drive,
                    }));
            }
            Err(e) => snapshot.record_error(&format!("logical drive detail on slot {slot}"), &e),
        }

        snapshot.merge(self.collect_smart(slot, &pd_ids).await);
        snapshot
    }

    /// `ssacli ctrl slot=S pd <id> show detail`
    pub async fn physical_drive_detail(&self, slot: &str, id: &str) -> Result<Vec<InventoryEntity>> {
        let slot_arg = slot_arg(slot);
        let out = self
            .ssacli(&["ctrl", slot_arg.as_str(), "pd", id, "show", "detail"])
            .await?;
        parse_physical_drives(&out)
    }

    /// `ssacli ctrl slot=S ld <id> show`
    pub async fn logical_drive_detail(&self, slot: &str, id: &str) -> Result<Vec<InventoryEntity>> {
        let slot_arg = slot_arg(slot);
        let out = self
            .ssacli(&["ctrl", slot_arg.as_str(), "ld", id, "show"])
            .await?;
        parse_logical_drives(&out)
    }

    /// SMART reports for the drives of a slot. The cciss index is the
    /// drive's position in the slot's status listing.
    async fn collect_smart(&self, slot: &str, pd_ids: &[String]) -> Snapshot {
        let mut snapshot = Snapshot::empty();
        if !self.config.smart_enabled {
            return snapshot;
        }

        let reports = join_all(
            pd_ids
                .iter()
                .enumerate()
                .map(|(index, _)| self.disk_health(slot, index)),
        )
        .await;

        for (id, result) in pd_ids.iter().zip(reports) {
            match result {
                Ok(report) => snapshot.disk_health.push(DiskHealthSample {
                    slot_id: slot.to_string(),
                    disk_id: id.clone(),
                    report,
                }),
                Err(e) => snapshot.record_error(&format!("SMART data for {id} on slot {slot}"), &e),
            }
        }
        snapshot
    }

    /// `smartctl -iA -d cciss,N <device>`, with the device chosen for `slot`
    pub async fn disk_health(&self, slot: &str, index: usize) -> Result<DiskHealthReport> {
        let device = self.config.device_for(slot);
        let args = vec![
            "-iA".to_string(),
            "-d".to_string(),
            format!("cciss,{index}"),
            device.to_string(),
        ];
        let out = self.runner.run(&self.config.smartctl_path, &args).await?;

        let report = parse_health_report(&out.text);
        if report.is_empty() {
            return Err(Error::NotSmartOutput {
                device: format!("{device} cciss,{index}"),
                code: out.code,
            });
        }
        if !out.success() {
            // smartctl sets exit bits for disk warnings while still printing a report
            debug!(index, code = ?out.code, "smartctl exited non-zero with a usable report");
        }
        Ok(report)
    }

    async fn ssacli(&self, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let out = self.runner.run(&self.config.ssacli_path, &args).await?;
        if !out.success() {
            return Err(Error::CommandExit {
                command: command_line(&self.config.ssacli_path, &args),
                code: out.code,
                output: out.text.trim().to_string(),
            });
        }
        Ok(out.text)
    }
}

fn slot_arg(slot: &str) -> String {
    format!("slot={slot}")
}

/// Parse every block of a bulk dump on its own so one malformed drive does
/// not hide the others. Failures are recorded on `snapshot`.
fn parse_each_block<S: BlockSchema>(
    snapshot: &mut Snapshot,
    slot: &str,
    raw: &str,
    schema: &S,
) -> Vec<InventoryEntity> {
    let mut entities = Vec::new();
    for block in split_inventory_blocks(raw, schema) {
        match parse_inventory_block(block, schema) {
            Ok(entity) => entities.extend(entity),
            Err(e) => {
                let id = block
                    .lines()
                    .next()
                    .and_then(|marker| schema.extract_id(marker.trim()))
                    .unwrap_or_default();
                snapshot.record_error(&format!("drive {id} on slot {slot}"), &e);
            }
        }
    }
    entities
}
