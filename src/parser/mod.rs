//! Text Parsers
//!
//! Pure functions that turn captured tool output into records. Nothing in
//! this module spawns processes or touches shared state, so every parser can
//! be called from any number of tasks at once.
//!
//! # Modules
//!
//! - [`smartctl`] - SMART information and attribute sections
//! - [`ssacli`] - controller summary and drive detail blocks
//! - [`discovery`] - controller/drive ids from `show status` summaries
//! - [`numeric`] - strict and lenient number coercion
//!
//! # Example
//!
//! ```
//! use raid_health_exporter::parser::{parse_health_report, parse_physical_drives};
//!
//! let report = parse_health_report(
//!     "=== START OF READ SMART DATA SECTION ===\nElements in grown defect list: 71\n",
//! );
//! assert_eq!(report.attributes.grown_defects, Some(71.0));
//!
//! let drives = parse_physical_drives("physicaldrive 1I:1:1\n   Status: OK\n").unwrap();
//! assert!(drives[0].is_ok());
//! ```

pub mod discovery;
pub mod numeric;
pub mod smartctl;
pub mod ssacli;

#[cfg(test)]
mod proptest;

pub use discovery::{parse_controller_slots, parse_logical_drive_ids, parse_physical_drive_ids};
pub use numeric::{parse_raw_value, parse_strict};
pub use smartctl::{parse_health_report, DiskAttribute, DiskAttributes, DiskHealthReport, DiskInfo};
pub use ssacli::{
    parse_controllers, parse_inventory_block, parse_inventory_blocks, parse_logical_drives,
    parse_physical_drives, split_inventory_blocks, BlockSchema, ControllerSchema, EntityField,
    FieldValue, InventoryEntity, LogicalDriveSchema, PhysicalDriveSchema, STATUS_OK,
};
