//! ssacli Detail Parser
//!
//! Turns `ssacli ctrl slot=N pd ... show detail`, `ld ... show` and
//! `ctrl all show status` output into [`InventoryEntity`] records, one per
//! block.
//!
//! ```text
//!       physicaldrive 1I:1:1
//!          Port: 1I
//!          Bay: 1
//!          Status: OK
//!          Current Temperature (C): 27
//! ```
//!
//! A block starts at a marker line and runs until the next one. The marker,
//! how the identifier is cut out of it, and which keys are kept are supplied
//! by a [`BlockSchema`].

use std::collections::BTreeMap;

use serde::Serialize;

use super::discovery::slot_id;
use super::numeric::parse_strict;
use crate::error::Result;

/// Status string that counts as healthy
pub const STATUS_OK: &str = "OK";

// =============================================================================
// Fields
// =============================================================================

/// Keys recognized in controller detail output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EntityField {
    Status,
    Size,
    Bay,
    SerialNumber,
    Model,
    DriveType,
    InterfaceType,
    BlockSize,
    RotationalSpeed,
    FirmwareRevision,
    Wwid,
    CurrentTemperature,
    MaximumTemperature,
    Cylinders,
    Caching,
    FaultTolerance,
    UniqueIdentifier,
    DiskName,
    LogicalDriveLabel,
    UnrecoverableMediaErrors,
    ControllerStatus,
    CacheStatus,
    BatteryStatus,
}

impl EntityField {
    /// Fields ssacli always prints as plain numbers
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            EntityField::CurrentTemperature | EntityField::MaximumTemperature | EntityField::Cylinders
        )
    }
}

/// A field value as read from the dump
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

// =============================================================================
// Entity
// =============================================================================

/// One controller, physical drive or logical drive
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryEntity {
    /// Slot number, bay/port id (`1I:1:1`) or logical drive number
    pub id: String,
    pub fields: BTreeMap<EntityField, FieldValue>,
}

impl InventoryEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Text value of `field`, or `""` when absent
    pub fn text(&self, field: EntityField) -> &str {
        match self.fields.get(&field) {
            Some(FieldValue::Text(s)) => s,
            _ => "",
        }
    }

    /// Numeric value of `field`
    pub fn number(&self, field: EntityField) -> Option<f64> {
        match self.fields.get(&field) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn status(&self) -> &str {
        self.text(EntityField::Status)
    }

    /// Healthy only when the status is exactly `OK`
    pub fn is_ok(&self) -> bool {
        self.status() == STATUS_OK
    }

    /// Status projected to a gauge value
    pub fn status_value(&self) -> f64 {
        if self.is_ok() {
            1.0
        } else {
            0.0
        }
    }
}

// =============================================================================
// Block Schemas
// =============================================================================

/// Describes one kind of block in a detail dump.
pub trait BlockSchema {
    /// Literal prefix of a block's first line (after trimming)
    fn marker(&self) -> &'static str;

    /// True when the trimmed `line` opens a new block
    fn opens_block(&self, line: &str) -> bool {
        line.starts_with(self.marker())
    }

    /// Pull the entity identifier out of a marker line
    fn extract_id(&self, line: &str) -> Option<String>;

    /// Map an ssacli key onto a field, `None` to ignore it
    fn field(&self, key: &str) -> Option<EntityField>;
}

/// `physicaldrive 1I:1:1` blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalDriveSchema;

impl BlockSchema for PhysicalDriveSchema {
    fn marker(&self) -> &'static str {
        "physicaldrive "
    }

    fn extract_id(&self, line: &str) -> Option<String> {
        line.strip_prefix(self.marker())?
            .split_whitespace()
            .next()
            .map(str::to_string)
    }

    fn field(&self, key: &str) -> Option<EntityField> {
        let field = match key {
            "Bay" => EntityField::Bay,
            "Serial Number" => EntityField::SerialNumber,
            "Status" => EntityField::Status,
            "Drive Type" => EntityField::DriveType,
            "Interface Type" => EntityField::InterfaceType,
            "Size" => EntityField::Size,
            "Logical/Physical Block Size" => EntityField::BlockSize,
            "Rotational Speed" => EntityField::RotationalSpeed,
            "Firmware Revision" => EntityField::FirmwareRevision,
            "WWID" => EntityField::Wwid,
            "Model" => EntityField::Model,
            "Current Temperature (C)" => EntityField::CurrentTemperature,
            "Maximum Temperature (C)" => EntityField::MaximumTemperature,
            _ => return None,
        };
        Some(field)
    }
}

/// `Logical Drive: 1` blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalDriveSchema;

impl BlockSchema for LogicalDriveSchema {
    fn marker(&self) -> &'static str {
        "Logical Drive:"
    }

    fn extract_id(&self, line: &str) -> Option<String> {
        line.split(": ")
            .nth(1)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    fn field(&self, key: &str) -> Option<EntityField> {
        let field = match key {
            "Size" => EntityField::Size,
            "Cylinders" => EntityField::Cylinders,
            "Status" => EntityField::Status,
            "Caching" => EntityField::Caching,
            "Unique Identifier" => EntityField::UniqueIdentifier,
            "Disk Name" => EntityField::DiskName,
            "Logical Drive Label" => EntityField::LogicalDriveLabel,
            "Fault Tolerance" => EntityField::FaultTolerance,
            "Unrecoverable Media Errors" => EntityField::UnrecoverableMediaErrors,
            _ => return None,
        };
        Some(field)
    }
}

/// `Smart Array P440ar in Slot 0 (Embedded)` blocks of `ctrl all show status`
///
/// Any header that names a slot opens a block, so `HPE Smart Array ...` and
/// `Smart HBA ...` controllers are picked up too.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerSchema;

impl BlockSchema for ControllerSchema {
    fn marker(&self) -> &'static str {
        "Smart Array "
    }

    fn opens_block(&self, line: &str) -> bool {
        slot_id(line).is_some()
    }

    fn extract_id(&self, line: &str) -> Option<String> {
        slot_id(line).map(str::to_string)
    }

    fn field(&self, key: &str) -> Option<EntityField> {
        let field = match key {
            "Controller Status" => EntityField::ControllerStatus,
            "Cache Status" => EntityField::CacheStatus,
            "Battery/Capacitor Status" => EntityField::BatteryStatus,
            _ => return None,
        };
        Some(field)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Cut a dump into one slice per block, each starting at its marker line.
///
/// Lines before the first marker belong to no block and are dropped.
pub fn split_inventory_blocks<'a, S: BlockSchema>(raw: &'a str, schema: &S) -> Vec<&'a str> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        if schema.opens_block(line.trim()) {
            starts.push(offset);
        }
        offset += line.len();
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(raw.len());
            &raw[start..end]
        })
        .collect()
}

/// Parse a single block as cut by [`split_inventory_blocks`].
///
/// Returns `Ok(None)` when the marker line carries no identifier.
pub fn parse_inventory_block<S: BlockSchema>(
    block: &str,
    schema: &S,
) -> Result<Option<InventoryEntity>> {
    let mut lines = block.lines().map(str::trim);
    let id = lines
        .next()
        .and_then(|marker| schema.extract_id(marker))
        .unwrap_or_default();
    let mut entity = InventoryEntity::new(id);

    for line in lines {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let Some(field) = schema.field(key) else {
            continue;
        };

        let value = if field.is_numeric() {
            FieldValue::Number(parse_strict(key, value)?)
        } else {
            FieldValue::Text(value.to_string())
        };
        entity.fields.insert(field, value);
    }

    Ok(Some(entity).filter(|e| !e.id.is_empty()))
}

/// Split a detail dump into entities, in the order their blocks appear.
///
/// Fails as a whole when any numeric field holds a non-numeric token. Callers
/// that must keep the healthy blocks of a partly broken dump go through
/// [`split_inventory_blocks`] and [`parse_inventory_block`] instead.
pub fn parse_inventory_blocks<S: BlockSchema>(raw: &str, schema: &S) -> Result<Vec<InventoryEntity>> {
    let mut entities = Vec::new();
    for block in split_inventory_blocks(raw, schema) {
        entities.extend(parse_inventory_block(block, schema)?);
    }
    Ok(entities)
}

/// Parse `pd ... show detail` output
pub fn parse_physical_drives(raw: &str) -> Result<Vec<InventoryEntity>> {
    parse_inventory_blocks(raw, &PhysicalDriveSchema)
}

/// Parse `ld ... show` output
pub fn parse_logical_drives(raw: &str) -> Result<Vec<InventoryEntity>> {
    parse_inventory_blocks(raw, &LogicalDriveSchema)
}

/// Parse `ctrl all show status` output
pub fn parse_controllers(raw: &str) -> Result<Vec<InventoryEntity>> {
    parse_inventory_blocks(raw, &ControllerSchema)
}
