//! smartctl Report Parser
//!
//! Parses the text printed by `smartctl -iA` into a [`DiskHealthReport`].
//!
//! A report is a sequence of sections opened by `=== START OF ... ===`
//! banners. Only two are of interest:
//!
//! ```text
//! === START OF INFORMATION SECTION ===
//! Device Model:     ST4000NM0033-9ZM170
//! Serial Number:    Z1Z3ABCD
//! ...
//! === START OF READ SMART DATA SECTION ===
//! ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
//!   1 Raw_Read_Error_Rate     0x010f   083   064   044    Pre-fail  Always       -       0/200164573
//! ```
//!
//! Everything else is skipped. Parsing never fails: unknown lines are
//! ignored and unparseable raw values leave the attribute unset.

use serde::Serialize;

use super::numeric::parse_raw_value;

/// Literal that opens every smartctl section banner.
pub const SECTION_MARKER: &str = "=== START OF ";

const INFORMATION_TAG: &str = "INFORMATION SECTION ===";
const SMART_DATA_TAG: &str = "READ SMART DATA SECTION ===";
const GROWN_DEFECTS_KEY: &str = "Elements in grown defect list";

/// Minimum whitespace-separated fields in an attribute table row.
const ATTRIBUTE_ROW_FIELDS: usize = 10;
const ATTRIBUTE_NAME_COLUMN: usize = 1;
const RAW_VALUE_COLUMN: usize = 9;

// =============================================================================
// Records
// =============================================================================

/// Identity of a disk, from the information section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiskInfo {
    pub model: String,
    pub serial_number: String,
    pub rotation_rate: String,
    pub form_factor: String,
}

impl DiskInfo {
    /// True when no identity field was found
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
            && self.serial_number.is_empty()
            && self.rotation_rate.is_empty()
            && self.form_factor.is_empty()
    }
}

/// SMART health counters. `None` means the attribute was not reported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskAttributes {
    pub raw_read_error_rate: Option<f64>,
    pub reallocated_sector_ct: Option<f64>,
    pub power_on_hours: Option<f64>,
    pub power_cycle_count: Option<f64>,
    pub runtime_bad_block: Option<f64>,
    pub end_to_end_error: Option<f64>,
    pub reported_uncorrect: Option<f64>,
    pub command_timeout: Option<f64>,
    pub hardware_ecc_recovered: Option<f64>,
    pub reallocated_event_count: Option<f64>,
    pub current_pending_sector: Option<f64>,
    pub offline_uncorrectable: Option<f64>,
    pub udma_crc_error_count: Option<f64>,
    pub unused_rsvd_blk_cnt_tot: Option<f64>,
    pub grown_defects: Option<f64>,
    pub spin_up_time: Option<f64>,
    pub start_stop_count: Option<f64>,
    pub seek_error_rate: Option<f64>,
    pub spin_retry_count: Option<f64>,
    pub airflow_temperature: Option<f64>,
    pub temperature_celsius: Option<f64>,
    pub load_cycle_count: Option<f64>,
    pub total_lbas_written: Option<f64>,
    pub total_lbas_read: Option<f64>,
}

impl DiskAttributes {
    /// Value of a single attribute
    pub fn get(&self, attribute: DiskAttribute) -> Option<f64> {
        *self.slot(attribute)
    }

    /// Attributes that were reported, in table order
    pub fn present(&self) -> impl Iterator<Item = (DiskAttribute, f64)> + '_ {
        DiskAttribute::ALL
            .into_iter()
            .filter_map(move |attr| self.get(attr).map(|v| (attr, v)))
    }

    /// True when no attribute was found
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    fn slot(&self, attribute: DiskAttribute) -> &Option<f64> {
        use DiskAttribute::*;
        match attribute {
            RawReadErrorRate => &self.raw_read_error_rate,
            ReallocatedSectorCt => &self.reallocated_sector_ct,
            PowerOnHours => &self.power_on_hours,
            PowerCycleCount => &self.power_cycle_count,
            RuntimeBadBlock => &self.runtime_bad_block,
            EndToEndError => &self.end_to_end_error,
            ReportedUncorrect => &self.reported_uncorrect,
            CommandTimeout => &self.command_timeout,
            HardwareEccRecovered => &self.hardware_ecc_recovered,
            ReallocatedEventCount => &self.reallocated_event_count,
            CurrentPendingSector => &self.current_pending_sector,
            OfflineUncorrectable => &self.offline_uncorrectable,
            UdmaCrcErrorCount => &self.udma_crc_error_count,
            UnusedRsvdBlkCntTot => &self.unused_rsvd_blk_cnt_tot,
            GrownDefects => &self.grown_defects,
            SpinUpTime => &self.spin_up_time,
            StartStopCount => &self.start_stop_count,
            SeekErrorRate => &self.seek_error_rate,
            SpinRetryCount => &self.spin_retry_count,
            AirflowTemperature => &self.airflow_temperature,
            TemperatureCelsius => &self.temperature_celsius,
            LoadCycleCount => &self.load_cycle_count,
            TotalLbasWritten => &self.total_lbas_written,
            TotalLbasRead => &self.total_lbas_read,
        }
    }

    fn slot_mut(&mut self, attribute: DiskAttribute) -> &mut Option<f64> {
        use DiskAttribute::*;
        match attribute {
            RawReadErrorRate => &mut self.raw_read_error_rate,
            ReallocatedSectorCt => &mut self.reallocated_sector_ct,
            PowerOnHours => &mut self.power_on_hours,
            PowerCycleCount => &mut self.power_cycle_count,
            RuntimeBadBlock => &mut self.runtime_bad_block,
            EndToEndError => &mut self.end_to_end_error,
            ReportedUncorrect => &mut self.reported_uncorrect,
            CommandTimeout => &mut self.command_timeout,
            HardwareEccRecovered => &mut self.hardware_ecc_recovered,
            ReallocatedEventCount => &mut self.reallocated_event_count,
            CurrentPendingSector => &mut self.current_pending_sector,
            OfflineUncorrectable => &mut self.offline_uncorrectable,
            UdmaCrcErrorCount => &mut self.udma_crc_error_count,
            UnusedRsvdBlkCntTot => &mut self.unused_rsvd_blk_cnt_tot,
            GrownDefects => &mut self.grown_defects,
            SpinUpTime => &mut self.spin_up_time,
            StartStopCount => &mut self.start_stop_count,
            SeekErrorRate => &mut self.seek_error_rate,
            SpinRetryCount => &mut self.spin_retry_count,
            AirflowTemperature => &mut self.airflow_temperature,
            TemperatureCelsius => &mut self.temperature_celsius,
            LoadCycleCount => &mut self.load_cycle_count,
            TotalLbasWritten => &mut self.total_lbas_written,
            TotalLbasRead => &mut self.total_lbas_read,
        }
    }
}

/// Result of parsing one smartctl report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskHealthReport {
    pub info: DiskInfo,
    pub attributes: DiskAttributes,
}

impl DiskHealthReport {
    /// True when nothing was parsed, which usually means smartctl printed an
    /// error instead of a report.
    pub fn is_empty(&self) -> bool {
        self.info.is_empty() && self.attributes.is_empty()
    }
}

// =============================================================================
// Attribute Table
// =============================================================================

/// A SMART counter tracked by the exporter.
///
/// The mapping to smartctl attribute names and to metric names is part of
/// the exporter's public contract; do not rename entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiskAttribute {
    RawReadErrorRate,
    ReallocatedSectorCt,
    PowerOnHours,
    PowerCycleCount,
    RuntimeBadBlock,
    EndToEndError,
    ReportedUncorrect,
    CommandTimeout,
    HardwareEccRecovered,
    ReallocatedEventCount,
    CurrentPendingSector,
    OfflineUncorrectable,
    UdmaCrcErrorCount,
    UnusedRsvdBlkCntTot,
    GrownDefects,
    SpinUpTime,
    StartStopCount,
    SeekErrorRate,
    SpinRetryCount,
    AirflowTemperature,
    TemperatureCelsius,
    LoadCycleCount,
    TotalLbasWritten,
    TotalLbasRead,
}

impl DiskAttribute {
    /// Every tracked attribute, in exposition order
    pub const ALL: [DiskAttribute; 24] = [
        DiskAttribute::RawReadErrorRate,
        DiskAttribute::ReallocatedSectorCt,
        DiskAttribute::PowerOnHours,
        DiskAttribute::PowerCycleCount,
        DiskAttribute::RuntimeBadBlock,
        DiskAttribute::EndToEndError,
        DiskAttribute::ReportedUncorrect,
        DiskAttribute::CommandTimeout,
        DiskAttribute::HardwareEccRecovered,
        DiskAttribute::ReallocatedEventCount,
        DiskAttribute::CurrentPendingSector,
        DiskAttribute::OfflineUncorrectable,
        DiskAttribute::UdmaCrcErrorCount,
        DiskAttribute::UnusedRsvdBlkCntTot,
        DiskAttribute::GrownDefects,
        DiskAttribute::SpinUpTime,
        DiskAttribute::StartStopCount,
        DiskAttribute::SeekErrorRate,
        DiskAttribute::SpinRetryCount,
        DiskAttribute::AirflowTemperature,
        DiskAttribute::TemperatureCelsius,
        DiskAttribute::LoadCycleCount,
        DiskAttribute::TotalLbasWritten,
        DiskAttribute::TotalLbasRead,
    ];

    /// Look up an attribute by its smartctl table name (case-sensitive).
    ///
    /// `GrownDefects` has no table name; it comes from a free-text line.
    pub fn from_table_name(name: &str) -> Option<Self> {
        use DiskAttribute::*;
        let attr = match name {
            "Raw_Read_Error_Rate" => RawReadErrorRate,
            "Reallocated_Sector_Ct" => ReallocatedSectorCt,
            "Power_On_Hours" => PowerOnHours,
            "Power_Cycle_Count" => PowerCycleCount,
            "Runtime_Bad_Block" => RuntimeBadBlock,
            "End-to-End_Error" => EndToEndError,
            "Reported_Uncorrect" => ReportedUncorrect,
            "Command_Timeout" => CommandTimeout,
            "Hardware_ECC_Recovered" => HardwareEccRecovered,
            "Reallocated_Event_Count" => ReallocatedEventCount,
            "Current_Pending_Sector" => CurrentPendingSector,
            "Offline_Uncorrectable" => OfflineUncorrectable,
            "UDMA_CRC_Error_Count" => UdmaCrcErrorCount,
            "Unused_Rsvd_Blk_Cnt_Tot" => UnusedRsvdBlkCntTot,
            "Spin_Up_Time" => SpinUpTime,
            "Start_Stop_Count" => StartStopCount,
            "Seek_Error_Rate" => SeekErrorRate,
            "Spin_Retry_Count" => SpinRetryCount,
            "Airflow_Temperature_Cel" => AirflowTemperature,
            "Temperature_Celsius" => TemperatureCelsius,
            "Load_Cycle_Count" => LoadCycleCount,
            "Total_LBAs_Written" => TotalLbasWritten,
            "Total_LBAs_Read" => TotalLbasRead,
            _ => return None,
        };
        Some(attr)
    }

    /// Metric name suffix under `smartctl_physical_disk_`
    pub fn metric_suffix(&self) -> &'static str {
        use DiskAttribute::*;
        match self {
            RawReadErrorRate => "rawReadErrorRate",
            ReallocatedSectorCt => "reallocatedSectorCt",
            PowerOnHours => "powerOnHours",
            PowerCycleCount => "powerCycleCount",
            RuntimeBadBlock => "runtimeBadBlock",
            EndToEndError => "endToEndError",
            ReportedUncorrect => "reportedUncorrect",
            CommandTimeout => "commandTimeout",
            HardwareEccRecovered => "hardwareECCRecovered",
            ReallocatedEventCount => "reallocatedEventCount",
            CurrentPendingSector => "currentPendingSector",
            OfflineUncorrectable => "offlineUncorrectable",
            UdmaCrcErrorCount => "uDMACRCErrorCount",
            UnusedRsvdBlkCntTot => "unusedRsvdBlkCntTot",
            GrownDefects => "grownDefects",
            SpinUpTime => "spinUpTime",
            StartStopCount => "startStopCount",
            SeekErrorRate => "seekErrorRate",
            SpinRetryCount => "spinRetryCount",
            AirflowTemperature => "airflowTemperature",
            TemperatureCelsius => "temperatureCelsius",
            LoadCycleCount => "loadCycleCount",
            TotalLbasWritten => "totalLBAsWritten",
            TotalLbasRead => "totalLBAsRead",
        }
    }

    /// Metric help text
    pub fn help(&self) -> &'static str {
        use DiskAttribute::*;
        match self {
            RawReadErrorRate => "Smartctl raw read error rate",
            ReallocatedSectorCt => "Smartctl reallocated sector count",
            PowerOnHours => "Smartctl power on hours",
            PowerCycleCount => "Smartctl power cycle count",
            RuntimeBadBlock => "Smartctl runtime bad block",
            EndToEndError => "Smartctl end to end error",
            ReportedUncorrect => "Smartctl reported uncorrect",
            CommandTimeout => "Smartctl command timeout",
            HardwareEccRecovered => "Smartctl hardware ECC recovered",
            ReallocatedEventCount => "Smartctl reallocated event count",
            CurrentPendingSector => "Smartctl current pending sector",
            OfflineUncorrectable => "Smartctl offline uncorrectable",
            UdmaCrcErrorCount => "Smartctl UDMA CRC error count",
            UnusedRsvdBlkCntTot => "Smartctl unused reserved block count total",
            GrownDefects => "Smartctl elements in grown defect list",
            SpinUpTime => "Smartctl spin up time",
            StartStopCount => "Smartctl start stop count",
            SeekErrorRate => "Smartctl seek error rate",
            SpinRetryCount => "Smartctl spin retry count",
            AirflowTemperature => "Smartctl airflow temperature",
            TemperatureCelsius => "Smartctl temperature celsius",
            LoadCycleCount => "Smartctl load cycle count",
            TotalLbasWritten => "Smartctl total LBAs written",
            TotalLbasRead => "Smartctl total LBAs read",
        }
    }
}

// =============================================================================
// Section Lexer
// =============================================================================

/// Lexer state while walking the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Before the first banner, or inside a section we do not read
    SeekingMarker,
    /// `=== START OF INFORMATION SECTION ===`
    Information,
    /// `=== START OF READ SMART DATA SECTION ===`
    SmartData,
}

impl Section {
    fn classify(segment: &str) -> Self {
        if segment.contains(INFORMATION_TAG) {
            Section::Information
        } else if segment.contains(SMART_DATA_TAG) {
            Section::SmartData
        } else {
            Section::SeekingMarker
        }
    }
}

/// Splits a report on [`SECTION_MARKER`] and tags each segment.
pub struct SectionLexer<'a> {
    segments: std::str::Split<'a, &'static str>,
}

impl<'a> SectionLexer<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            segments: raw.split(SECTION_MARKER),
        }
    }
}

impl<'a> Iterator for SectionLexer<'a> {
    type Item = (Section, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.segments
            .next()
            .map(|segment| (Section::classify(segment), segment))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a smartctl report.
///
/// Only the first information section and the first SMART data section are
/// read. Missing sections leave their half of the report at its default.
pub fn parse_health_report(raw: &str) -> DiskHealthReport {
    let mut info: Option<DiskInfo> = None;
    let mut attributes: Option<DiskAttributes> = None;

    for (section, body) in SectionLexer::new(raw) {
        match section {
            Section::Information if info.is_none() => info = Some(parse_info(body)),
            Section::SmartData if attributes.is_none() => {
                attributes = Some(parse_attributes(body))
            }
            _ => {}
        }
    }

    DiskHealthReport {
        info: info.unwrap_or_default(),
        attributes: attributes.unwrap_or_default(),
    }
}

fn parse_info(body: &str) -> DiskInfo {
    let mut info = DiskInfo::default();

    for line in body.lines() {
        let Some((key, value)) = line.trim().split_once(": ") else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "Device Model" => info.model = value,
            "Serial Number" => info.serial_number = value,
            "Rotation Rate" => info.rotation_rate = value,
            "Form Factor" => info.form_factor = value,
            _ => {}
        }
    }

    info
}

fn parse_attributes(body: &str) -> DiskAttributes {
    let mut attrs = DiskAttributes::default();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() >= ATTRIBUTE_ROW_FIELDS {
            // `26 (0 22 0 0 0)` is already split, so column 9 is just `26`
            if let Some(attr) = DiskAttribute::from_table_name(fields[ATTRIBUTE_NAME_COLUMN]) {
                *attrs.slot_mut(attr) = parse_raw_value(fields[RAW_VALUE_COLUMN]);
            }
        } else if let Some((key, value)) = line.split_once(": ") {
            if key.trim() == GROWN_DEFECTS_KEY {
                attrs.grown_defects = parse_raw_value(value);
            }
        }
    }

    attrs
}
