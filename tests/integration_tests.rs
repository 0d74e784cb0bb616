//! RAID Health Exporter Integration Tests
//!
//! - Feature 1: smartctl report parsing
//! - Feature 2: ssacli detail parsing
//! - Feature 3: Collection and exposition end to end

// =============================================================================
// Feature 1: smartctl Report Parsing
// =============================================================================

mod smartctl_tests {
    use raid_health_exporter::parser::{parse_health_report, DiskAttribute};

    const SATA_REPORT: &str = "\
smartctl 7.1 2019-12-30 r5022 [x86_64-linux-4.18.0-305.el8.x86_64] (local build)
Copyright (C) 2002-19, Bruce Allen, Christian Franke, www.smartmontools.org

=== START OF INFORMATION SECTION ===
Model Family:     Samsung based SSDs
Device Model:     Samsung SSD 860 EVO 500GB
Serial Number:    S3Z1NB0K123456A
LU WWN Device Id: 5 002538 e40a1b2c3
Firmware Version: RVT02B6Q
User Capacity:    500,107,862,016 bytes [500 GB]
Sector Size:      512 bytes logical/physical
Rotation Rate:    Solid State Device
Form Factor:      2.5 inches
Device is:        In smartctl database [for details use: -P show]
ATA Version is:   ACS-4 T13/BSR INCITS 529 revision 5
Local Time is:    Mon Oct 19 10:00:00 2026
SMART support is: Available - device has SMART capability.
SMART support is: Enabled

=== START OF READ SMART DATA SECTION ===
SMART Attributes Data Structure revision number: 1
Vendor Specific SMART Attributes with Thresholds:
ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
  5 Reallocated_Sector_Ct   0x0033   100   100   010    Pre-fail  Always       -       0
  9 Power_On_Hours          0x0032   095   095   000    Old_age   Always       -       21843
 12 Power_Cycle_Count       0x0032   099   099   000    Old_age   Always       -       112
177 Wear_Leveling_Count     0x0013   099   099   000    Pre-fail  Always       -       7
179 Used_Rsvd_Blk_Cnt_Tot   0x0013   100   100   010    Pre-fail  Always       -       0
181 Program_Fail_Cnt_Total  0x0032   100   100   010    Old_age   Always       -       0
183 Runtime_Bad_Block       0x0013   100   100   010    Pre-fail  Always       -       0
187 Reported_Uncorrect      0x0032   100   100   000    Old_age   Always       -       0
190 Airflow_Temperature_Cel 0x0032   071   052   000    Old_age   Always       -       29
195 Hardware_ECC_Recovered  0x001a   200   200   000    Old_age   Always       -       0
199 UDMA_CRC_Error_Count    0x003e   100   100   000    Old_age   Always       -       0
235 Unknown_Attribute       0x0012   099   099   000    Old_age   Always       -       98
241 Total_LBAs_Written      0x0032   099   099   000    Old_age   Always       -       31234567890
";

    const SAS_REPORT: &str = "\
=== START OF INFORMATION SECTION ===
Vendor:               HP
Product:              EG0600FBVFP
Revision:             HPD4
Rotation Rate:        10000 rpm
Form Factor:          2.5 inches
Serial number:        S0K1ABCD

=== START OF READ SMART DATA SECTION ===
SMART Health Status: OK

Current Drive Temperature:     31 C
Drive Trip Temperature:        65 C

Elements in grown defect list: 71
";

    #[test]
    fn test_sata_report() {
        let report = parse_health_report(SATA_REPORT);

        assert_eq!(report.info.model, "Samsung SSD 860 EVO 500GB");
        assert_eq!(report.info.serial_number, "S3Z1NB0K123456A");
        assert_eq!(report.info.rotation_rate, "Solid State Device");
        assert_eq!(report.info.form_factor, "2.5 inches");

        let attrs = &report.attributes;
        assert_eq!(attrs.reallocated_sector_ct, Some(0.0));
        assert_eq!(attrs.power_on_hours, Some(21843.0));
        assert_eq!(attrs.power_cycle_count, Some(112.0));
        assert_eq!(attrs.runtime_bad_block, Some(0.0));
        assert_eq!(attrs.airflow_temperature, Some(29.0));
        assert_eq!(attrs.total_lbas_written, Some(31234567890.0));
        assert_eq!(attrs.total_lbas_read, None);
        assert_eq!(attrs.grown_defects, None);
        assert_eq!(attrs.present().count(), 9);
    }

    #[test]
    fn test_sas_report() {
        let report = parse_health_report(SAS_REPORT);

        // SAS drives print Product/Serial number; only the exact keys are read
        assert_eq!(report.info.model, "");
        assert_eq!(report.info.serial_number, "");
        assert_eq!(report.info.rotation_rate, "10000 rpm");

        assert_eq!(report.attributes.grown_defects, Some(71.0));
        assert_eq!(report.attributes.get(DiskAttribute::GrownDefects), Some(71.0));
        assert_eq!(report.attributes.temperature_celsius, None);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_raw_read_error_rate_scenario() {
        let raw = "=== START OF READ SMART DATA SECTION ===\n  1 Raw_Read_Error_Rate 0x010f 083 064 044 Pre-fail Always - 0/200164573\n";
        let report = parse_health_report(raw);
        assert_eq!(report.attributes.raw_read_error_rate, Some(0.0));
        assert_eq!(report.attributes.grown_defects, None);
    }

    #[test]
    fn test_zero_is_distinct_from_absent() {
        let report = parse_health_report(SATA_REPORT);
        assert_eq!(report.attributes.udma_crc_error_count, Some(0.0));
        assert_eq!(report.attributes.current_pending_sector, None);
    }

    #[test]
    fn test_idempotent() {
        assert_eq!(parse_health_report(SATA_REPORT), parse_health_report(SATA_REPORT));
    }
}

// =============================================================================
// Feature 2: ssacli Detail Parsing
// =============================================================================

mod ssacli_tests {
    use assert_matches::assert_matches;
    use raid_health_exporter::parser::{
        parse_inventory_block, parse_inventory_blocks, parse_logical_drives,
        parse_physical_drives, split_inventory_blocks, EntityField, PhysicalDriveSchema,
    };
    use raid_health_exporter::Error;

    const PD_ALL_DETAIL: &str = "
Smart Array P440ar in Slot 0 (Embedded)

   Array A

      physicaldrive 1I:1:1
         Port: 1I
         Box: 1
         Bay: 1
         Status: OK
         Drive Type: Data Drive
         Interface Type: SAS
         Size: 600 GB
         Rotational Speed: 10000
         Firmware Revision: HPD4
         Serial Number: S0K1ABCD
         Model: HP      EG0600FBVFP
         Current Temperature (C): 27
         Maximum Temperature (C): 40

      physicaldrive 1I:1:2
         Port: 1I
         Box: 1
         Bay: 2
         Status: Predictive Failure
         Drive Type: Data Drive
         Interface Type: SAS
         Size: 600 GB
         Serial Number: S0K1EFGH
         Model: HP      EG0600FBVFP
         Current Temperature (C): 29
         Maximum Temperature (C): 44
";

    #[test]
    fn test_two_physical_drive_blocks() {
        let drives = parse_physical_drives(PD_ALL_DETAIL).unwrap();
        assert_eq!(drives.len(), 2);

        assert_eq!(drives[0].id, "1I:1:1");
        assert_eq!(drives[1].id, "1I:1:2");
        assert_eq!(drives[1].text(EntityField::Bay), "2");
        assert_eq!(drives[1].number(EntityField::MaximumTemperature), Some(44.0));

        assert_eq!(drives[0].status_value(), 1.0);
        assert_eq!(drives[1].status_value(), 0.0);
        assert_eq!(drives[1].status(), "Predictive Failure");
    }

    #[test]
    fn test_generic_entry_point_matches_wrapper() {
        assert_eq!(
            parse_inventory_blocks(PD_ALL_DETAIL, &PhysicalDriveSchema).unwrap(),
            parse_physical_drives(PD_ALL_DETAIL).unwrap()
        );
    }

    #[test]
    fn test_logical_drive_failed() {
        let raw = "
Smart Array P440ar in Slot 0 (Embedded)

   Array A

      Logical Drive: 1
         Size: 558.9 GB
         Fault Tolerance: 1
         Cylinders: 65535
         Status: Failed
         Caching:  Disabled
";
        let drives = parse_logical_drives(raw).unwrap();
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].id, "1");
        assert_eq!(drives[0].status_value(), 0.0);
        assert_eq!(drives[0].text(EntityField::Caching), "Disabled");
    }

    #[test]
    fn test_malformed_strict_field_is_hard_error() {
        let raw = PD_ALL_DETAIL.replace("Current Temperature (C): 29", "Current Temperature (C): N/A");
        assert_matches!(
            parse_physical_drives(&raw),
            Err(Error::MalformedNumber { ref token, .. }) if token == "N/A"
        );
    }

    #[test]
    fn test_per_block_parse_isolates_malformed_drive() {
        let raw = PD_ALL_DETAIL.replace("Current Temperature (C): 29", "Current Temperature (C): N/A");
        let blocks = split_inventory_blocks(&raw, &PhysicalDriveSchema);
        assert_eq!(blocks.len(), 2);

        let first = parse_inventory_block(blocks[0], &PhysicalDriveSchema).unwrap().unwrap();
        assert_eq!(first.id, "1I:1:1");
        assert_eq!(first.number(EntityField::CurrentTemperature), Some(27.0));
        assert_matches!(
            parse_inventory_block(blocks[1], &PhysicalDriveSchema),
            Err(Error::MalformedNumber { .. })
        );
    }

    #[test]
    fn test_empty_dump() {
        assert!(parse_physical_drives("").unwrap().is_empty());
        assert!(parse_logical_drives("\n\n").unwrap().is_empty());
    }
}

// =============================================================================
// Feature 3: Collection and Exposition
// =============================================================================

mod end_to_end_tests {
    use std::sync::Arc;

    use raid_health_exporter::collector::InMemoryCommandRunner;
    use raid_health_exporter::{exporter, Collector, CollectorConfig};

    fn runner() -> InMemoryCommandRunner {
        InMemoryCommandRunner::new()
            .with_output(
                "ssacli ctrl all show status",
                "Smart Array P440ar in Slot 0 (Embedded)\n   Controller Status: OK\n   Battery/Capacitor Status: Charging\n",
            )
            .with_output(
                "ssacli ctrl slot=0 pd all show status",
                "   physicaldrive 1I:1:1 (port 1I:box 1:bay 1, 600 GB): OK\n",
            )
            .with_output(
                "ssacli ctrl slot=0 ld all show status",
                "   logicaldrive 1 (558.9 GB, RAID 1): OK\n",
            )
            .with_output(
                "ssacli ctrl slot=0 pd 1I:1:1 show detail",
                "physicaldrive 1I:1:1\n   Status: OK\n   Bay: 1\n   Current Temperature (C): 27\n",
            )
            .with_output(
                "ssacli ctrl slot=0 ld 1 show",
                "Logical Drive: 1\n   Status: OK\n   Size: 558.9 GB\n",
            )
            .with_output(
                "smartctl -iA -d cciss,0 /dev/sda",
                "=== START OF READ SMART DATA SECTION ===\nElements in grown defect list: 3\n",
            )
    }

    #[tokio::test]
    async fn test_scrape_renders_all_sources() {
        let collector = Collector::with_runner(CollectorConfig::default(), Arc::new(runner()));
        let snapshot = collector.collect().await;
        assert_eq!(snapshot.errors, 0);

        let text = exporter::render(&snapshot).unwrap();
        assert!(text
            .lines()
            .any(|l| l.starts_with("smartctl_physical_disk_grownDefects{") && l.ends_with(" 3")));
        assert!(text
            .lines()
            .any(|l| l.starts_with("ssacli_phys_disk_status{") && l.ends_with(" 1")));
        assert!(text
            .lines()
            .any(|l| l.starts_with("ssacli_log_disk_status{") && l.ends_with(" 1")));
        assert!(text.lines().any(|l| l.starts_with("ssacli_sum_status{")
            && l.contains("component=\"controller\"")
            && l.ends_with(" 1")));
        assert!(text.lines().any(|l| l.starts_with("ssacli_sum_status{")
            && l.contains("status=\"Charging\"")
            && l.ends_with(" 0")));
        assert!(!text
            .lines()
            .any(|l| l.starts_with("smartctl_physical_disk_powerOnHours{")));
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let collector = Collector::with_runner(CollectorConfig::default(), Arc::new(runner()));
        let snapshot = collector.collect().await;

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["controllers"][0], "0");
        assert_eq!(json["controller_status"][0]["fields"]["ControllerStatus"], "OK");
        assert_eq!(json["physical_drives"][0]["drive"]["id"], "1I:1:1");
        assert_eq!(json["physical_drives"][0]["drive"]["fields"]["Status"], "OK");
        assert_eq!(
            json["physical_drives"][0]["drive"]["fields"]["CurrentTemperature"],
            27.0
        );
        assert!(json["disk_health"][0]["report"]["attributes"]["power_on_hours"].is_null());
    }
}
