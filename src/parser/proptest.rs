//! Property-Based Tests for the Parsers
//!
//! # Test Properties
//!
//! 1. **Slash Truncation**: `"N/M"` raw values read as `N`
//! 2. **Annotation Isolation**: `"V (anything)"` in the raw column reads as `V`
//! 3. **Absence**: attributes missing from the table stay `None`
//! 4. **Determinism**: same input always produces the same records
//! 5. **Block Order**: entity ids come back in text order

#![cfg(test)]

use proptest::prelude::*;

use super::numeric::parse_raw_value;
use super::smartctl::parse_health_report;
use super::ssacli::parse_physical_drives;

const HEADER: &str = "=== START OF READ SMART DATA SECTION ===\n";

fn attribute_row(name: &str, raw: &str) -> String {
    format!("  9 {name:<23} 0x0032   093   093   000    Old_age   Always       -       {raw}\n")
}

/// Strategy for bay-style drive ids like `1I:1:12`
fn drive_id_strategy() -> impl Strategy<Value = String> {
    (1u8..=4, prop::sample::select(vec!['I', 'E']), 1u8..=2, 1u8..=24)
        .prop_map(|(port, kind, boxn, bay)| format!("{port}{kind}:{boxn}:{bay}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_slash_values_take_numerator(n in 0u64..1_000_000_000, m in 0u64..1_000_000_000) {
        prop_assert_eq!(parse_raw_value(&format!("{n}/{m}")), Some(n as f64));
    }

    #[test]
    fn prop_annotated_raw_value_reads_leading_number(v in 0u32..100_000, tail in "[0-9 ]{0,20}") {
        let raw = format!("{HEADER}{}", attribute_row("Power_On_Hours", &format!("{v} ({tail})")));
        let report = parse_health_report(&raw);
        prop_assert_eq!(report.attributes.power_on_hours, Some(v as f64));
    }

    #[test]
    fn prop_absent_attribute_stays_none(v in 0u32..100_000) {
        let raw = format!("{HEADER}{}", attribute_row("Power_On_Hours", &v.to_string()));
        let report = parse_health_report(&raw);
        prop_assert_eq!(report.attributes.grown_defects, None);
        prop_assert_eq!(report.attributes.temperature_celsius, None);
    }

    #[test]
    fn prop_health_report_is_deterministic(text in "\\PC{0,400}") {
        prop_assert_eq!(parse_health_report(&text), parse_health_report(&text));
    }

    #[test]
    fn prop_physical_drive_ids_in_order(ids in prop::collection::vec(drive_id_strategy(), 0..8)) {
        let raw: String = ids
            .iter()
            .map(|id| format!("      physicaldrive {id}\n         Status: OK\n"))
            .collect();
        let drives = parse_physical_drives(&raw).unwrap();
        let parsed: Vec<String> = drives.into_iter().map(|d| d.id).collect();
        prop_assert_eq!(parsed, ids);
    }
}
