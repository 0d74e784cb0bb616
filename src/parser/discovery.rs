//! Summary output parsing for entity discovery.
//!
//! The `show status` commands list one controller, physical drive or logical
//! drive per line:
//!
//! ```text
//! Smart Array P440ar in Slot 0 (Embedded)    Status: OK
//! physicaldrive 1I:1:1 (port 1I:box 1:bay 1, 600 GB): OK
//! logicaldrive 1 (558.9 GB, RAID 1): OK
//! ```

/// Slot ids from `ssacli ctrl all show status`
pub fn parse_controller_slots(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| slot_id(line).map(str::to_string))
        .collect()
}

/// The token following a literal `Slot` token
pub(crate) fn slot_id(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    fields.find(|f| *f == "Slot")?;
    fields.next()
}

/// Drive ids from `ssacli ctrl slot=N pd all show status`
pub fn parse_physical_drive_ids(raw: &str) -> Vec<String> {
    ids_after_keyword(raw, "physicaldrive")
}

/// Drive numbers from `ssacli ctrl slot=N ld all show status`
pub fn parse_logical_drive_ids(raw: &str) -> Vec<String> {
    ids_after_keyword(raw, "logicaldrive")
}

fn ids_after_keyword(raw: &str, keyword: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(first), Some(id)) if first == keyword => Some(id.to_string()),
                _ => None,
            }
        })
        .collect()
}
