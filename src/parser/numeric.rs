//! Numeric coercion shared by the parsers.
//!
//! Two modes exist and are deliberately kept apart:
//!
//! - [`parse_strict`] for controller detail fields, where ssacli always prints
//!   a plain number. A bad token fails the whole parse.
//! - [`parse_raw_value`] for the SMART `RAW_VALUE` column, whose formatting
//!   varies between smartctl versions and drive vendors. A bad token only
//!   drops that one attribute.

use crate::error::{Error, Result};

/// Parse a token that must be a number.
///
/// `field` names the source key and is carried in the error. `NaN` and
/// infinities are rejected like any other non-numeric token.
pub fn parse_strict(field: &str, token: &str) -> Result<f64> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::malformed_number(field, token))
}

/// Parse a SMART raw value, returning `None` when it is not numeric.
///
/// Only the part before the first `/` is used, so `"0/200164573"` reads as
/// `0`. Trailing annotations such as `"26 (0 22 0 0 0)"` are normally split
/// off by the caller's whitespace tokenizer already.
pub fn parse_raw_value(token: &str) -> Option<f64> {
    let head = match token.find('/') {
        Some(idx) => &token[..idx],
        None => token,
    };
    head.trim().parse::<f64>().ok()
}
