//! Lenient conversion of locale-formatted spreadsheet cells into integer
//! currency units, and resource-code expansion for revenue exports.
//!
//! Malformed numeric text becomes 0 instead of failing ingestion.

use crate::categories::PrefixTable;
use crate::sheet::Cell;

/// Converts a cell into integer currency units.
///
/// Numbers are rounded. Text is read as a Brazilian-formatted amount: the
/// first `.` is dropped as a thousands separator and the first `,` becomes
/// the decimal point. A value wrapped in parentheses is negative.
/// Anything unparsable yields 0.
pub fn normalize_number(cell: &Cell) -> i64 {
    match cell {
        Cell::Empty => 0,
        Cell::Number(n) => round_half_up(*n),
        Cell::Text(s) => normalize_str(s),
    }
}

pub fn normalize_str(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0;
    }

    let is_negative = trimmed.starts_with('(') && trimmed.ends_with(')');

    // Only the first separator of each kind is rewritten, so "12.5" reads
    // as 125. Already-ingested history depends on this.
    let rewritten = trimmed.replacen('.', "", 1).replacen(',', ".", 1);
    let numeric: String = rewritten
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match parse_float_prefix(&numeric) {
        Some(value) if is_negative => -round_half_up(value),
        Some(value) => round_half_up(value),
        None => 0,
    }
}

/// Rounds half toward positive infinity (`-2.5` becomes `-2`).
fn round_half_up(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value + 0.5).floor() as i64
}

/// Parses the longest leading `-?digits[.digits]` run. Trailing garbage
/// (a second `.`, a stray `-`) ends the number instead of rejecting it.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;

    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if frac_end > frac_start || digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    s[..end].parse::<f64>().ok()
}

/// Removes leading whitespace from a text label.
pub fn trim_label(value: &str) -> String {
    value.trim_start().to_string()
}

/// Expands a bare resource code into its full "code - name" label using the
/// first registered prefix that matches. Unmatched values pass through.
pub fn expand_resource_code(value: &str, prefixes: &PrefixTable) -> String {
    prefixes.expand(value)
}
