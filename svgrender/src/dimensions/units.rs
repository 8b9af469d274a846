//! SVG length parsing.
//!
//! A length is a leading number followed by an optional unit suffix, e.g. `"10pt"`, `" 2.5 in"`
//! or `"100"`. Absolute units are converted to CSS pixels at 96 DPI.

/// Pixels per unit for the absolute units we understand.
const UNIT_TO_PX: &[(&str, f64)] = &[
    ("", 1.0),
    ("px", 1.0),
    ("pt", 96.0 / 72.0),
    ("pc", 16.0),
    ("mm", 96.0 / 25.4),
    ("cm", 96.0 / 2.54),
    ("in", 96.0),
];

/// Pixel factor for a lowercased, trimmed unit token, if it is one of the absolute units.
pub fn unit_factor(unit: &str) -> Option<f64> {
    UNIT_TO_PX.iter().find(|(name, _)| *name == unit).map(|(_, factor)| *factor)
}

/// Parse an SVG length into pixels.
///
/// Returns `0.0` when there is no usable length: empty input, no leading number, or a
/// percentage. A declared `0` is indistinguishable from "unspecified".
pub fn parse_length(raw: &str) -> f64 {
    let Some((value, rest)) = split_leading_number(raw) else {
        return 0.0;
    };

    let unit = rest.trim().to_lowercase();

    // Percentages depend on a viewport we don't have, so they're unusable. Every other unknown
    // unit is taken as raw pixels. Keep these two branches distinct.
    if unit.ends_with('%') {
        return 0.0;
    }

    match unit_factor(&unit) {
        Some(factor) => value * factor,
        None => value,
    }
}

/// Split `raw` into its leading number and the remainder.
///
/// Accepts optional leading whitespace, an optional sign, then either `digits`, `digits.digits`
/// or `.digits`. A trailing `.` without digits is left in the remainder.
fn split_leading_number(raw: &str) -> Option<(f64, &str)> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let has_int = end > int_start;

    if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
    } else if !has_int {
        return None;
    }

    let value = trimmed[..end].parse::<f64>().ok()?;
    Some((value, &trimmed[end..]))
}
