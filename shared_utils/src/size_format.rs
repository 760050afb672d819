//! Size Formatting Module
//!
//! Human readable byte counts for the batch report (base 1024).

const UNIT: u64 = 1024;
const PREFIXES: &[u8; 6] = b"KMGTPE";

/// Render a byte count as `512B`, `1.5KB`, `3.0MB`, ...
///
/// Values below 1024 are printed as whole bytes, everything else with one
/// decimal place and the largest prefix that keeps the mantissa below 1024.
pub fn human_readable_size(bytes: u64) -> String {
    if bytes < UNIT {
        return format!("{}B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0usize;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!(
        "{:.1}{}B",
        bytes as f64 / div as f64,
        PREFIXES[exp] as char
    )
}

/// Parse a string produced by [`human_readable_size`] back into bytes.
///
/// The result is only as precise as the rendered string (one decimal).
pub fn parse_human_size(text: &str) -> Option<u64> {
    let body = text.trim().strip_suffix('B')?;
    let (number, multiplier) = match body.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let exp = PREFIXES.iter().position(|p| *p as char == c)? as u32 + 1;
            (&body[..body.len() - 1], UNIT.checked_pow(exp)?)
        }
        _ => (body, 1),
    };

    if multiplier == 1 {
        return number.parse::<u64>().ok();
    }
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64).round() as u64)
}
