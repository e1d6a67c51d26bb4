//! Number formatting utilities.

use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Format a duration in the compact `1h2m3.5s` style.
///
/// Sub-second values use the largest unit that keeps the integer part
/// non-zero (`850ns`, `85µs`, `1.5ms`). Fractions carry no trailing zeros
/// and zero is rendered as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", decimal(nanos, NANOS_PER_MICRO, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", decimal(nanos, NANOS_PER_MILLI, 6));
    }

    let secs = nanos / NANOS_PER_SEC;
    let (hours, minutes) = (secs / 3600, secs / 60 % 60);
    let seconds = decimal(secs % 60 * NANOS_PER_SEC + nanos % NANOS_PER_SEC, NANOS_PER_SEC, 9);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&seconds);
    out.push('s');
    out
}

/// `value / unit` written exactly, with up to `digits` fractional digits.
fn decimal(value: u128, unit: u128, digits: usize) -> String {
    let (whole, frac) = (value / unit, value % unit);
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0digits$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Format a byte count with a single-letter binary unit (`8M`, `1.5G`, `512B`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 6] = [
        (1 << 60, "E"),
        (1 << 50, "P"),
        (1 << 40, "T"),
        (1 << 30, "G"),
        (1 << 20, "M"),
        (1 << 10, "K"),
    ];

    if bytes == 0 {
        return "0B".to_string();
    }

    let (scale, unit) = UNITS
        .iter()
        .copied()
        .find(|&(scale, _)| bytes >= scale)
        .unwrap_or((1, "B"));

    let value = format!("{:.1}", bytes as f64 / scale as f64);
    format!("{}{unit}", value.strip_suffix(".0").unwrap_or(&value))
}
