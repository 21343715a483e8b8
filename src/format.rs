//! human-readable renditions of metric values.

use crate::metric::Metric;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// formats a byte count with a binary (1024) unit prefix and one decimal place.
pub fn format_bytes(bytes: u64) -> String {
    scaled(bytes as f64)
}

/// formats a throughput, in bytes per second.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", scaled(bytes_per_sec.max(0.0)))
}

/// formats any metric, for places that do not care about its type.
pub fn format_metric(metric: &Metric) -> String {
    match metric {
        Metric::Percentage(p) => format!("{p:.1}%"),
        Metric::Bytes(b) => format_bytes(*b),
        Metric::Temperature(t) => format!("{t}°C"),
        Metric::Rate(r) => format_rate(*r),
        Metric::Text(t) => t.clone(),
        Metric::Processes(rows) => format!("{} processes", rows.len()),
        Metric::Unavailable => "N/A".to_owned(),
    }
}

fn scaled(mut value: f64) -> String {
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
