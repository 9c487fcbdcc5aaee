//! Kubernetes resource-quantity decoding
//!
//! The metrics API reports usage as quantity strings such as `250m` (CPU)
//! or `512Mi` (memory). The agent needs CPU as fractional cores and memory
//! as raw bytes; anything unparsable surfaces as the zero value, matching
//! the no-defensive-validation policy of the pipeline.

/// Decimal and binary suffixes accepted by the Kubernetes quantity format.
/// Two-character binary suffixes are matched first.
const SUFFIXES: [(&str, f64); 15] = [
    ("Ki", 1024.0),
    ("Mi", 1024.0 * 1024.0),
    ("Gi", 1024.0 * 1024.0 * 1024.0),
    ("Ti", 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Pi", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("Ei", 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0),
    ("n", 1e-9),
    ("u", 1e-6),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// Parse a quantity string into a plain number. `None` for empty or
/// malformed input.
pub fn parse(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, scale) in SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|value| value * scale);
        }
    }

    // Plain or scientific notation, e.g. "2" or "12e6".
    raw.parse::<f64>().ok()
}

/// CPU usage as fractional cores. Zero when absent or malformed.
pub fn cpu_cores(raw: &str) -> f64 {
    parse(raw).unwrap_or(0.0)
}

/// Memory usage as raw bytes. Zero when absent, malformed, or negative.
pub fn memory_bytes(raw: &str) -> u64 {
    parse(raw).map(|value| value.max(0.0) as u64).unwrap_or(0)
}
