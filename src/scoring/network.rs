//! Network posture adjustment.

use crate::core::report::NetworkReport;
use crate::scoring::sanitize_range;

/// Lower bound of the network adjustment.
pub const NETWORK_ADJ_MIN: f64 = -0.12;

/// Upper bound of the network adjustment.
pub const NETWORK_ADJ_MAX: f64 = 0.45;

/// Response headers every well-configured site is expected to send.
const SECURITY_HEADERS: [&str; 5] = [
    "strict-transport-security",
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
    "referrer-policy",
];

fn tls_adjustment(version: Option<&str>) -> f64 {
    let Some(version) = version else {
        return 0.25;
    };
    let v = version.trim().to_ascii_lowercase().replace([' ', '_'], "");
    if v.contains("1.3") {
        -0.04
    } else if v.contains("1.2") {
        0.0
    } else if v.starts_with("ssl") || v.contains("1.1") || v.contains("1.0") || v == "tlsv1" || v == "tls1" {
        0.15
    } else {
        // unrecognized version string
        0.0
    }
}

fn certificate_adjustment(valid: Option<bool>) -> f64 {
    match valid {
        Some(false) => 0.30,
        Some(true) => -0.03,
        None => 0.0,
    }
}

fn header_adjustment(report: &NetworkReport) -> f64 {
    let missing = SECURITY_HEADERS
        .iter()
        .filter(|h| !report.has_header(h))
        .count();
    if missing == 0 {
        -0.03
    } else {
        0.08 * missing as f64 / SECURITY_HEADERS.len() as f64
    }
}

fn dnssec_adjustment(dnssec: Option<bool>) -> f64 {
    match dnssec {
        Some(true) => -0.03,
        Some(false) => 0.02,
        None => 0.0,
    }
}

/// Computes the risk nudge from a host's transport posture.
///
/// Absent signals are neutral. The sum is clamped to `[-0.12, 0.45]`.
pub fn network_adjustment(report: &NetworkReport) -> f64 {
    let sum = tls_adjustment(report.tls_version.as_deref())
        + certificate_adjustment(report.certificate_valid)
        + header_adjustment(report)
        + dnssec_adjustment(report.dnssec);
    sanitize_range(sum, NETWORK_ADJ_MIN, NETWORK_ADJ_MAX)
}
