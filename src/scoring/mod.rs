//! Risk scoring.
//!
//! Pure, deterministic functions that fuse a verdict set and the optional
//! analyzer reports into one probability, a `[0, 5]` risk value and a fuzzy
//! category breakdown. Nothing in this module allocates shared state, logs,
//! or returns an error: every non-finite input is sanitized first.
//!
//! ## Entry points
//!
//! - [`score_url`] - vendor consensus blended with ML and network posture
//! - [`score_specialized`] - vendor consensus blended with a file, VPN
//!   profile or social handle report
//!
//! The numeric constants are fixed calibrations. Changing one is a
//! recalibration and should be treated as a behavior change.

mod consensus;
mod membership;
mod network;
mod scorer;

pub use consensus::{vendor_consensus, VendorConsensus};
pub use membership::membership;
pub use network::network_adjustment;
pub use scorer::{confidence_pull, score_specialized, score_url, RiskAssessment};

/// Replaces a non-finite value with `0.0`.
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Sanitizes and clamps a value into `[0, 1]`.
pub fn sanitize_unit(value: f64) -> f64 {
    sanitize(value).clamp(0.0, 1.0)
}

/// Sanitizes and clamps a value into `[min, max]`.
pub fn sanitize_range(value: f64, min: f64, max: f64) -> f64 {
    sanitize(value).clamp(min, max)
}
