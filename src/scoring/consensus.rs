//! Vendor consensus aggregation.

use crate::core::types::{VerdictMap, VerdictStatus};
use crate::scoring::{sanitize_range, sanitize_unit};

const ADJ_TWO_MALICIOUS: f64 = 0.18;
const ADJ_MALICIOUS_AND_SUSPICIOUS: f64 = 0.12;
const ADJ_TWO_SUSPICIOUS: f64 = 0.05;
const ADJ_ALL_CLEAN: f64 = -0.05;
const ADJ_MIN: f64 = -0.05;
const ADJ_MAX: f64 = 0.25;

/// Aggregate view of a verdict set.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VendorConsensus {
    /// Reliability-weighted mean verdict weight over decisive verdicts.
    pub weighted_score: f64,

    /// Agreement correction, within `[-0.05, 0.25]`.
    pub adjustment: f64,

    /// Fraction of verdicts that are decisive.
    pub confidence: f64,

    /// `weighted_score + adjustment`, clamped to `[0, 1]`.
    pub score: f64,

    /// Highest single decisive verdict weight.
    pub peak_weight: f64,

    /// Number of `Malicious` verdicts.
    pub malicious: usize,

    /// Number of `Suspicious` verdicts.
    pub suspicious: usize,

    /// Number of `Clean` verdicts.
    pub clean: usize,

    /// Total number of verdicts, decisive or not.
    pub total: usize,
}

impl VendorConsensus {
    /// Number of decisive verdicts.
    pub fn decisive(&self) -> usize {
        self.malicious + self.suspicious + self.clean
    }

    /// Returns `true` if there is at least one decisive verdict and all are `Clean`.
    pub fn all_clean(&self) -> bool {
        self.clean > 0 && self.malicious == 0 && self.suspicious == 0
    }
}

/// Computes the reliability-weighted consensus of a verdict set.
///
/// `Unknown` and `Error` verdicts carry no weight but lower the confidence.
/// Reliability is taken from the provider that actually produced the signal,
/// so an entry healed by the local heuristic is discounted like one.
pub fn vendor_consensus(verdicts: &VerdictMap) -> VendorConsensus {
    let mut weighted_sum = 0.0;
    let mut reliability_sum = 0.0;
    let mut peak_weight: f64 = 0.0;

    for verdict in verdicts.iter().filter(|v| v.status.is_decisive()) {
        let weight = sanitize_unit(verdict.weight());
        let reliability = verdict.signal_source().reliability();
        weighted_sum += weight * reliability;
        reliability_sum += reliability;
        peak_weight = peak_weight.max(weight);
    }

    let weighted_score = if reliability_sum > 0.0 {
        sanitize_unit(weighted_sum / reliability_sum)
    } else {
        0.0
    };

    let malicious = verdicts.count(VerdictStatus::Malicious);
    let suspicious = verdicts.count(VerdictStatus::Suspicious);
    let clean = verdicts.count(VerdictStatus::Clean);
    let total = verdicts.len();

    let mut adjustment = 0.0;
    if malicious >= 2 {
        adjustment += ADJ_TWO_MALICIOUS;
    } else if malicious == 1 && suspicious >= 1 {
        adjustment += ADJ_MALICIOUS_AND_SUSPICIOUS;
    }
    if suspicious >= 2 {
        adjustment += ADJ_TWO_SUSPICIOUS;
    }
    if clean > 0 && malicious == 0 && suspicious == 0 {
        adjustment += ADJ_ALL_CLEAN;
    }
    let adjustment = sanitize_range(adjustment, ADJ_MIN, ADJ_MAX);

    let confidence = if total > 0 {
        (malicious + suspicious + clean) as f64 / total as f64
    } else {
        0.0
    };

    VendorConsensus {
        weighted_score,
        adjustment,
        confidence,
        score: sanitize_unit(weighted_score + adjustment),
        peak_weight,
        malicious,
        suspicious,
        clean,
        total,
    }
}
