//! The two scoring entry points.

use crate::core::report::{MlReport, NetworkReport, SpecializedReport};
use crate::core::result::{RiskBreakdown, MAX_RISK};
use crate::core::types::VerdictMap;
use crate::scoring::consensus::{vendor_consensus, VendorConsensus};
use crate::scoring::network::network_adjustment;
use crate::scoring::{sanitize, sanitize_unit};

const URL_VENDOR_WEIGHT: f64 = 0.6;
const URL_ML_WEIGHT: f64 = 0.3;
const CLEAN_DISCOUNT: f64 = 0.45;
const LOW_ML_THRESHOLD: f64 = 0.3;
const NETWORK_FLOOR_TRIGGER: f64 = 0.22;
const NETWORK_FLOOR_SLOPE: f64 = 1.6;
const NETWORK_FLOOR_MAX: f64 = 0.9;

const SPECIALIZED_VENDOR_WEIGHT: f64 = 0.55;
const SPECIALIZED_REPORT_WEIGHT: f64 = 0.45;

const PULL_BASE: f64 = 0.15;
const PULL_CONFIDENCE: f64 = 0.3;
const PULL_EXPONENT: f64 = 0.75;
const LOW_CONFIDENCE: f64 = 0.4;
const LOW_CONFIDENCE_PENALTY: f64 = 0.12;

/// Output of one scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// Normalized probability in `[0, 1]`.
    pub probability: f64,

    /// `probability × 5`, in `[0, 5]`.
    pub risk: f64,

    /// Fuzzy breakdown of `probability`.
    pub breakdown: RiskBreakdown,

    /// The vendor consensus the assessment was built on.
    pub consensus: VendorConsensus,

    /// Network adjustment applied (0 outside the URL path).
    pub network_adjustment: f64,
}

impl RiskAssessment {
    fn from_probability(p: f64, consensus: VendorConsensus, network_adjustment: f64) -> Self {
        let probability = sanitize_unit(p);
        Self {
            probability,
            risk: (probability * MAX_RISK).clamp(0.0, MAX_RISK),
            breakdown: RiskBreakdown::from_probability(probability),
            consensus,
            network_adjustment,
        }
    }

    /// Fraction of decisive verdicts.
    pub fn confidence(&self) -> f64 {
        self.consensus.confidence
    }
}

/// Pulls `value` toward the vendor score in proportion to confidence.
///
/// `value + (vendor − value) × (0.15 + confidence^0.75 × 0.3)`, minus
/// `(0.4 − confidence)² × 0.12` when confidence is below 0.4, clamped to `[0, 1]`.
pub fn confidence_pull(value: f64, vendor_score: f64, confidence: f64) -> f64 {
    let value = sanitize(value);
    let vendor_score = sanitize_unit(vendor_score);
    let confidence = sanitize_unit(confidence);

    let factor = PULL_BASE + confidence.powf(PULL_EXPONENT) * PULL_CONFIDENCE;
    let mut adjusted = value + (vendor_score - value) * factor;
    if confidence < LOW_CONFIDENCE {
        adjusted -= (LOW_CONFIDENCE - confidence).powi(2) * LOW_CONFIDENCE_PENALTY;
    }
    sanitize_unit(adjusted)
}

/// Scores a URL scan.
///
/// Blends the vendor consensus with the ML probability (or, without one,
/// the strongest single vendor weight) and the network posture, pulls the
/// result toward the vendor score, discounts unanimous clean results with a
/// low ML signal, and finally floors the result when the transport layer is
/// clearly insecure.
pub fn score_url(
    verdicts: &VerdictMap,
    ml: Option<&MlReport>,
    network: Option<&NetworkReport>,
) -> RiskAssessment {
    let consensus = vendor_consensus(verdicts);
    let net_adj = network.map(network_adjustment).unwrap_or(0.0);
    let ml_signal = ml.map_or(consensus.peak_weight, MlReport::risk);

    let value = URL_VENDOR_WEIGHT * consensus.weighted_score
        + URL_ML_WEIGHT * ml_signal
        + consensus.adjustment
        + net_adj;

    let mut p = confidence_pull(value, consensus.score, consensus.confidence);

    if consensus.all_clean() && ml_signal < LOW_ML_THRESHOLD {
        p *= CLEAN_DISCOUNT;
    }

    if net_adj > NETWORK_FLOOR_TRIGGER {
        let floor = (net_adj * NETWORK_FLOOR_SLOPE).min(NETWORK_FLOOR_MAX);
        p = p.max(floor);
    }

    RiskAssessment::from_probability(p, consensus, net_adj)
}

/// Scores a file, VPN profile or social handle scan.
pub fn score_specialized(
    verdicts: &VerdictMap,
    specialized: Option<&SpecializedReport>,
) -> RiskAssessment {
    let consensus = vendor_consensus(verdicts);

    let base = match specialized {
        Some(report) => {
            SPECIALIZED_VENDOR_WEIGHT * consensus.weighted_score
                + SPECIALIZED_REPORT_WEIGHT * report.risk()
        }
        None => consensus.weighted_score,
    };
    let value = base + consensus.adjustment * 0.5;

    let p = confidence_pull(value, consensus.score, consensus.confidence);
    RiskAssessment::from_probability(p, consensus, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::FileReport;
    use crate::core::result::RiskCategory;
    use crate::core::types::{Provider, VendorVerdict};

    fn clean_vendors(score: f64) -> VerdictMap {
        [
            VendorVerdict::clean(Provider::VirusTotal, score),
            VendorVerdict::clean(Provider::GoogleSafeBrowsing, score),
            VendorVerdict::clean(Provider::UrlScan, score),
            VendorVerdict::clean(Provider::PhishTank, score),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_all_clean_is_discounted() {
        let vendors = clean_vendors(0.2);
        let assessment = score_url(&vendors, None, None);

        let raw_vendor = assessment.consensus.weighted_score;
        assert!((raw_vendor - 0.08).abs() < 1e-9);
        assert!(assessment.probability < raw_vendor * 0.5);
        assert_eq!(assessment.breakdown.dominant(), RiskCategory::Minimal);
        assert!(assessment.breakdown.degree(RiskCategory::Minimal) > 0.9);
    }

    #[test]
    fn test_two_malicious_reach_three() {
        let vendors: VerdictMap = [
            VendorVerdict::malicious(Provider::VirusTotal, 0.9),
            VendorVerdict::malicious(Provider::GoogleSafeBrowsing, 0.9),
            VendorVerdict::clean(Provider::UrlScan, 0.0),
            VendorVerdict::clean(Provider::PhishTank, 0.0),
            VendorVerdict::clean(Provider::OpenPhish, 0.0),
        ]
        .into_iter()
        .collect();

        let assessment = score_url(&vendors, None, None);
        assert!(assessment.consensus.adjustment >= 0.18);
        assert!(assessment.risk >= 3.0, "risk = {}", assessment.risk);
    }

    #[test]
    fn test_insecure_transport_imposes_floor() {
        let network = NetworkReport {
            tls_version: None,
            certificate_valid: Some(false),
            ..Default::default()
        };
        let assessment = score_url(&clean_vendors(0.0), None, Some(&network));

        assert_eq!(assessment.network_adjustment, 0.45);
        assert!((assessment.probability - 0.72).abs() < 1e-9);
        assert!(assessment.risk >= 3.5);
    }

    #[test]
    fn test_ml_signal_blocks_clean_discount() {
        let vendors = clean_vendors(0.0);
        let low = score_url(&vendors, Some(&MlReport::new(0.1, "m")), None);
        let high = score_url(&vendors, Some(&MlReport::new(0.9, "m")), None);
        assert!(high.probability > low.probability);
        assert!(high.probability > 0.1);
    }

    #[test]
    fn test_confidence_pull() {
        // full confidence pulls 45% of the way
        assert!((confidence_pull(1.0, 0.0, 1.0) - 0.55).abs() < 1e-9);
        // zero confidence pulls 15% and subtracts 0.0192
        assert!((confidence_pull(1.0, 0.0, 0.0) - (0.85 - 0.0192)).abs() < 1e-9);
        assert_eq!(confidence_pull(f64::NAN, f64::INFINITY, f64::NAN), 0.0);
        assert_eq!(confidence_pull(-3.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_specialized_blend() {
        let report = SpecializedReport::File(FileReport {
            risk_score: 1.0,
            ..Default::default()
        });
        let vendors: VerdictMap = [report.verdict()].into_iter().collect();

        let assessment = score_specialized(&vendors, Some(&report));
        assert!((assessment.probability - 1.0).abs() < 1e-9);
        assert_eq!(assessment.breakdown.dominant(), RiskCategory::Critical);
    }

    #[test]
    fn test_specialized_without_report_uses_vendors() {
        let vendors: VerdictMap = [VendorVerdict::suspicious(Provider::VirusTotal, 0.5)]
            .into_iter()
            .collect();
        let assessment = score_specialized(&vendors, None);
        // value = 0.56, vendor score = 0.56
        assert!((assessment.probability - 0.56).abs() < 1e-9);
    }

    #[test]
    fn test_empty_inputs_are_in_range() {
        let a = score_url(&VerdictMap::new(), None, None);
        assert!((0.0..=5.0).contains(&a.risk));
        let b = score_specialized(&VerdictMap::new(), None);
        assert!((0.0..=5.0).contains(&b.risk));
        assert!(a.breakdown.is_well_formed() && b.breakdown.is_well_formed());
    }

    #[test]
    fn test_non_finite_reports_are_sanitized() {
        let vendors = clean_vendors(0.1);
        let network = NetworkReport {
            tls_version: Some("TLSv1.2".into()),
            risk_score: f64::NAN,
            ..Default::default()
        };
        for ml in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let a = score_url(&vendors, Some(&MlReport::new(ml, "m")), Some(&network));
            assert!(a.risk.is_finite() && (0.0..=5.0).contains(&a.risk));
            assert!(a.breakdown.is_well_formed());
        }

        let report = SpecializedReport::File(FileReport {
            risk_score: f64::NAN,
            ..Default::default()
        });
        let a = score_specialized(&vendors, Some(&report));
        assert!(a.risk.is_finite() && (0.0..=5.0).contains(&a.risk));
    }

    #[test]
    fn test_range_over_many_verdict_sets() {
        let statuses: [fn(Provider) -> VendorVerdict; 5] = [
            |p| VendorVerdict::clean(p, 0.3),
            |p| VendorVerdict::suspicious(p, 0.6),
            |p| VendorVerdict::malicious(p, 0.95),
            |p| VendorVerdict::unknown(p, "no key"),
            |p| VendorVerdict::error(p, "boom"),
        ];
        let providers = [
            Provider::VirusTotal,
            Provider::GoogleSafeBrowsing,
            Provider::UrlScan,
            Provider::LocalHeuristic,
        ];

        // every assignment of 5 statuses to 4 providers
        for mut code in 0..5usize.pow(4) {
            let mut vendors = VerdictMap::new();
            for provider in providers {
                vendors.insert(statuses[code % 5](provider));
                code /= 5;
            }
            let network = NetworkReport::default();
            for ml in [None, Some(MlReport::new(0.5, "m"))] {
                let a = score_url(&vendors, ml.as_ref(), Some(&network));
                assert!((0.0..=5.0).contains(&a.risk));
                assert!(a.breakdown.is_well_formed());
                assert_eq!(a.breakdown, RiskBreakdown::from_probability(a.probability));
            }
        }
    }
}
