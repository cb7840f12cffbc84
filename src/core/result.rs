//! Scan result structures.
//!
//! This module defines `ScanResult`, the immutable aggregate produced at the
//! end of a successful scan, and the fuzzy `RiskBreakdown` it carries.

use crate::core::error::ScanError;
use crate::core::report::{MlReport, NetworkReport, SpecializedReport};
use crate::core::types::{ScanRequest, TargetType, VerdictMap};
use crate::scoring::sanitize_unit;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound of the final risk value.
pub const MAX_RISK: f64 = 5.0;

/// Unique identifier for a scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(pub String);

impl ScanId {
    /// Creates a new random scan id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScanId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ScanId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A named fuzzy risk category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    /// Essentially no risk.
    Minimal,
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

impl RiskCategory {
    /// Every category, from least to most severe.
    pub const ALL: [RiskCategory; 5] = [
        Self::Minimal,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Fuzzy membership degrees per risk category.
///
/// Degrees are independent and need not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskBreakdown(BTreeMap<RiskCategory, f64>);

impl RiskBreakdown {
    /// Computes the breakdown for a normalized probability.
    pub fn from_probability(p: f64) -> Self {
        let p = sanitize_unit(p);
        Self(
            RiskCategory::ALL
                .iter()
                .map(|&c| (c, crate::scoring::membership(c, p)))
                .collect(),
        )
    }

    /// Returns the degree for a category (0 if absent).
    pub fn degree(&self, category: RiskCategory) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    /// Returns the category with the highest degree, ties going to the less severe one.
    pub fn dominant(&self) -> RiskCategory {
        RiskCategory::ALL
            .iter()
            .copied()
            .fold(RiskCategory::Minimal, |best, c| {
                if self.degree(c) > self.degree(best) {
                    c
                } else {
                    best
                }
            })
    }

    /// Iterates over `(category, degree)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (RiskCategory, f64)> + '_ {
        self.0.iter().map(|(c, d)| (*c, *d))
    }

    /// Returns `true` if every degree is finite and within `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        self.0.values().all(|d| d.is_finite() && (0.0..=1.0).contains(d))
    }
}

/// The complete, immutable result of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Unique identifier for this scan.
    pub id: ScanId,

    /// Kind of target assessed.
    pub target_type: TargetType,

    /// The target as supplied by the caller.
    pub target_label: String,

    /// The target after normalization, if normalization produced one.
    pub normalized_target: Option<String>,

    /// Request metadata, echoed.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// Final per-provider verdicts, after fallback resolution.
    pub vendors: VerdictMap,

    /// Network posture report (URL scans only).
    pub network: Option<NetworkReport>,

    /// ML report (URL scans only).
    pub ml: Option<MlReport>,

    /// Specialized report (non-URL scans only).
    pub specialized: Option<SpecializedReport>,

    /// Final risk in `[0, 5]`.
    pub risk: f64,

    /// Fuzzy category breakdown of `risk / 5`.
    pub breakdown: RiskBreakdown,

    /// Fraction of providers that returned a decisive verdict.
    pub confidence: f64,

    /// When the result was created, millisecond precision.
    pub created_at: DateTime<Utc>,
}

/// Everything a scan collected, before it is frozen into a `ScanResult`.
#[derive(Debug, Clone, Default)]
pub struct ScanFindings {
    /// Id the result will carry.
    pub id: ScanId,
    /// Normalized target.
    pub normalized_target: Option<String>,
    /// Final verdicts.
    pub vendors: VerdictMap,
    /// Network report.
    pub network: Option<NetworkReport>,
    /// ML report.
    pub ml: Option<MlReport>,
    /// Specialized report.
    pub specialized: Option<SpecializedReport>,
}

impl ScanResult {
    /// Assembles a result, validating the scorer contract.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvariantViolation` if `risk` is not finite or
    /// outside `[0, 5]`, if a breakdown degree is outside `[0, 1]`, or if a
    /// report does not match the request's target type.
    ///
    /// Report and verdict scores are clamped into `[0, 1]`, so the result
    /// always serializes to finite numbers.
    pub fn assemble(
        request: &ScanRequest,
        findings: ScanFindings,
        risk: f64,
        breakdown: RiskBreakdown,
        confidence: f64,
    ) -> Result<Self, ScanError> {
        if !risk.is_finite() || !(0.0..=MAX_RISK).contains(&risk) {
            return Err(ScanError::invariant(format!(
                "risk {risk} outside [0, {MAX_RISK}]"
            )));
        }
        if !breakdown.is_well_formed() {
            return Err(ScanError::invariant("breakdown degree outside [0, 1]"));
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ScanError::invariant(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        if let Some(report) = &findings.specialized {
            if report.target_type() != request.target_type {
                return Err(ScanError::invariant(format!(
                    "{} report attached to a {} scan",
                    report.target_type(),
                    request.target_type
                )));
            }
        }

        let vendors: VerdictMap = findings
            .vendors
            .into_iter()
            .map(|mut verdict| {
                verdict.score = sanitize_unit(verdict.score);
                verdict
            })
            .collect();

        Ok(Self {
            id: findings.id,
            target_type: request.target_type,
            target_label: request.raw_input.clone(),
            normalized_target: findings.normalized_target,
            metadata: request.metadata.clone(),
            vendors,
            network: findings.network.map(NetworkReport::sanitized),
            ml: findings.ml.map(MlReport::sanitized),
            specialized: findings.specialized.map(SpecializedReport::sanitized),
            risk,
            breakdown,
            confidence,
            created_at: now_millis(),
        })
    }

    /// The normalized probability the risk was derived from.
    pub fn probability(&self) -> f64 {
        self.risk / MAX_RISK
    }

    /// The dominant fuzzy category.
    pub fn category(&self) -> RiskCategory {
        self.breakdown.dominant()
    }
}

/// Current time truncated to whole milliseconds.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::{FileReport, MlReport};
    use crate::core::types::{Provider, VendorVerdict};

    fn findings() -> ScanFindings {
        ScanFindings {
            normalized_target: Some("https://example.com/".into()),
            vendors: [
                VendorVerdict::clean(Provider::VirusTotal, 0.1),
                VendorVerdict::error(Provider::UrlScan, "HTTP 502"),
            ]
            .into_iter()
            .collect(),
            network: Some(NetworkReport {
                tls_version: Some("TLSv1.3".into()),
                certificate_valid: Some(true),
                response_headers: vec!["strict-transport-security".into()],
                risk_score: 0.05,
                ..Default::default()
            }),
            ml: Some(MlReport::new(0.12, "url-clf-3")),
            specialized: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_assemble_keeps_findings_id() {
        let request = ScanRequest::url("example.com");
        let f = findings();
        let id = f.id.clone();
        let result =
            ScanResult::assemble(&request, f, 0.2, RiskBreakdown::from_probability(0.04), 1.0)
                .unwrap();
        assert_eq!(result.id, id);
    }

    #[test]
    fn test_assemble_rejects_out_of_range_risk() {
        let request = ScanRequest::url("example.com");
        let result = ScanResult::assemble(
            &request,
            findings(),
            5.5,
            RiskBreakdown::from_probability(1.0),
            1.0,
        );
        assert!(matches!(result, Err(ScanError::InvariantViolation { .. })));

        let result = ScanResult::assemble(
            &request,
            findings(),
            f64::NAN,
            RiskBreakdown::from_probability(0.0),
            1.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_assemble_rejects_mismatched_report() {
        let request = ScanRequest::url("example.com");
        let mut f = findings();
        f.specialized = Some(SpecializedReport::File(FileReport::default()));

        let result =
            ScanResult::assemble(&request, f, 1.0, RiskBreakdown::from_probability(0.2), 1.0);
        assert!(matches!(result, Err(ScanError::InvariantViolation { .. })));
    }

    #[test]
    fn test_scan_result_serde_round_trip() {
        let request = ScanRequest::url("example.com").with_metadata("source", "qr");
        let result = ScanResult::assemble(
            &request,
            findings(),
            0.37,
            RiskBreakdown::from_probability(0.074),
            0.5,
        )
        .unwrap();

        let json = serde_json::to_string(&result).unwrap();
        let back: ScanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_assemble_clamps_non_finite_report_scores() {
        let request = ScanRequest::url("example.com");
        let mut f = findings();
        f.ml = Some(MlReport::new(f64::NAN, "url-clf-3"));
        if let Some(network) = f.network.as_mut() {
            network.risk_score = f64::INFINITY;
        }
        let mut verdict = VendorVerdict::clean(Provider::PhishTank, 0.0);
        verdict.score = f64::NAN;
        f.vendors.insert(verdict);

        let result =
            ScanResult::assemble(&request, f, 0.0, RiskBreakdown::from_probability(0.0), 0.5)
                .unwrap();
        assert_eq!(result.ml.as_ref().unwrap().probability, 0.0);
        assert_eq!(result.network.as_ref().unwrap().risk_score, 0.0);
        assert_eq!(result.vendors.get(Provider::PhishTank).unwrap().score, 0.0);

        let json = serde_json::to_string(&result).unwrap();
        let back: ScanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_created_at_has_millisecond_precision() {
        let ts = now_millis();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_breakdown_dominant() {
        assert_eq!(
            RiskBreakdown::from_probability(0.0).dominant(),
            RiskCategory::Minimal
        );
        assert_eq!(
            RiskBreakdown::from_probability(0.55).dominant(),
            RiskCategory::Medium
        );
        assert_eq!(
            RiskBreakdown::from_probability(1.0).dominant(),
            RiskCategory::Critical
        );
    }
}
