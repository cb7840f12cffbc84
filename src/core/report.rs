//! Analyzer report types.
//!
//! Each report is produced by exactly one analyzer and exposes a single
//! normalized `risk_score`. Everything else in a report is display detail.

use crate::core::types::{Provider, TargetType, VendorVerdict, VerdictStatus};
use crate::scoring::sanitize_unit;

use serde::{Deserialize, Serialize};

/// Transport-layer posture of a URL's host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    /// Negotiated TLS version (e.g. "TLSv1.3"), or `None` if the host has no TLS.
    pub tls_version: Option<String>,

    /// Whether the presented certificate validated, if it could be checked.
    pub certificate_valid: Option<bool>,

    /// Names of the response headers observed (lowercase).
    #[serde(default)]
    pub response_headers: Vec<String>,

    /// Whether the zone is DNSSEC-signed, if known.
    pub dnssec: Option<bool>,

    /// Resolved address of the host, display only.
    pub resolved_ip: Option<String>,

    /// HTTP status of the probe request, display only.
    pub http_status: Option<u16>,

    /// Analyzer's own normalized risk contribution.
    pub risk_score: f64,
}

impl NetworkReport {
    /// Returns `true` if the header (case-insensitive) was observed.
    pub fn has_header(&self, name: &str) -> bool {
        self.response_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(name))
    }

    /// Returns the sanitized risk contribution.
    pub fn risk(&self) -> f64 {
        sanitize_unit(self.risk_score)
    }

    /// Returns the report with its score clamped into `[0, 1]`.
    pub fn sanitized(mut self) -> Self {
        self.risk_score = self.risk();
        self
    }
}

/// Output of the on-device classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlReport {
    /// Probability in `[0, 1]` that the target is malicious.
    pub probability: f64,

    /// Model identifier, display only.
    pub model_version: String,

    /// Highest-contributing features, display only.
    #[serde(default)]
    pub top_features: Vec<String>,
}

impl MlReport {
    /// Creates a report with the given probability.
    pub fn new(probability: f64, model_version: impl Into<String>) -> Self {
        Self {
            probability,
            model_version: model_version.into(),
            top_features: Vec::new(),
        }
    }

    /// Returns the sanitized probability.
    pub fn risk(&self) -> f64 {
        sanitize_unit(self.probability)
    }

    /// Returns the report with its probability clamped into `[0, 1]`.
    pub fn sanitized(mut self) -> Self {
        self.probability = self.risk();
        self
    }
}

/// Static analysis of an uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    /// Original file name.
    pub file_name: Option<String>,
    /// Size in bytes.
    pub size_bytes: Option<u64>,
    /// Detected MIME type.
    pub mime_type: Option<String>,
    /// SHA-256 of the contents, hex encoded.
    pub sha256: Option<String>,
    /// Human-readable findings.
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Normalized risk contribution.
    pub risk_score: f64,
}

/// Analysis of a VPN profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VpnConfigReport {
    /// Profile label as shown to the user.
    pub profile_label: Option<String>,
    /// Tunnel protocol (openvpn, wireguard, ipsec, ...).
    pub protocol: Option<String>,
    /// Negotiated or configured cipher.
    pub cipher: Option<String>,
    /// Whether the profile pins DNS inside the tunnel.
    pub dns_leak_protection: Option<bool>,
    /// Human-readable findings.
    #[serde(default)]
    pub findings: Vec<String>,
    /// Normalized risk contribution.
    pub risk_score: f64,
}

/// Analysis of a social-media handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialHandleReport {
    /// Platform name (x, instagram, telegram, ...).
    pub platform: Option<String>,
    /// Normalized handle without the leading `@`.
    pub handle: String,
    /// Account age, when the platform exposes it.
    pub account_age_days: Option<u32>,
    /// Similarity to a well-known account, in `[0, 1]`.
    pub impersonation_score: Option<f64>,
    /// Human-readable findings.
    #[serde(default)]
    pub indicators: Vec<String>,
    /// Normalized risk contribution.
    pub risk_score: f64,
}

/// A per-target-type analysis, mutually exclusive with the URL network/ML pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecializedReport {
    /// File analysis.
    File(FileReport),
    /// VPN profile analysis.
    VpnConfig(VpnConfigReport),
    /// Social handle analysis.
    SocialHandle(SocialHandleReport),
}

impl SpecializedReport {
    /// The target type this report describes.
    pub fn target_type(&self) -> TargetType {
        match self {
            Self::File(_) => TargetType::File,
            Self::VpnConfig(_) => TargetType::VpnConfig,
            Self::SocialHandle(_) => TargetType::SocialHandle,
        }
    }

    /// The analyzer provider that owns this report.
    pub fn provider(&self) -> Provider {
        match self {
            Self::File(_) => Provider::FileAnalyzer,
            Self::VpnConfig(_) => Provider::VpnConfigAnalyzer,
            Self::SocialHandle(_) => Provider::SocialHandleAnalyzer,
        }
    }

    /// Returns the sanitized risk contribution.
    pub fn risk(&self) -> f64 {
        let raw = match self {
            Self::File(r) => r.risk_score,
            Self::VpnConfig(r) => r.risk_score,
            Self::SocialHandle(r) => r.risk_score,
        };
        sanitize_unit(raw)
    }

    /// Returns the report with every score clamped into `[0, 1]`.
    ///
    /// A non-finite score would serialize as `null` and never load back.
    pub fn sanitized(self) -> Self {
        match self {
            Self::File(mut r) => {
                r.risk_score = sanitize_unit(r.risk_score);
                Self::File(r)
            }
            Self::VpnConfig(mut r) => {
                r.risk_score = sanitize_unit(r.risk_score);
                Self::VpnConfig(r)
            }
            Self::SocialHandle(mut r) => {
                r.risk_score = sanitize_unit(r.risk_score);
                r.impersonation_score = r.impersonation_score.map(sanitize_unit);
                Self::SocialHandle(r)
            }
        }
    }

    /// Summarizes the report as the analyzer's own verdict.
    pub fn verdict(&self) -> VendorVerdict {
        let risk = self.risk();
        let status = if risk >= 0.7 {
            VerdictStatus::Malicious
        } else if risk >= 0.35 {
            VerdictStatus::Suspicious
        } else {
            VerdictStatus::Clean
        };

        let findings = match self {
            Self::File(r) => &r.indicators,
            Self::VpnConfig(r) => &r.findings,
            Self::SocialHandle(r) => &r.indicators,
        };

        let mut verdict = VendorVerdict::new(self.provider(), status, risk);
        if !findings.is_empty() {
            verdict = verdict.with_detail("findings", findings.join("; "));
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specialized_verdict_thresholds() {
        let report = SpecializedReport::File(FileReport {
            risk_score: 0.8,
            indicators: vec!["packed executable".into()],
            ..Default::default()
        });
        let verdict = report.verdict();
        assert_eq!(verdict.provider, Provider::FileAnalyzer);
        assert_eq!(verdict.status, VerdictStatus::Malicious);
        assert_eq!(verdict.detail("findings"), Some("packed executable"));

        let report = SpecializedReport::SocialHandle(SocialHandleReport {
            handle: "paypal_support".into(),
            risk_score: 0.4,
            ..Default::default()
        });
        assert_eq!(report.verdict().status, VerdictStatus::Suspicious);
    }

    #[test]
    fn test_report_risk_is_sanitized() {
        let report = SpecializedReport::VpnConfig(VpnConfigReport {
            risk_score: f64::INFINITY,
            ..Default::default()
        });
        assert_eq!(report.risk(), 0.0);

        assert_eq!(MlReport::new(f64::NAN, "v1").risk(), 0.0);
    }

    #[test]
    fn test_sanitized_reports_survive_json() {
        let report = SpecializedReport::SocialHandle(SocialHandleReport {
            handle: "someone".into(),
            impersonation_score: Some(f64::NAN),
            risk_score: f64::NAN,
            ..Default::default()
        })
        .sanitized();
        let json = serde_json::to_string(&report).unwrap();
        let back: SpecializedReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.risk(), 0.0);

        let ml = MlReport::new(f64::NAN, "v1").sanitized();
        assert_eq!(ml.probability, 0.0);
        let network = NetworkReport {
            risk_score: 7.5,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(network.risk_score, 1.0);
    }

    #[test]
    fn test_has_header_is_case_insensitive() {
        let report = NetworkReport {
            response_headers: vec!["Strict-Transport-Security".into()],
            ..Default::default()
        };
        assert!(report.has_header("strict-transport-security"));
        assert!(!report.has_header("content-security-policy"));
    }

    #[test]
    fn test_specialized_report_tagged_serde() {
        let report = SpecializedReport::VpnConfig(VpnConfigReport {
            protocol: Some("openvpn".into()),
            risk_score: 0.2,
            ..Default::default()
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "vpn_config");

        let back: SpecializedReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
