//! Audit event types and emission functions.

use crate::core::{ScanError, ScanId, ScanRequest, ScanResult, VendorVerdict};
use crate::fallback::Substitution;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Serializes the event as one JSON line.
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Audit event for a scan that finished and was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Unique scan ID.
    pub scan_id: String,

    /// Target type name.
    pub target_type: String,

    /// Final risk in `[0, 5]`.
    pub risk: f64,

    /// Dominant fuzzy category.
    pub category: String,

    /// Fraction of decisive providers.
    pub confidence: f64,

    /// Number of provider entries in the result.
    pub provider_count: usize,

    /// Providers that returned `Malicious`.
    pub malicious: Vec<String>,
}

impl ScanAuditEvent {
    /// Builds the event from a result.
    pub fn from_result(result: &ScanResult) -> Self {
        Self {
            timestamp: Utc::now(),
            scan_id: result.id.to_string(),
            target_type: result.target_type.to_string(),
            risk: result.risk,
            category: result.category().to_string(),
            confidence: result.confidence,
            provider_count: result.vendors.len(),
            malicious: result
                .vendors
                .iter()
                .filter(|v| v.status == crate::core::VerdictStatus::Malicious)
                .map(|v| v.provider.to_string())
                .collect(),
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for one provider's final verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Scan the verdict belongs to.
    pub scan_id: String,
    /// Provider name.
    pub provider: String,
    /// Verdict status name.
    pub status: String,
    /// Verdict score.
    pub score: f64,
    /// Provider that actually supplied the signal, if healed.
    pub fallback_provider: Option<String>,
}

impl VerdictAuditEvent {
    /// Builds the event from a verdict.
    pub fn new(scan_id: &ScanId, verdict: &VendorVerdict) -> Self {
        Self {
            timestamp: Utc::now(),
            scan_id: scan_id.to_string(),
            provider: verdict.provider.to_string(),
            status: verdict.status.to_string(),
            score: verdict.score,
            fallback_provider: verdict
                .is_fallback()
                .then(|| verdict.signal_source().to_string()),
        }
    }
}

impl AuditEvent for VerdictAuditEvent {
    fn event_type(&self) -> &'static str {
        "provider_verdict"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a healed provider entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Scan the substitution happened in.
    pub scan_id: String,
    /// Provider whose entry was healed.
    pub provider: String,
    /// Provider whose verdict was copied.
    pub substitute: String,
    /// Status before healing.
    pub original_status: String,
    /// Status after healing.
    pub status: String,
    /// Whether the substitute was queried on demand.
    pub fetched: bool,
}

impl FallbackAuditEvent {
    /// Builds the event from a substitution.
    pub fn new(scan_id: &ScanId, substitution: &Substitution) -> Self {
        Self {
            timestamp: Utc::now(),
            scan_id: scan_id.to_string(),
            provider: substitution.provider.to_string(),
            substitute: substitution.substitute.to_string(),
            original_status: substitution.original_status.to_string(),
            status: substitution.status.to_string(),
            fetched: substitution.fetched,
        }
    }
}

impl AuditEvent for FallbackAuditEvent {
    fn event_type(&self) -> &'static str {
        "fallback_applied"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(scan_id: &ScanId, request: &ScanRequest) {
    tracing::info!(
        target: "scanfuse::audit",
        event_type = "scan_started",
        scan_id = %scan_id,
        target_type = %request.target_type,
        metadata_keys = ?request.metadata.keys().collect::<Vec<_>>(),
        "Scan started"
    );
}

/// Emits an audit event for one provider's final verdict.
pub fn emit_provider_verdict(scan_id: &ScanId, verdict: &VendorVerdict) {
    let event = VerdictAuditEvent::new(scan_id, verdict);

    tracing::info!(
        target: "scanfuse::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        provider = %event.provider,
        status = %event.status,
        score = event.score,
        fallback_provider = ?event.fallback_provider,
        "Provider verdict recorded"
    );
}

/// Emits an audit event for a healed provider entry.
pub fn emit_fallback_applied(scan_id: &ScanId, substitution: &Substitution) {
    let event = FallbackAuditEvent::new(scan_id, substitution);

    tracing::info!(
        target: "scanfuse::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        provider = %event.provider,
        substitute = %event.substitute,
        original_status = %event.original_status,
        status = %event.status,
        fetched = event.fetched,
        "Fallback applied"
    );
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(result: &ScanResult) {
    let event = ScanAuditEvent::from_result(result);

    tracing::info!(
        target: "scanfuse::audit",
        event_type = event.event_type(),
        scan_id = %event.scan_id,
        target_type = %event.target_type,
        risk = event.risk,
        category = %event.category,
        confidence = event.confidence,
        provider_count = event.provider_count,
        malicious = ?event.malicious,
        "Scan completed"
    );
}

/// Emits an audit event for a scan that ended in failure.
///
/// The raw input is deliberately left out; it may carry user data.
pub fn emit_scan_failed(scan_id: &ScanId, request: &ScanRequest, error: &ScanError) {
    tracing::warn!(
        target: "scanfuse::audit",
        event_type = "scan_failed",
        scan_id = %scan_id,
        target_type = %request.target_type,
        error = %error,
        "Scan failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Provider, RiskBreakdown, ScanFindings, VerdictStatus, DETAIL_FALLBACK_PROVIDER,
    };

    fn result() -> ScanResult {
        let findings = ScanFindings {
            vendors: [
                VendorVerdict::malicious(Provider::UrlHaus, 0.9),
                VendorVerdict::clean(Provider::VirusTotal, 0.0),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        ScanResult::assemble(
            &ScanRequest::url("https://example.com/"),
            findings,
            3.5,
            RiskBreakdown::from_probability(0.7),
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn test_scan_event_from_result() {
        let result = result();
        let event = ScanAuditEvent::from_result(&result);

        assert_eq!(event.scan_id, result.id.to_string());
        assert_eq!(event.provider_count, 2);
        assert_eq!(event.malicious, vec!["url_haus".to_string()]);
        assert_eq!(event.event_type(), "scan_completed");
    }

    #[test]
    fn test_verdict_event_records_fallback_source() {
        let id = ScanId::from("scan-1");
        let healed = VendorVerdict::suspicious(Provider::VirusTotal, 0.5)
            .with_detail(DETAIL_FALLBACK_PROVIDER, "google_safe_browsing");

        let event = VerdictAuditEvent::new(&id, &healed);
        assert_eq!(event.fallback_provider.as_deref(), Some("google_safe_browsing"));

        let plain = VerdictAuditEvent::new(&id, &VendorVerdict::clean(Provider::UrlScan, 0.0));
        assert!(plain.fallback_provider.is_none());
    }

    #[test]
    fn test_fallback_event_json() {
        let substitution = Substitution {
            provider: Provider::VirusTotal,
            substitute: Provider::GoogleSafeBrowsing,
            original_status: VerdictStatus::Error,
            status: VerdictStatus::Suspicious,
            fetched: false,
        };
        let event = FallbackAuditEvent::new(&ScanId::from("scan-2"), &substitution);
        let json = event.to_json().unwrap();

        assert!(json.contains("\"original_status\":\"error\""));
        assert!(json.contains("\"substitute\":\"google_safe_browsing\""));
    }
}
