//! Mock providers and analyzers for testing.
//!
//! This module provides configurable mocks for every collaborator trait so
//! the orchestrator can be exercised without network access.

use crate::core::{
    FileReport, MlAnalyzer, MlReport, NetworkAnalyzer, NetworkReport, NormalizedTarget, Provider,
    ProviderClient, ProviderError, ScanRequest, SocialHandleReport, SpecializedAnalyzer,
    SpecializedReport, TargetType, VendorVerdict, VerdictStatus, VpnConfigReport,
};
use crate::orchestrator::{poll_until_ready, RetryConfig};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// The kind of failure a mock produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// A retryable outage (`ProviderError::Unavailable`).
    Transient,
    /// A non-retryable failure (`ProviderError::MalformedResponse`).
    Permanent,
    /// The client gave up on its own call (`ProviderError::Cancelled`).
    Cancelled,
}

impl MockFailure {
    fn to_error(self, provider: Provider) -> ProviderError {
        match self {
            Self::Transient => ProviderError::unavailable(provider, "simulated outage"),
            Self::Permanent => ProviderError::malformed(provider, "simulated bad response"),
            Self::Cancelled => ProviderError::Cancelled,
        }
    }
}

/// A mock provider client.
///
/// # Examples
///
/// ```rust
/// use scanfuse::core::{Provider, VerdictStatus};
/// use scanfuse::providers::mock::{MockFailure, MockProvider};
/// use std::time::Duration;
///
/// // Reports every target as clean
/// let provider = MockProvider::new(Provider::VirusTotal);
///
/// // Reports every target as malicious after a delay
/// let provider = MockProvider::new(Provider::UrlHaus)
///     .with_verdict(VerdictStatus::Malicious, 0.95)
///     .with_latency(Duration::from_millis(100));
///
/// // Always fails
/// let provider = MockProvider::new(Provider::UrlScan).failing(MockFailure::Permanent);
/// ```
#[derive(Debug)]
pub struct MockProvider {
    provider: Provider,
    reported_as: Provider,
    status: VerdictStatus,
    score: f64,
    details: Vec<(String, String)>,
    latency: Option<Duration>,
    failure: Option<MockFailure>,
    failures_before_success: u32,
    configured: bool,
    target_types: Vec<TargetType>,
    retry: RetryConfig,
    pending: Option<(RetryConfig, u32)>,
    calls: AtomicU32,
    polls: AtomicU32,
}

impl MockProvider {
    /// Creates a mock that reports every URL as `Clean` with score 0.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            reported_as: provider,
            status: VerdictStatus::Clean,
            score: 0.0,
            details: Vec::new(),
            latency: None,
            failure: None,
            failures_before_success: 0,
            configured: true,
            target_types: vec![TargetType::Url],
            retry: RetryConfig::no_retry(),
            pending: None,
            calls: AtomicU32::new(0),
            polls: AtomicU32::new(0),
        }
    }

    /// Sets the verdict returned on success.
    pub fn with_verdict(mut self, status: VerdictStatus, score: f64) -> Self {
        self.status = status;
        self.score = score;
        self
    }

    /// Adds a detail to the returned verdict.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Sets the simulated latency per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every call fail.
    pub fn failing(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self.failures_before_success = u32::MAX;
        self
    }

    /// Makes the first `n` calls fail.
    pub fn failing_first(mut self, n: u32, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self.failures_before_success = n;
        self
    }

    /// Reports the client as lacking credentials.
    pub fn without_credentials(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Sets the target types the mock accepts.
    pub fn supporting(mut self, target_types: &[TargetType]) -> Self {
        self.target_types = target_types.to_vec();
        self
    }

    /// Sets the retry schedule advertised to the orchestrator.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Files returned verdicts under another provider key.
    pub fn reporting_as(mut self, provider: Provider) -> Self {
        self.reported_as = provider;
        self
    }

    /// Simulates submit-then-poll: every query polls on `schedule` and the
    /// analysis completes after `pending_polls` pending answers.
    pub fn with_pending_analysis(mut self, schedule: RetryConfig, pending_polls: u32) -> Self {
        self.pending = Some((schedule, pending_polls));
        self
    }

    /// Returns the number of `query` calls made.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the number of analysis polls made across all queries.
    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn supports(&self, target_type: TargetType) -> bool {
        self.target_types.contains(&target_type)
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry.clone()
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(schedule, _)| schedule.total_delay() + Duration::from_secs(1))
    }

    async fn query(&self, _target: &NormalizedTarget) -> Result<VendorVerdict, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(failure) = self.failure {
            if call < self.failures_before_success {
                return Err(failure.to_error(self.provider));
            }
        }

        if let Some((schedule, pending_polls)) = &self.pending {
            let mut answered = 0;
            poll_until_ready(schedule, self.provider, || {
                self.polls.fetch_add(1, Ordering::SeqCst);
                answered += 1;
                let ready = answered > *pending_polls;
                async move { Ok(ready.then_some(())) }
            })
            .await?;
        }

        let mut verdict = VendorVerdict::new(self.reported_as, self.status, self.score);
        for (key, value) in &self.details {
            verdict = verdict.with_detail(key.clone(), value.clone());
        }
        Ok(verdict)
    }
}

/// A mock network analyzer returning a fixed report.
#[derive(Debug, Default)]
pub struct MockNetworkAnalyzer {
    report: Option<NetworkReport>,
}

impl MockNetworkAnalyzer {
    /// Returns `report` for every target.
    pub fn new(report: NetworkReport) -> Self {
        Self {
            report: Some(report),
        }
    }

    /// A host with TLS 1.3, a valid certificate, every security header and DNSSEC.
    pub fn hardened() -> Self {
        Self::new(NetworkReport {
            tls_version: Some("TLSv1.3".into()),
            certificate_valid: Some(true),
            response_headers: [
                "strict-transport-security",
                "content-security-policy",
                "x-frame-options",
                "x-content-type-options",
                "referrer-policy",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            dnssec: Some(true),
            ..Default::default()
        })
    }

    /// A plain-HTTP host with an invalid certificate.
    pub fn insecure() -> Self {
        Self::new(NetworkReport {
            tls_version: None,
            certificate_valid: Some(false),
            ..Default::default()
        })
    }

    /// Fails every analysis.
    pub fn failing() -> Self {
        Self { report: None }
    }
}

#[async_trait]
impl NetworkAnalyzer for MockNetworkAnalyzer {
    async fn analyze(&self, _target: &NormalizedTarget) -> Result<NetworkReport, ProviderError> {
        self.report
            .clone()
            .ok_or_else(|| ProviderError::connection_failed(Provider::NetworkAnalyzer, "probe failed"))
    }
}

/// A mock ML analyzer returning a fixed probability.
#[derive(Debug)]
pub struct MockMlAnalyzer {
    probability: Option<f64>,
}

impl MockMlAnalyzer {
    /// Returns `probability` for every target.
    pub fn new(probability: f64) -> Self {
        Self {
            probability: Some(probability),
        }
    }

    /// Fails every prediction.
    pub fn failing() -> Self {
        Self { probability: None }
    }
}

#[async_trait]
impl MlAnalyzer for MockMlAnalyzer {
    async fn predict(&self, _target: &NormalizedTarget) -> Result<MlReport, ProviderError> {
        self.probability
            .map(|p| MlReport::new(p, "mock-model"))
            .ok_or_else(|| ProviderError::unavailable(Provider::MlModel, "model not loaded"))
    }
}

/// A mock specialized analyzer for one target type.
#[derive(Debug)]
pub struct MockSpecializedAnalyzer {
    target_type: TargetType,
    report: Option<SpecializedReport>,
    failure: MockFailure,
}

impl MockSpecializedAnalyzer {
    /// Returns `report` for every file.
    pub fn file(report: FileReport) -> Self {
        Self {
            target_type: TargetType::File,
            report: Some(SpecializedReport::File(report)),
            failure: MockFailure::Permanent,
        }
    }

    /// Returns `report` for every VPN profile.
    pub fn vpn_config(report: VpnConfigReport) -> Self {
        Self {
            target_type: TargetType::VpnConfig,
            report: Some(SpecializedReport::VpnConfig(report)),
            failure: MockFailure::Permanent,
        }
    }

    /// Returns `report` for every social handle.
    pub fn social_handle(report: SocialHandleReport) -> Self {
        Self {
            target_type: TargetType::SocialHandle,
            report: Some(SpecializedReport::SocialHandle(report)),
            failure: MockFailure::Permanent,
        }
    }

    /// Fails every analysis of `target_type`.
    pub fn failing(target_type: TargetType) -> Self {
        Self::failing_with(target_type, MockFailure::Permanent)
    }

    /// Fails every analysis of `target_type` with the given failure.
    pub fn failing_with(target_type: TargetType, failure: MockFailure) -> Self {
        Self {
            target_type,
            report: None,
            failure,
        }
    }
}

#[async_trait]
impl SpecializedAnalyzer for MockSpecializedAnalyzer {
    fn target_type(&self) -> TargetType {
        self.target_type
    }

    async fn analyze(
        &self,
        _request: &ScanRequest,
        _target: &NormalizedTarget,
    ) -> Result<SpecializedReport, ProviderError> {
        let provider = self
            .target_type
            .specialized_provider()
            .unwrap_or(Provider::Manual);
        self.report
            .clone()
            .ok_or_else(|| self.failure.to_error(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> NormalizedTarget {
        NormalizedTarget::new(TargetType::Url, "https://example.com/")
    }

    #[tokio::test]
    async fn test_mock_provider_clean() {
        let provider = MockProvider::new(Provider::VirusTotal);
        let verdict = provider.query(&target()).await.unwrap();
        assert_eq!(verdict.status, VerdictStatus::Clean);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_details() {
        let provider = MockProvider::new(Provider::UrlHaus)
            .with_verdict(VerdictStatus::Malicious, 0.9)
            .with_detail("threat", "malware_download");
        let verdict = provider.query(&target()).await.unwrap();
        assert_eq!(verdict.status, VerdictStatus::Malicious);
        assert_eq!(verdict.detail("threat"), Some("malware_download"));
    }

    #[tokio::test]
    async fn test_mock_provider_recovers() {
        let provider = MockProvider::new(Provider::UrlScan).failing_first(1, MockFailure::Transient);
        let err = provider.query(&target()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(provider.query(&target()).await.is_ok());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_provider_polls_pending_analysis() {
        let provider = MockProvider::new(Provider::VirusTotal)
            .with_pending_analysis(RetryConfig::polling().with_max_attempts(4), 2);
        assert!(provider.query(&target()).await.is_ok());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.poll_count(), 3);

        let stuck = MockProvider::new(Provider::VirusTotal)
            .with_pending_analysis(RetryConfig::polling().with_max_attempts(4), u32::MAX);
        let err = stuck.query(&target()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AnalysisPending { attempts: 4, .. }));
    }

    #[tokio::test]
    async fn test_mock_analyzers() {
        let report = MockNetworkAnalyzer::insecure().analyze(&target()).await.unwrap();
        assert_eq!(report.certificate_valid, Some(false));
        assert!(MockNetworkAnalyzer::failing().analyze(&target()).await.is_err());
        assert!(MockMlAnalyzer::failing().predict(&target()).await.is_err());

        let analyzer = MockSpecializedAnalyzer::failing(TargetType::File);
        let request = ScanRequest::new(TargetType::File, "a.bin");
        let err = analyzer.analyze(&request, &target()).await.unwrap_err();
        assert_eq!(err.provider(), Some(Provider::FileAnalyzer));
    }
}
