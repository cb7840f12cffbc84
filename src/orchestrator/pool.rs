//! The set of provider clients an orchestrator queries.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use crate::core::error::ProviderError;
use crate::core::normalize::NormalizedTarget;
use crate::core::traits::ArcProvider;
use crate::core::types::{Provider, VendorVerdict, VerdictMap};
use crate::fallback::VerdictSource;
use crate::orchestrator::retry::retry_async;

/// Detail key carrying the error classification of an `Error` verdict.
pub const DETAIL_ERROR_KIND: &str = "errorKind";

/// Primary and fallback-only provider clients.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProviderPool {
    primaries: Vec<ArcProvider>,
    fallbacks: Vec<ArcProvider>,
    timeout: Duration,
}

impl ProviderPool {
    pub(crate) fn new(primaries: Vec<ArcProvider>, fallbacks: Vec<ArcProvider>, timeout: Duration) -> Self {
        Self {
            primaries,
            fallbacks,
            timeout,
        }
    }

    pub(crate) fn primary_count(&self) -> usize {
        self.primaries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.primaries.len() + self.fallbacks.len()
    }

    /// Queries every primary provider that supports the target, concurrently.
    pub(crate) async fn query_primaries(&self, target: &NormalizedTarget) -> VerdictMap {
        let queries = self
            .primaries
            .iter()
            .filter(|client| client.supports(target.target_type))
            .map(|client| query_provider(client, target, self.timeout));

        join_all(queries).await.into_iter().collect()
    }

    /// Number of primaries that would be queried for `target`.
    pub(crate) fn primaries_for(&self, target: &NormalizedTarget) -> usize {
        self.primaries
            .iter()
            .filter(|client| client.supports(target.target_type))
            .count()
    }

    fn client(&self, provider: Provider) -> Option<&ArcProvider> {
        self.primaries
            .iter()
            .chain(self.fallbacks.iter())
            .find(|client| client.provider() == provider)
    }
}

#[async_trait]
impl VerdictSource for ProviderPool {
    async fn fetch(&self, provider: Provider, target: &NormalizedTarget) -> Option<VendorVerdict> {
        let client = self.client(provider)?;
        Some(query_provider(client, target, self.timeout).await)
    }
}

/// Queries one provider, folding every failure into a verdict.
///
/// Unconfigured clients are never called and yield `Unknown`. Each attempt
/// is bounded by `timeout`, or by the client's own longer attempt timeout;
/// transient errors are retried on the client's own schedule. A verdict
/// filed under the wrong provider is re-keyed.
///
/// A client that reports `Cancelled` gave up on its own call, so it gets an
/// `Error` verdict like any other failure. Cancelling the scan drops this
/// future instead.
pub(crate) async fn query_provider(
    client: &ArcProvider,
    target: &NormalizedTarget,
    timeout: Duration,
) -> VendorVerdict {
    let provider = client.provider();

    if !client.is_configured() {
        tracing::debug!(provider = %provider, "Skipping unconfigured provider");
        return VendorVerdict::unknown(provider, "no credentials configured");
    }
    if !client.supports(target.target_type) {
        return VendorVerdict::unknown(
            provider,
            format!("{} targets are not supported", target.target_type),
        );
    }

    let timeout = client
        .attempt_timeout()
        .map_or(timeout, |own| own.max(timeout));
    let retry = client.retry_config();
    let result = retry_async(&retry, || async {
        match tokio::time::timeout(timeout, client.query(target)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider,
                elapsed: timeout,
            }),
        }
    })
    .await;

    match result {
        Ok(mut verdict) => {
            if verdict.provider != provider {
                tracing::warn!(
                    provider = %provider,
                    reported = %verdict.provider,
                    "Provider returned a verdict under another key"
                );
                verdict.provider = provider;
            }
            verdict
        }
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, kind = e.kind(), "Provider query failed");
            VendorVerdict::error(provider, e.to_string()).with_detail(DETAIL_ERROR_KIND, e.kind())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{TargetType, VerdictStatus, DETAIL_ERROR, DETAIL_REASON};
    use crate::orchestrator::RetryConfig;
    use crate::providers::mock::{MockFailure, MockProvider};
    use std::sync::Arc;

    fn target() -> NormalizedTarget {
        NormalizedTarget::new(TargetType::Url, "https://example.com/")
    }

    #[tokio::test]
    async fn test_unconfigured_provider_is_not_called() {
        let mock = Arc::new(MockProvider::new(Provider::PhishTank).without_credentials());
        let client: ArcProvider = mock.clone();

        let verdict = query_provider(&client, &target(), Duration::from_secs(1)).await;
        assert_eq!(verdict.status, VerdictStatus::Unknown);
        assert!(verdict.detail(DETAIL_REASON).is_some());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_error_verdict() {
        let mock = Arc::new(
            MockProvider::new(Provider::UrlScan)
                .with_latency(Duration::from_secs(30))
                .with_retry(RetryConfig::no_retry()),
        );
        let client: ArcProvider = mock.clone();

        let verdict = query_provider(&client, &target(), Duration::from_secs(2)).await;
        assert_eq!(verdict.status, VerdictStatus::Error);
        assert_eq!(verdict.detail(DETAIL_ERROR_KIND), Some("transient"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let mock = Arc::new(
            MockProvider::new(Provider::UrlScan)
                .with_verdict(VerdictStatus::Suspicious, 0.5)
                .failing_first(2, MockFailure::Transient)
                .with_retry(RetryConfig::new().with_max_attempts(3)),
        );
        let client: ArcProvider = mock.clone();

        let verdict = query_provider(&client, &target(), Duration::from_secs(2)).await;
        assert_eq!(verdict.status, VerdictStatus::Suspicious);
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let mock = Arc::new(MockProvider::new(Provider::UrlScan).failing(MockFailure::Permanent));
        let client: ArcProvider = mock.clone();

        let verdict = query_provider(&client, &target(), Duration::from_secs(2)).await;
        assert_eq!(verdict.status, VerdictStatus::Error);
        assert_eq!(verdict.detail(DETAIL_ERROR_KIND), Some("permanent"));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_analysis_polls_to_its_limit_without_resubmitting() {
        let mock = Arc::new(
            MockProvider::new(Provider::VirusTotal)
                .with_pending_analysis(RetryConfig::polling(), u32::MAX)
                .with_retry(RetryConfig::default()),
        );
        let client: ArcProvider = mock.clone();

        // the poll schedule alone outlasts the provider timeout
        let verdict = query_provider(&client, &target(), Duration::from_secs(20)).await;

        assert_eq!(verdict.status, VerdictStatus::Error);
        assert!(verdict.detail(DETAIL_ERROR).unwrap().contains("incomplete after 10 polls"));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.poll_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_analysis_completes_past_the_provider_timeout() {
        let mock = Arc::new(
            MockProvider::new(Provider::VirusTotal)
                .with_verdict(VerdictStatus::Malicious, 0.8)
                .with_pending_analysis(RetryConfig::polling(), 6)
                .with_retry(RetryConfig::default()),
        );
        let client: ArcProvider = mock.clone();

        let verdict = query_provider(&client, &target(), Duration::from_secs(20)).await;

        assert_eq!(verdict.status, VerdictStatus::Malicious);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_client_cancellation_is_a_failure() {
        let mock = Arc::new(MockProvider::new(Provider::UrlScan).failing(MockFailure::Cancelled));
        let client: ArcProvider = mock.clone();

        let verdict = query_provider(&client, &target(), Duration::from_secs(2)).await;
        assert_eq!(verdict.status, VerdictStatus::Error);
        assert_eq!(verdict.detail(DETAIL_ERROR_KIND), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_misfiled_verdict_is_rekeyed() {
        let mock = MockProvider::new(Provider::OpenPhish).reporting_as(Provider::PhishTank);
        let client: ArcProvider = Arc::new(mock);

        let verdict = query_provider(&client, &target(), Duration::from_secs(2)).await;
        assert_eq!(verdict.provider, Provider::OpenPhish);
    }

    #[tokio::test]
    async fn test_fetch_reaches_fallback_only_clients() {
        let pool = ProviderPool::new(
            vec![Arc::new(MockProvider::new(Provider::VirusTotal))],
            vec![Arc::new(
                MockProvider::new(Provider::LocalHeuristic).with_verdict(VerdictStatus::Malicious, 0.9),
            )],
            Duration::from_secs(2),
        );

        let primaries = pool.query_primaries(&target()).await;
        assert_eq!(primaries.len(), 1);
        assert!(!primaries.contains(Provider::LocalHeuristic));

        let fetched = pool.fetch(Provider::LocalHeuristic, &target()).await.unwrap();
        assert_eq!(fetched.status, VerdictStatus::Malicious);
        assert!(pool.fetch(Provider::UrlHaus, &target()).await.is_none());
    }
}
