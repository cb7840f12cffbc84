//! VirusTotal URL reputation client.
//!
//! This module provides a provider client that uses the VirusTotal v3 API
//! to assess URLs.
//!
//! # Requirements
//!
//! - VirusTotal API key (`SCANFUSE_VIRUS_TOTAL_API_KEY`)
//! - Network access to www.virustotal.com
//! - The `virustotal` cargo feature
//!
//! # API Usage
//!
//! URL assessment is submit-then-poll:
//! 1. `POST /urls` with the URL as a form field returns an analysis id
//! 2. `GET /analyses/{id}` is polled until its status is `completed`
//! 3. The engine statistics are folded into one verdict

use crate::core::{Provider, ProviderClient, ProviderError, ScanError, VendorVerdict, VerdictStatus};
use crate::orchestrator::RetryConfig;
use crate::providers::credentials::ProviderCredentials;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use std::time::Duration;

#[cfg(feature = "virustotal")]
use crate::core::NormalizedTarget;
#[cfg(feature = "virustotal")]
use secrecy::ExposeSecret;

const PROVIDER: Provider = Provider::VirusTotal;

/// VirusTotal client configuration.
#[derive(Debug)]
pub struct VirusTotalConfig {
    /// API key (kept secret). `None` leaves the client unconfigured.
    pub api_key: Option<SecretString>,

    /// Base URL for the API.
    pub base_url: String,

    /// Timeout for each HTTP request.
    pub timeout: Duration,

    /// Schedule for polling a submitted analysis.
    pub poll: RetryConfig,

    /// Schedule for retrying transient failures of a whole query.
    pub retry: RetryConfig,
}

impl Default for VirusTotalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            timeout: Duration::from_secs(15),
            poll: RetryConfig::polling(),
            retry: RetryConfig::default(),
        }
    }
}

impl VirusTotalConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::new(api_key.into().into())),
            ..Self::default()
        }
    }

    /// Creates a configuration using the VirusTotal key from `credentials`.
    pub fn from_credentials(credentials: &mut ProviderCredentials) -> Self {
        Self {
            api_key: credentials.take(PROVIDER),
            ..Self::default()
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the polling schedule.
    pub fn with_poll_schedule(mut self, poll: RetryConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the retry schedule for transient failures.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Longest one submit-then-poll query can take: the submission, every
    /// poll request, and every wait between polls.
    pub fn attempt_budget(&self) -> Duration {
        self.poll.total_delay() + self.timeout * (self.poll.max_attempts + 1)
    }
}

/// VirusTotal provider client.
///
/// # Example
///
/// ```rust,ignore
/// use scanfuse::providers::{ProviderCredentials, VirusTotalClient, VirusTotalConfig};
///
/// let mut credentials = ProviderCredentials::from_env();
/// let client = VirusTotalClient::new(VirusTotalConfig::from_credentials(&mut credentials))?;
/// ```
#[derive(Debug)]
pub struct VirusTotalClient {
    config: VirusTotalConfig,
    #[cfg(feature = "virustotal")]
    client: reqwest::Client,
}

impl VirusTotalClient {
    /// Creates a new VirusTotal client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Configuration` if the HTTP client cannot be built.
    #[cfg(feature = "virustotal")]
    pub fn new(config: VirusTotalConfig) -> Result<Self, ScanError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScanError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Creates a new VirusTotal client with the given configuration.
    ///
    /// # Errors
    ///
    /// Always fails: HTTP support requires the `virustotal` feature.
    #[cfg(not(feature = "virustotal"))]
    pub fn new(_config: VirusTotalConfig) -> Result<Self, ScanError> {
        Err(ScanError::configuration(
            "VirusTotal client requires the 'virustotal' feature",
        ))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &VirusTotalConfig {
        &self.config
    }

    #[cfg(feature = "virustotal")]
    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(ProviderError::MissingCredentials { provider: PROVIDER })
    }

    /// Submits a URL and returns the analysis id.
    #[cfg(feature = "virustotal")]
    async fn submit(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/urls", self.config.base_url))
            .header("x-apikey", self.api_key()?)
            .form(&[("url", url)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let body = read_json(response).await?;
        parse_submission(&body)
    }

    /// Fetches an analysis; `None` while it is still running.
    #[cfg(feature = "virustotal")]
    async fn fetch_analysis(&self, id: &str) -> Result<Option<VendorVerdict>, ProviderError> {
        let response = self
            .client
            .get(format!("{}/analyses/{}", self.config.base_url, id))
            .header("x-apikey", self.api_key()?)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body = read_json(response).await?;
        parse_analysis(&body)
    }
}

#[cfg(feature = "virustotal")]
fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout {
            provider: PROVIDER,
            elapsed: Duration::ZERO,
        }
    } else {
        ProviderError::connection_failed(PROVIDER, e.to_string())
    }
}

#[cfg(feature = "virustotal")]
async fn read_json(response: reqwest::Response) -> Result<Value, ProviderError> {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);

    if let Some(error) = status_error(status, retry_after) {
        return Err(error);
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))
}

/// Classifies a non-success HTTP status.
#[cfg_attr(not(feature = "virustotal"), allow(dead_code))]
fn status_error(status: u16, retry_after: Option<Duration>) -> Option<ProviderError> {
    match status {
        200..=299 => None,
        401 | 403 => Some(ProviderError::AuthenticationFailed {
            provider: PROVIDER,
            reason: format!("HTTP {status}"),
        }),
        429 => Some(ProviderError::RateLimited {
            provider: PROVIDER,
            retry_after,
        }),
        500..=599 => Some(ProviderError::unavailable(PROVIDER, format!("HTTP {status}"))),
        _ => Some(ProviderError::malformed(
            PROVIDER,
            format!("unexpected HTTP {status}"),
        )),
    }
}

/// Extracts the analysis id from a submission response.
#[cfg_attr(not(feature = "virustotal"), allow(dead_code))]
fn parse_submission(body: &Value) -> Result<String, ProviderError> {
    body.pointer("/data/id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "submission response has no data.id"))
}

/// Parses an analysis response; `Ok(None)` while the analysis is running.
#[cfg_attr(not(feature = "virustotal"), allow(dead_code))]
fn parse_analysis(body: &Value) -> Result<Option<VendorVerdict>, ProviderError> {
    let attributes = body
        .pointer("/data/attributes")
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "analysis has no attributes"))?;

    match attributes.get("status").and_then(Value::as_str) {
        Some("completed") => {}
        Some("queued") | Some("in-progress") => return Ok(None),
        Some(other) => {
            return Err(ProviderError::malformed(
                PROVIDER,
                format!("unknown analysis status '{other}'"),
            ))
        }
        None => return Err(ProviderError::malformed(PROVIDER, "analysis has no status")),
    }

    let stats = attributes
        .get("stats")
        .ok_or_else(|| ProviderError::malformed(PROVIDER, "analysis has no stats"))?;
    let count = |key: &str| stats.get(key).and_then(Value::as_u64).unwrap_or(0);

    let stats = EngineStats {
        malicious: count("malicious"),
        suspicious: count("suspicious"),
        harmless: count("harmless"),
        undetected: count("undetected"),
    };

    let mut verdict = stats.verdict();
    if let Some(id) = body.pointer("/data/id").and_then(Value::as_str) {
        verdict = verdict.with_detail("analysisId", id);
    }
    Ok(Some(verdict))
}

/// Per-engine tallies of one analysis.
#[cfg_attr(not(feature = "virustotal"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct EngineStats {
    malicious: u64,
    suspicious: u64,
    harmless: u64,
    undetected: u64,
}

impl EngineStats {
    fn total(&self) -> u64 {
        self.malicious + self.suspicious + self.harmless + self.undetected
    }

    fn verdict(&self) -> VendorVerdict {
        let status = if self.malicious > 0 {
            VerdictStatus::Malicious
        } else if self.suspicious > 0 {
            VerdictStatus::Suspicious
        } else {
            VerdictStatus::Clean
        };

        let total = self.total();
        let score = if total == 0 {
            0.0
        } else {
            (self.malicious as f64 + 0.5 * self.suspicious as f64) / total as f64
        };

        VendorVerdict::new(PROVIDER, status, score)
            .with_detail("malicious", self.malicious.to_string())
            .with_detail("suspicious", self.suspicious.to_string())
            .with_detail("engines", total.to_string())
    }
}

#[async_trait]
impl ProviderClient for VirusTotalClient {
    fn provider(&self) -> Provider {
        PROVIDER
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn retry_config(&self) -> RetryConfig {
        self.config.retry.clone()
    }

    fn attempt_timeout(&self) -> Option<Duration> {
        Some(self.config.attempt_budget())
    }

    #[cfg(feature = "virustotal")]
    async fn query(&self, target: &NormalizedTarget) -> Result<VendorVerdict, ProviderError> {
        let analysis_id = self.submit(target.as_str()).await?;
        tracing::debug!(analysis_id = %analysis_id, "Submitted URL to VirusTotal");

        crate::orchestrator::poll_until_ready(&self.config.poll, PROVIDER, || {
            self.fetch_analysis(&analysis_id)
        })
        .await
    }

    #[cfg(not(feature = "virustotal"))]
    async fn query(
        &self,
        _target: &crate::core::NormalizedTarget,
    ) -> Result<VendorVerdict, ProviderError> {
        Err(ProviderError::unavailable(
            PROVIDER,
            "built without the 'virustotal' feature",
        ))
    }
}
