//! Collaborator traits.
//!
//! Provider clients, analyzers and the normalizer are injected into the
//! orchestrator through these traits. Implementations must be `Send + Sync`
//! so a single instance can serve concurrent scans.

use crate::core::error::{ProviderError, ScanError};
use crate::core::normalize::NormalizedTarget;
use crate::core::report::{MlReport, NetworkReport, SpecializedReport};
use crate::core::types::{Provider, ScanRequest, TargetType, VendorVerdict};
use crate::orchestrator::RetryConfig;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A client for one threat-intelligence provider.
///
/// # Implementation Notes
///
/// - `query` should return a verdict whose `provider` equals `provider()`;
///   the orchestrator rewrites it otherwise.
/// - Transient failures (see [`ProviderError::is_transient`]) are retried by
///   the caller according to `retry_config`; implementations should not
///   retry on their own except for submit-then-poll waits.
/// - A client without credentials must report `is_configured() == false`;
///   it is then never called.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanfuse::core::{NormalizedTarget, Provider, ProviderClient, ProviderError, VendorVerdict};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Blocklist { hosts: Vec<String> }
///
/// #[async_trait]
/// impl ProviderClient for Blocklist {
///     fn provider(&self) -> Provider {
///         Provider::UrlHaus
///     }
///
///     async fn query(&self, target: &NormalizedTarget) -> Result<VendorVerdict, ProviderError> {
///         let hit = target.host().map_or(false, |h| self.hosts.iter().any(|b| b == h));
///         Ok(if hit {
///             VendorVerdict::malicious(Provider::UrlHaus, 1.0)
///         } else {
///             VendorVerdict::clean(Provider::UrlHaus, 0.0)
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderClient: Send + Sync + Debug {
    /// The provider this client speaks for.
    fn provider(&self) -> Provider;

    /// Whether the client has the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }

    /// Whether the client can assess this kind of target.
    fn supports(&self, target_type: TargetType) -> bool {
        target_type == TargetType::Url
    }

    /// Retry policy for transient failures of this provider.
    fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
    }

    /// Bound on one `query` attempt when it must outlast the orchestrator's
    /// provider timeout, as a submit-then-poll query does.
    fn attempt_timeout(&self) -> Option<Duration> {
        None
    }

    /// Queries the provider for a verdict on the target.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError`; transient errors are retried by the caller.
    async fn query(&self, target: &NormalizedTarget) -> Result<VendorVerdict, ProviderError>;
}

/// Probes the transport-layer posture of a URL's host.
#[async_trait]
pub trait NetworkAnalyzer: Send + Sync + Debug {
    /// Produces a network report for the target.
    async fn analyze(&self, target: &NormalizedTarget) -> Result<NetworkReport, ProviderError>;
}

/// Runs the on-device ML classifier.
#[async_trait]
pub trait MlAnalyzer: Send + Sync + Debug {
    /// Produces a prediction for the target.
    async fn predict(&self, target: &NormalizedTarget) -> Result<MlReport, ProviderError>;
}

/// Analyzes one non-URL target type.
#[async_trait]
pub trait SpecializedAnalyzer: Send + Sync + Debug {
    /// The single target type this analyzer handles.
    fn target_type(&self) -> TargetType;

    /// Produces a report. `request` carries the presentation metadata.
    async fn analyze(
        &self,
        request: &ScanRequest,
        target: &NormalizedTarget,
    ) -> Result<SpecializedReport, ProviderError>;
}

/// Turns raw user input into a canonical target.
pub trait Normalizer: Send + Sync + Debug {
    /// Normalizes the request's raw input.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidInput` or `ScanError::Normalization`; both
    /// are fatal to the scan.
    fn normalize(&self, request: &ScanRequest) -> Result<NormalizedTarget, ScanError>;
}

/// An arc-wrapped provider client for shared ownership.
pub type ArcProvider = Arc<dyn ProviderClient>;

/// An arc-wrapped network analyzer.
pub type ArcNetworkAnalyzer = Arc<dyn NetworkAnalyzer>;

/// An arc-wrapped ML analyzer.
pub type ArcMlAnalyzer = Arc<dyn MlAnalyzer>;

/// An arc-wrapped specialized analyzer.
pub type ArcSpecializedAnalyzer = Arc<dyn SpecializedAnalyzer>;
