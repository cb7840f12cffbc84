//! Error types for the scanfuse library.
//!
//! Provider failures, pipeline failures and persistence failures each get
//! their own enum. Provider failures never fail a scan: they are folded into
//! `Error` verdicts. The library never panics; all errors are returned as
//! `Result` values.

use crate::core::types::{Provider, TargetType};

use std::time::Duration;
use thiserror::Error;

/// A failure of one provider, analyzer or collaborator call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider has no API key configured.
    #[error("provider '{provider}' has no credentials configured")]
    MissingCredentials {
        /// The unconfigured provider.
        provider: Provider,
    },

    /// The provider is unavailable or returned a server error.
    #[error("provider '{provider}' is unavailable: {reason}")]
    Unavailable {
        /// The provider.
        provider: Provider,
        /// Human-readable reason.
        reason: String,
    },

    /// The call did not finish in time.
    #[error("provider '{provider}' timed out after {elapsed:?}")]
    Timeout {
        /// The provider.
        provider: Provider,
        /// How long the call ran.
        elapsed: Duration,
    },

    /// Network connection failed.
    #[error("connection to provider '{provider}' failed: {message}")]
    ConnectionFailed {
        /// The provider.
        provider: Provider,
        /// Error message.
        message: String,
    },

    /// The provider throttled us.
    #[error("rate limit exceeded for provider '{provider}': retry after {retry_after:?}")]
    RateLimited {
        /// The provider.
        provider: Provider,
        /// Suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// A submitted analysis was still pending after the last poll.
    #[error("analysis by provider '{provider}' incomplete after {attempts} polls")]
    AnalysisPending {
        /// The provider.
        provider: Provider,
        /// Number of polls performed.
        attempts: u32,
    },

    /// The response could not be parsed or lacked expected fields.
    #[error("malformed response from provider '{provider}': {details}")]
    MalformedResponse {
        /// The provider.
        provider: Provider,
        /// What was wrong.
        details: String,
    },

    /// The API key was rejected.
    #[error("authentication failed for provider '{provider}': {reason}")]
    AuthenticationFailed {
        /// The provider.
        provider: Provider,
        /// Reason given by the provider.
        reason: String,
    },

    /// The provider cannot assess this kind of target.
    #[error("provider '{provider}' does not support {target_type} targets")]
    Unsupported {
        /// The provider.
        provider: Provider,
        /// The rejected target type.
        target_type: TargetType,
    },

    /// The call was cancelled.
    #[error("provider call was cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Returns `true` if retrying the call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. }
                | Self::Timeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::RateLimited { .. }
                | Self::AnalysisPending { .. }
        )
    }

    /// Returns the provider this error is associated with.
    pub fn provider(&self) -> Option<Provider> {
        match self {
            Self::MissingCredentials { provider }
            | Self::Unavailable { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::ConnectionFailed { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::AnalysisPending { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::AuthenticationFailed { provider, .. }
            | Self::Unsupported { provider, .. } => Some(*provider),
            Self::Cancelled => None,
        }
    }

    /// Returns `true` if the whole call should be made again.
    ///
    /// A pending analysis is transient but has already spent its own poll
    /// schedule, so it is not resubmitted.
    pub fn is_retryable(&self) -> bool {
        self.is_transient() && !matches!(self, Self::AnalysisPending { .. })
    }

    /// The provider's requested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short classification used in verdict details and audit logs.
    pub fn kind(&self) -> &'static str {
        if matches!(self, Self::Cancelled) {
            "cancelled"
        } else if self.is_transient() {
            "transient"
        } else {
            "permanent"
        }
    }

    /// Creates an `Unavailable` error.
    pub fn unavailable(provider: Provider, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            provider,
            reason: reason.into(),
        }
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(provider: Provider, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            provider,
            message: message.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed(provider: Provider, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            details: details.into(),
        }
    }
}

/// Error type for result persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No result with this id exists.
    #[error("scan result not found: {id}")]
    NotFound {
        /// The missing scan id.
        id: String,
    },

    /// A record failed validation when converting to or from a result.
    #[error("invalid scan record: {reason}")]
    InvalidRecord {
        /// What failed validation.
        reason: String,
    },

    /// The backing storage rejected a write.
    #[error("failed to write scan result: {reason}")]
    WriteFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Serialization of a record blob failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Creates an `InvalidRecord` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}

/// The main error type for a scan as a whole.
///
/// Only these failures terminate a scan; provider failures degrade to
/// `Error` verdicts instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The raw input is empty or unusable for its target type.
    #[error("invalid {target_type} input: {reason}")]
    InvalidInput {
        /// The requested target type.
        target_type: TargetType,
        /// What was wrong with the input.
        reason: String,
    },

    /// The normalizer collaborator failed.
    #[error("normalization failed: {reason}")]
    Normalization {
        /// Reason for the failure.
        reason: String,
    },

    /// The scorer produced a value outside its contract.
    #[error("risk scorer invariant violated: {message}")]
    InvariantViolation {
        /// Which invariant failed.
        message: String,
    },

    /// Persisting the result failed.
    #[error("failed to persist scan result: {0}")]
    Persistence(#[from] StoreError),

    /// The orchestrator is misconfigured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The scan was cancelled.
    #[error("scan was cancelled")]
    Cancelled,

    /// An internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl ScanError {
    /// Returns `true` if this is a cooperative cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Creates an `InvalidInput` error.
    pub fn invalid_input(target_type: TargetType, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            target_type,
            reason: reason.into(),
        }
    }

    /// Creates an `InvariantViolation` error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
