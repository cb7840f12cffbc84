//! Input normalization.
//!
//! `DefaultNormalizer` is a small reference implementation of the
//! [`Normalizer`](crate::core::Normalizer) collaborator. Applications with
//! richer parsing (QR payloads, deep links) supply their own.

use crate::core::error::ScanError;
use crate::core::traits::Normalizer;
use crate::core::types::{ScanRequest, TargetType};

use serde::{Deserialize, Serialize};

/// Metadata key a caller may use to pass a precomputed file digest.
pub const METADATA_SHA256: &str = "sha256";

/// Metadata key for a VPN profile's display label.
pub const METADATA_PROFILE_LABEL: &str = "profile_label";

/// Metadata key for the platform of a social handle.
pub const METADATA_PLATFORM: &str = "platform";

/// A target in canonical form, shared read-only by every provider task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTarget {
    /// Kind of target.
    pub target_type: TargetType,

    /// Canonical value (URL, file digest or path, profile label, handle).
    pub value: String,

    /// Lowercase host for URL targets.
    host: Option<String>,
}

impl NormalizedTarget {
    /// Creates a normalized target without a host.
    pub fn new(target_type: TargetType, value: impl Into<String>) -> Self {
        Self {
            target_type,
            value: value.into(),
            host: None,
        }
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// The host for URL targets.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The canonical value.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Reference normalizer.
///
/// - URLs: trimmed, `https://` assumed when no scheme is given, scheme and
///   host lowercased, fragment dropped, empty path becomes `/`.
/// - Files: the `sha256` metadata entry when present, otherwise the trimmed input.
/// - VPN profiles: the `profile_label` metadata entry when present, otherwise the trimmed input.
/// - Social handles: profile URLs reduced to the handle, leading `@` removed, lowercased.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNormalizer;

impl DefaultNormalizer {
    /// Creates a new normalizer.
    pub fn new() -> Self {
        Self
    }

    fn normalize_url(raw: &str) -> Result<NormalizedTarget, ScanError> {
        let (scheme, rest) = match raw.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => ("https".to_string(), raw),
        };
        if scheme != "http" && scheme != "https" {
            return Err(ScanError::invalid_input(
                TargetType::Url,
                format!("unsupported scheme '{scheme}'"),
            ));
        }

        let rest = rest.split('#').next().unwrap_or_default();
        let split_at = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(split_at);

        // userinfo is never part of the host
        let host_port = authority.rsplit('@').next().unwrap_or_default();
        let host = host_port
            .rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map_or(host_port, |(host, _)| host)
            .trim_end_matches('.')
            .to_ascii_lowercase();

        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(ScanError::invalid_input(TargetType::Url, "missing or invalid host"));
        }

        let tail = if tail.is_empty() || tail.starts_with('?') {
            format!("/{tail}")
        } else {
            tail.to_string()
        };
        let authority = authority.to_ascii_lowercase();

        Ok(NormalizedTarget::new(TargetType::Url, format!("{scheme}://{authority}{tail}"))
            .with_host(host))
    }

    fn normalize_handle(raw: &str) -> Result<NormalizedTarget, ScanError> {
        let without_scheme = raw.split_once("://").map_or(raw, |(_, rest)| rest);
        let candidate = if without_scheme.contains('/') {
            without_scheme
                .split('/')
                .skip(1)
                .find(|segment| !segment.is_empty())
                .unwrap_or_default()
        } else {
            without_scheme
        };
        let handle = candidate
            .split('?')
            .next()
            .unwrap_or_default()
            .trim_start_matches('@')
            .to_lowercase();

        if handle.is_empty() {
            return Err(ScanError::invalid_input(TargetType::SocialHandle, "empty handle"));
        }
        Ok(NormalizedTarget::new(TargetType::SocialHandle, handle))
    }
}

impl Normalizer for DefaultNormalizer {
    fn normalize(&self, request: &ScanRequest) -> Result<NormalizedTarget, ScanError> {
        let raw = request.raw_input.trim();
        if raw.is_empty() {
            return Err(ScanError::invalid_input(request.target_type, "empty input"));
        }

        match request.target_type {
            TargetType::Url => Self::normalize_url(raw),
            TargetType::File => {
                let value = request
                    .metadata_value(METADATA_SHA256)
                    .map(|digest| digest.trim().to_ascii_lowercase())
                    .unwrap_or_else(|| raw.to_string());
                Ok(NormalizedTarget::new(TargetType::File, value))
            }
            TargetType::VpnConfig => {
                let value = request
                    .metadata_value(METADATA_PROFILE_LABEL)
                    .unwrap_or(raw)
                    .trim()
                    .to_string();
                Ok(NormalizedTarget::new(TargetType::VpnConfig, value))
            }
            TargetType::SocialHandle => Self::normalize_handle(raw),
        }
    }
}
