//! Core types used throughout the scanfuse library.
//!
//! This module defines scan requests, provider identities, verdict
//! statuses and the per-provider verdict structure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of target being assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// A web URL.
    Url,
    /// An uploaded file.
    File,
    /// A VPN profile (OpenVPN, WireGuard, ...).
    VpnConfig,
    /// A social-media account handle.
    SocialHandle,
}

impl TargetType {
    /// Returns a stable lowercase name for this target type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::File => "file",
            Self::VpnConfig => "vpn_config",
            Self::SocialHandle => "social_handle",
        }
    }

    /// Returns the analyzer provider responsible for this target type,
    /// or `None` for URLs, which fan out to the intel providers instead.
    pub fn specialized_provider(&self) -> Option<Provider> {
        match self {
            Self::Url => None,
            Self::File => Some(Provider::FileAnalyzer),
            Self::VpnConfig => Some(Provider::VpnConfigAnalyzer),
            Self::SocialHandle => Some(Provider::SocialHandleAnalyzer),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to assess one target.
///
/// Created once per user action and never mutated afterwards; the
/// builder-style setters consume `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// What kind of target `raw_input` describes.
    pub target_type: TargetType,

    /// The target exactly as supplied by the caller.
    pub raw_input: String,

    /// Presentation-supplied context (file name, MIME type, profile label, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ScanRequest {
    /// Creates a new request.
    pub fn new(target_type: TargetType, raw_input: impl Into<String>) -> Self {
        Self {
            target_type,
            raw_input: raw_input.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a URL scan request.
    pub fn url(raw_input: impl Into<String>) -> Self {
        Self::new(TargetType::Url, raw_input)
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// The identity of a signal source.
///
/// This is a fixed set; new providers require a new release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// VirusTotal URL/file reputation.
    VirusTotal,
    /// Google Safe Browsing lookup.
    GoogleSafeBrowsing,
    /// urlscan.io sandboxed page analysis.
    UrlScan,
    /// PhishTank community phishing feed.
    PhishTank,
    /// URLhaus malware distribution blocklist.
    UrlHaus,
    /// OpenPhish phishing feed.
    OpenPhish,
    /// AbuseIPDB host reputation.
    AbuseIpDb,
    /// AlienVault OTX pulses.
    AlienVaultOtx,
    /// IPQualityScore URL/host scoring.
    IpQualityScore,
    /// On-device ML classifier.
    MlModel,
    /// Zero-network heuristic engine.
    LocalHeuristic,
    /// Transport-layer posture analyzer.
    NetworkAnalyzer,
    /// Static file analyzer.
    FileAnalyzer,
    /// VPN profile analyzer.
    VpnConfigAnalyzer,
    /// Social handle analyzer.
    SocialHandleAnalyzer,
    /// Manual override supplied by an operator.
    Manual,
}

impl Provider {
    /// Every provider, in declaration order.
    pub const ALL: [Provider; 16] = [
        Self::VirusTotal,
        Self::GoogleSafeBrowsing,
        Self::UrlScan,
        Self::PhishTank,
        Self::UrlHaus,
        Self::OpenPhish,
        Self::AbuseIpDb,
        Self::AlienVaultOtx,
        Self::IpQualityScore,
        Self::MlModel,
        Self::LocalHeuristic,
        Self::NetworkAnalyzer,
        Self::FileAnalyzer,
        Self::VpnConfigAnalyzer,
        Self::SocialHandleAnalyzer,
        Self::Manual,
    ];

    /// Returns the stable snake_case name of this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VirusTotal => "virus_total",
            Self::GoogleSafeBrowsing => "google_safe_browsing",
            Self::UrlScan => "url_scan",
            Self::PhishTank => "phish_tank",
            Self::UrlHaus => "url_haus",
            Self::OpenPhish => "open_phish",
            Self::AbuseIpDb => "abuse_ip_db",
            Self::AlienVaultOtx => "alien_vault_otx",
            Self::IpQualityScore => "ip_quality_score",
            Self::MlModel => "ml_model",
            Self::LocalHeuristic => "local_heuristic",
            Self::NetworkAnalyzer => "network_analyzer",
            Self::FileAnalyzer => "file_analyzer",
            Self::VpnConfigAnalyzer => "vpn_config_analyzer",
            Self::SocialHandleAnalyzer => "social_handle_analyzer",
            Self::Manual => "manual",
        }
    }

    /// Parses a provider from its stable name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == name)
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_env_var(&self) -> String {
        format!("SCANFUSE_{}_API_KEY", self.as_str().to_ascii_uppercase())
    }

    /// Returns `true` for third-party threat-intelligence services.
    pub fn is_external_intel(&self) -> bool {
        matches!(
            self,
            Self::VirusTotal
                | Self::GoogleSafeBrowsing
                | Self::UrlScan
                | Self::PhishTank
                | Self::UrlHaus
                | Self::OpenPhish
                | Self::AbuseIpDb
                | Self::AlienVaultOtx
                | Self::IpQualityScore
        )
    }

    /// How much a signal from this provider counts in the vendor average.
    pub fn reliability(&self) -> f64 {
        match self {
            Self::LocalHeuristic => 0.5,
            Self::MlModel => 0.8,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The categorical part of a provider's opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictStatus {
    /// Nothing harmful found.
    Clean,
    /// Potentially harmful.
    Suspicious,
    /// Known harmful.
    Malicious,
    /// No opinion, e.g. the provider is not configured.
    Unknown,
    /// The provider was queried and failed.
    Error,
}

impl VerdictStatus {
    /// Returns `true` if the status carries an actual opinion.
    pub fn is_decisive(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Error)
    }

    /// The status-derived component of a verdict's weight.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Malicious => 1.0,
            Self::Suspicious => 0.6,
            Self::Clean | Self::Unknown | Self::Error => 0.0,
        }
    }

    /// Returns a stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Suspicious => "suspicious",
            Self::Malicious => "malicious",
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detail key recording which provider supplied a fallback verdict.
pub const DETAIL_FALLBACK_PROVIDER: &str = "fallbackProvider";

/// Detail key recording why a fallback verdict was used.
pub const DETAIL_FALLBACK_REASON: &str = "fallbackReason";

/// Detail key carrying a provider failure message.
pub const DETAIL_ERROR: &str = "error";

/// Detail key explaining an `Unknown` verdict.
pub const DETAIL_REASON: &str = "reason";

/// One provider's opinion about one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorVerdict {
    /// The provider that owns this entry.
    pub provider: Provider,

    /// Categorical verdict.
    pub status: VerdictStatus,

    /// Normalized score in `[0, 1]`.
    pub score: f64,

    /// Provider-specific detail for display and auditing.
    #[serde(default)]
    pub details: BTreeMap<String, Option<String>>,
}

impl VendorVerdict {
    /// Creates a verdict, sanitizing the score into `[0, 1]`.
    pub fn new(provider: Provider, status: VerdictStatus, score: f64) -> Self {
        Self {
            provider,
            status,
            score: crate::scoring::sanitize_unit(score),
            details: BTreeMap::new(),
        }
    }

    /// Creates a `Clean` verdict.
    pub fn clean(provider: Provider, score: f64) -> Self {
        Self::new(provider, VerdictStatus::Clean, score)
    }

    /// Creates a `Suspicious` verdict.
    pub fn suspicious(provider: Provider, score: f64) -> Self {
        Self::new(provider, VerdictStatus::Suspicious, score)
    }

    /// Creates a `Malicious` verdict.
    pub fn malicious(provider: Provider, score: f64) -> Self {
        Self::new(provider, VerdictStatus::Malicious, score)
    }

    /// Creates an `Unknown` verdict with an explanation.
    pub fn unknown(provider: Provider, reason: impl Into<String>) -> Self {
        Self::new(provider, VerdictStatus::Unknown, 0.0).with_detail(DETAIL_REASON, reason)
    }

    /// Creates an `Error` verdict carrying the failure message.
    pub fn error(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(provider, VerdictStatus::Error, 0.0).with_detail(DETAIL_ERROR, message)
    }

    /// Adds a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), Some(value.into()));
        self
    }

    /// Adds a detail key with no value.
    pub fn with_empty_detail(mut self, key: impl Into<String>) -> Self {
        self.details.insert(key.into(), None);
        self
    }

    /// Returns a detail value by key.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(|v| v.as_deref())
    }

    /// Returns `true` if the verdict can stand in for another provider.
    pub fn is_usable(&self) -> bool {
        self.status.is_decisive()
    }

    /// Returns `true` if this entry was rewritten by the fallback resolver.
    pub fn is_fallback(&self) -> bool {
        self.details.contains_key(DETAIL_FALLBACK_PROVIDER)
    }

    /// The provider whose signal this entry actually carries.
    pub fn signal_source(&self) -> Provider {
        self.detail(DETAIL_FALLBACK_PROVIDER)
            .and_then(Provider::from_name)
            .unwrap_or(self.provider)
    }

    /// Combined weight: `status weight × 0.6 + score × 0.4`.
    pub fn weight(&self) -> f64 {
        let score = crate::scoring::sanitize_unit(self.score);
        self.status.weight() * 0.6 + score * 0.4
    }
}

/// The per-scan set of verdicts, keyed by provider.
///
/// Inserting a verdict for a provider that already has one replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerdictMap(BTreeMap<Provider, VendorVerdict>);

impl VerdictMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a verdict under its own provider key, returning the one it replaced.
    pub fn insert(&mut self, verdict: VendorVerdict) -> Option<VendorVerdict> {
        self.0.insert(verdict.provider, verdict)
    }

    /// Returns the verdict for a provider.
    pub fn get(&self, provider: Provider) -> Option<&VendorVerdict> {
        self.0.get(&provider)
    }

    /// Returns a mutable verdict for a provider.
    pub fn get_mut(&mut self, provider: Provider) -> Option<&mut VendorVerdict> {
        self.0.get_mut(&provider)
    }

    /// Returns `true` if the provider has an entry.
    pub fn contains(&self, provider: Provider) -> bool {
        self.0.contains_key(&provider)
    }

    /// Number of providers with an entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no provider has an entry.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over verdicts in provider order.
    pub fn iter(&self) -> impl Iterator<Item = &VendorVerdict> {
        self.0.values()
    }

    /// Providers with an entry, in provider order.
    pub fn providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.0.keys().copied()
    }

    /// Counts verdicts with the given status.
    pub fn count(&self, status: VerdictStatus) -> usize {
        self.iter().filter(|v| v.status == status).count()
    }
}

impl FromIterator<VendorVerdict> for VerdictMap {
    fn from_iter<I: IntoIterator<Item = VendorVerdict>>(iter: I) -> Self {
        let mut map = Self::new();
        for verdict in iter {
            map.insert(verdict);
        }
        map
    }
}

impl IntoIterator for VerdictMap {
    type Item = VendorVerdict;
    type IntoIter = std::collections::btree_map::IntoValues<Provider, VendorVerdict>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}
