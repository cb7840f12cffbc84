//! Zero-network heuristic provider.
//!
//! Scores URLs and social handles from their text alone. It never fails and
//! needs no credentials, which makes it the last-resort candidate in most
//! fallback chains.

use crate::core::{
    NormalizedTarget, Provider, ProviderClient, ProviderError, TargetType, VendorVerdict,
    VerdictStatus,
};
use crate::orchestrator::RetryConfig;

use async_trait::async_trait;

const MALICIOUS_THRESHOLD: f64 = 0.6;
const SUSPICIOUS_THRESHOLD: f64 = 0.3;

const SUSPICIOUS_TLDS: &[&str] = &[
    "zip", "mov", "xyz", "top", "tk", "ml", "ga", "cf", "gq", "click", "country", "work",
];

const LURE_KEYWORDS: &[&str] = &[
    "login", "verify", "account", "secure", "update", "banking", "wallet", "password", "signin",
    "confirm",
];

const IMPERSONATED_BRANDS: &[&str] = &["paypal", "apple", "microsoft", "google", "amazon", "bank"];

/// One textual signal and its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Signal {
    name: &'static str,
    weight: f64,
}

impl Signal {
    const fn new(name: &'static str, weight: f64) -> Self {
        Self { name, weight }
    }
}

/// Heuristic provider filed under [`Provider::LocalHeuristic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHeuristicProvider;

impl LocalHeuristicProvider {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }

    /// Evaluates a target synchronously.
    pub fn evaluate(&self, target: &NormalizedTarget) -> VendorVerdict {
        let signals = match target.target_type {
            TargetType::Url => url_signals(target),
            TargetType::SocialHandle => handle_signals(target.as_str()),
            other => {
                return VendorVerdict::unknown(
                    Provider::LocalHeuristic,
                    format!("{other} targets are not evaluated locally"),
                )
            }
        };

        let score = signals.iter().map(|s| s.weight).sum::<f64>().min(1.0);
        let status = if score >= MALICIOUS_THRESHOLD {
            VerdictStatus::Malicious
        } else if score >= SUSPICIOUS_THRESHOLD {
            VerdictStatus::Suspicious
        } else {
            VerdictStatus::Clean
        };

        let mut verdict = VendorVerdict::new(Provider::LocalHeuristic, status, score);
        if !signals.is_empty() {
            let names: Vec<&str> = signals.iter().map(|s| s.name).collect();
            verdict = verdict.with_detail("signals", names.join(","));
        }
        verdict
    }
}

fn url_signals(target: &NormalizedTarget) -> Vec<Signal> {
    let url = target.as_str();
    let lower = url.to_ascii_lowercase();
    let host = target.host().unwrap_or_default();
    let mut signals = Vec::new();

    if is_ip_literal(host) {
        signals.push(Signal::new("ip_host", 0.35));
    }
    if lower.starts_with("http://") {
        signals.push(Signal::new("plain_http", 0.1));
    }
    if url.split_once("://").is_some_and(|(_, rest)| rest.contains('@')) {
        signals.push(Signal::new("embedded_credentials", 0.3));
    }
    if host.split('.').any(|label| label.starts_with("xn--")) {
        signals.push(Signal::new("punycode", 0.25));
    }
    if let Some(tld) = host.rsplit('.').next() {
        if SUSPICIOUS_TLDS.iter().any(|t| *t == tld) {
            signals.push(Signal::new("suspicious_tld", 0.2));
        }
    }
    if host.split('.').count() > 4 {
        signals.push(Signal::new("deep_subdomains", 0.15));
    }
    if url.len() > 120 {
        signals.push(Signal::new("long_url", 0.1));
    }

    let lures = LURE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    if lures > 0 {
        signals.push(Signal::new("lure_keywords", (lures as f64 * 0.1).min(0.25)));
    }

    // a brand name anywhere but the registrable domain
    let registrable = registrable_label(host);
    if IMPERSONATED_BRANDS
        .iter()
        .any(|b| lower.contains(b) && registrable != Some(*b))
    {
        signals.push(Signal::new("brand_mention", 0.15));
    }

    signals
}

fn handle_signals(handle: &str) -> Vec<Signal> {
    let mut signals = Vec::new();
    let lower = handle.to_ascii_lowercase();

    let support_words = ["support", "help", "official", "verify", "admin", "giveaway"];
    if support_words.iter().any(|w| lower.contains(w)) {
        signals.push(Signal::new("impersonation_keyword", 0.25));
    }
    if IMPERSONATED_BRANDS.iter().any(|b| lower.contains(b)) {
        signals.push(Signal::new("brand_mention", 0.2));
    }

    let digits = lower.chars().filter(char::is_ascii_digit).count();
    if digits >= 4 {
        signals.push(Signal::new("digit_run", 0.15));
    }
    if lower.matches(['_', '.']).count() >= 3 {
        signals.push(Signal::new("separator_padding", 0.1));
    }

    signals
}

fn is_ip_literal(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.parse::<std::net::IpAddr>().is_ok()
}

/// Second-level label of a host, e.g. `paypal` for `www.paypal.com`.
fn registrable_label(host: &str) -> Option<&str> {
    let mut labels = host.rsplit('.');
    labels.next()?;
    labels.next()
}

#[async_trait]
impl ProviderClient for LocalHeuristicProvider {
    fn provider(&self) -> Provider {
        Provider::LocalHeuristic
    }

    fn supports(&self, target_type: TargetType) -> bool {
        matches!(target_type, TargetType::Url | TargetType::SocialHandle)
    }

    fn retry_config(&self) -> RetryConfig {
        RetryConfig::no_retry()
    }

    async fn query(&self, target: &NormalizedTarget) -> Result<VendorVerdict, ProviderError> {
        if !self.supports(target.target_type) {
            return Err(ProviderError::Unsupported {
                provider: Provider::LocalHeuristic,
                target_type: target.target_type,
            });
        }
        Ok(self.evaluate(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DefaultNormalizer, Normalizer, ScanRequest};

    fn url(raw: &str) -> NormalizedTarget {
        DefaultNormalizer::new()
            .normalize(&ScanRequest::url(raw))
            .unwrap()
    }

    #[test]
    fn test_benign_url_is_clean() {
        let verdict = LocalHeuristicProvider::new().evaluate(&url("https://www.rust-lang.org/"));
        assert_eq!(verdict.status, VerdictStatus::Clean);
        assert_eq!(verdict.score, 0.0);
        assert!(verdict.detail("signals").is_none());
    }

    #[test]
    fn test_ip_host_over_http() {
        let verdict = LocalHeuristicProvider::new().evaluate(&url("http://192.168.4.20/login"));
        assert_eq!(verdict.status, VerdictStatus::Suspicious);
        let signals = verdict.detail("signals").unwrap();
        assert!(signals.contains("ip_host"));
        assert!(signals.contains("plain_http"));
    }

    #[test]
    fn test_phishing_shape_is_malicious() {
        let verdict = LocalHeuristicProvider::new()
            .evaluate(&url("http://paypal.com@secure-login.verify-account.xyz/update"));
        assert_eq!(verdict.status, VerdictStatus::Malicious);
        assert!(verdict.score <= 1.0);
    }

    #[test]
    fn test_brand_on_own_domain_is_not_flagged() {
        let verdict = LocalHeuristicProvider::new().evaluate(&url("https://www.paypal.com/"));
        assert!(verdict.detail("signals").is_none());
    }

    #[test]
    fn test_social_handle() {
        let target = NormalizedTarget::new(TargetType::SocialHandle, "paypal_support_official_2024");
        let verdict = LocalHeuristicProvider::new().evaluate(&target);
        assert_eq!(verdict.status, VerdictStatus::Malicious);

        let target = NormalizedTarget::new(TargetType::SocialHandle, "rustlang");
        assert_eq!(
            LocalHeuristicProvider::new().evaluate(&target).status,
            VerdictStatus::Clean
        );
    }

    #[tokio::test]
    async fn test_file_targets_are_unsupported() {
        let provider = LocalHeuristicProvider::new();
        let target = NormalizedTarget::new(TargetType::File, "abc123");
        assert!(!provider.supports(TargetType::File));
        assert!(matches!(
            provider.query(&target).await,
            Err(ProviderError::Unsupported { .. })
        ));
        assert_eq!(provider.evaluate(&target).status, VerdictStatus::Unknown);
    }
}
