//! API keys for external providers.

use crate::core::Provider;

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;

/// API keys for external providers, held as secrets.
///
/// Keys are read from `SCANFUSE_<PROVIDER>_API_KEY` environment variables,
/// e.g. `SCANFUSE_VIRUS_TOTAL_API_KEY`. Empty values count as missing.
#[derive(Default)]
pub struct ProviderCredentials {
    keys: BTreeMap<Provider, SecretString>,
}

impl ProviderCredentials {
    /// Creates an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every external provider's key from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads keys through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::new();
        for provider in Provider::ALL.into_iter().filter(Provider::is_external_intel) {
            if let Some(key) = lookup(&provider.credential_env_var()) {
                credentials = credentials.with_key(provider, key);
            }
        }
        tracing::debug!(
            configured = credentials.keys.len(),
            "Loaded provider credentials"
        );
        credentials
    }

    /// Sets the key for `provider`. Blank keys are ignored.
    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        let key = key.into();
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            self.keys
                .insert(provider, SecretString::new(trimmed.to_string().into()));
        }
        self
    }

    /// Returns the key for `provider`.
    pub fn get(&self, provider: Provider) -> Option<&SecretString> {
        self.keys.get(&provider)
    }

    /// Removes and returns the key for `provider`.
    pub fn take(&mut self, provider: Provider) -> Option<SecretString> {
        self.keys.remove(&provider)
    }

    /// Returns `true` if a key is present for `provider`.
    pub fn is_configured(&self, provider: Provider) -> bool {
        self.keys
            .get(&provider)
            .is_some_and(|key| !key.expose_secret().is_empty())
    }

    /// Providers with a key, in provider order.
    pub fn configured_providers(&self) -> impl Iterator<Item = Provider> + '_ {
        self.keys.keys().copied()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("configured", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}
