//! Provider client implementations.
//!
//! This module contains the reference `ProviderClient` implementations:
//!
//! - [`VirusTotalClient`] - VirusTotal v3 URL reputation (requires the `virustotal` feature for HTTP)
//! - [`LocalHeuristicProvider`] - Zero-network URL and handle heuristics
//! - [`mock`] - Configurable mocks for every collaborator trait
//!
//! [`ProviderCredentials`] loads API keys from the environment.

mod credentials;
mod heuristic;
pub mod mock;
mod virustotal;

pub use credentials::ProviderCredentials;
pub use heuristic::LocalHeuristicProvider;
pub use mock::{MockMlAnalyzer, MockNetworkAnalyzer, MockProvider, MockSpecializedAnalyzer};
pub use virustotal::{VirusTotalClient, VirusTotalConfig};
