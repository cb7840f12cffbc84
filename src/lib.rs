//! # Scanfuse
//!
//! Concurrent multi-provider threat intelligence for URLs, files, VPN
//! profiles and social handles, with fallback healing and fuzzy risk fusion.
//!
//! ## Overview
//!
//! Scanfuse queries several independent threat-intelligence providers at
//! once, tolerates the failure of any subset of them, and fuses the partial
//! signals into one calibrated risk value:
//!
//! - Query every configured provider concurrently with per-call timeouts
//!   and retries for transient failures
//! - Heal failed or silent providers from a fixed fallback matrix
//! - Blend vendor consensus with ML, network posture or a specialized report
//! - Report a risk in `[0, 5]` plus a fuzzy category breakdown
//! - Persist every result and emit structured audit events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scanfuse::prelude::*;
//! use scanfuse::providers::{LocalHeuristicProvider, MockProvider};
//! use scanfuse::store::InMemoryResultStore;
//!
//! # async fn run() -> Result<(), ScanError> {
//! let orchestrator = ScanOrchestrator::builder()
//!     .add_provider(MockProvider::new(Provider::VirusTotal))
//!     .add_fallback_provider(LocalHeuristicProvider::new())
//!     .with_store(InMemoryResultStore::new())
//!     .build()?;
//!
//! let result = orchestrator.scan(ScanRequest::url("example.com")).await?;
//! println!("risk {:.2} ({})", result.risk, result.category());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `virustotal` - HTTP support for the VirusTotal client (pulls in `reqwest`)
//!
//! ## Architecture
//!
//! - **Core**: Requests, verdicts, reports, results, collaborator traits and errors
//! - **Providers**: Reference provider clients, credentials and mocks
//! - **Orchestrator**: Fan-out, retries, progress events and cancellation
//! - **Fallback**: The substitution matrix and resolver
//! - **Scoring**: Pure risk fusion functions
//! - **Store**: Result persistence
//! - **Audit**: Structured logging for compliance

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod core;
pub mod fallback;
pub mod orchestrator;
pub mod providers;
pub mod scoring;
pub mod store;

// Re-export commonly used types at the crate root
pub use crate::core::{
    Provider, ProviderClient, ProviderError, RiskBreakdown, RiskCategory, ScanError, ScanId,
    ScanRequest, ScanResult, TargetType, VendorVerdict, VerdictMap, VerdictStatus,
};

pub use crate::fallback::FallbackResolver;
pub use crate::orchestrator::{
    OrchestratorConfig, RetryConfig, ScanEvent, ScanEventStream, ScanOrchestrator, ScanStage,
};
pub use crate::store::{ResultFilter, ResultStore};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanfuse::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        MlAnalyzer, NetworkAnalyzer, Provider, ProviderClient, ProviderError, RiskCategory,
        ScanError, ScanRequest, ScanResult, SpecializedAnalyzer, TargetType, VendorVerdict,
        VerdictStatus,
    };
    pub use crate::orchestrator::{
        OrchestratorConfig, RetryConfig, ScanEvent, ScanOrchestrator, ScanStage,
    };
    pub use crate::store::{ResultFilter, ResultStore};
}
