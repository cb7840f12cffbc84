//! Core types and traits for the scanfuse library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - Requests, providers, verdict statuses and the verdict map
//! - [`report`] - Network, ML and specialized analyzer reports
//! - [`traits`] - Collaborator traits (`ProviderClient`, analyzers, `Normalizer`)
//! - [`normalize`] - Normalized targets and the reference normalizer
//! - [`error`] - Structured error types
//! - [`result`] - The immutable `ScanResult` and its fuzzy breakdown

pub mod error;
pub mod normalize;
pub mod report;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types at the core level
pub use error::{ProviderError, ProviderResult, ScanError, StoreError, StoreResult};
pub use normalize::{
    DefaultNormalizer, NormalizedTarget, METADATA_PLATFORM, METADATA_PROFILE_LABEL, METADATA_SHA256,
};
pub use report::{
    FileReport, MlReport, NetworkReport, SocialHandleReport, SpecializedReport, VpnConfigReport,
};
pub use result::{RiskBreakdown, RiskCategory, ScanFindings, ScanId, ScanResult, MAX_RISK};
pub use traits::{
    ArcMlAnalyzer, ArcNetworkAnalyzer, ArcProvider, ArcSpecializedAnalyzer, MlAnalyzer,
    NetworkAnalyzer, Normalizer, ProviderClient, SpecializedAnalyzer,
};
pub use types::{
    Provider, ScanRequest, TargetType, VendorVerdict, VerdictMap, VerdictStatus,
    DETAIL_ERROR, DETAIL_FALLBACK_PROVIDER, DETAIL_FALLBACK_REASON, DETAIL_REASON,
};
