//! Scan orchestration.
//!
//! The [`ScanOrchestrator`] drives one scan end to end: it normalizes the
//! request, queries the providers concurrently, heals failed verdicts from
//! the fallback matrix, scores the result, persists it, and reports progress
//! as a stream of [`ScanEvent`]s.

mod events;
mod pool;
mod retry;
mod scan_orchestrator;

pub use events::{ScanEvent, ScanEventStream, ScanStage};
pub use pool::DETAIL_ERROR_KIND;
pub use retry::{poll_until_ready, retry_async, RetryConfig};
pub use scan_orchestrator::{OrchestratorConfig, ScanOrchestrator, ScanOrchestratorBuilder};
