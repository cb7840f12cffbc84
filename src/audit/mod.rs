//! Structured audit logging for compliance environments.
//!
//! Every scan emits `scan_started`, one `provider_verdict` per final entry,
//! one `fallback_applied` per healed entry and then either `scan_completed`
//! or `scan_failed`. Events go to the `scanfuse::audit` tracing target and can
//! be captured by any subscriber (JSON file, OpenTelemetry, etc.).

mod events;

pub use events::{
    emit_fallback_applied, emit_provider_verdict, emit_scan_completed, emit_scan_failed,
    emit_scan_started, AuditEvent, FallbackAuditEvent, ScanAuditEvent, VerdictAuditEvent,
};
