//! Persistence for finished scan results.
//!
//! [`ResultStore`] is the seam the orchestrator persists through. Two
//! implementations ship with the crate:
//!
//! - [`InMemoryResultStore`] - for tests and short-lived processes
//! - [`FilesystemResultStore`] - one JSON document per scan
//!
//! Both persist the row shape defined in [`ScanRecord`] and [`VerdictRecord`].

mod filesystem;
mod memory;
mod record;
mod traits;

pub use filesystem::FilesystemResultStore;
pub use memory::InMemoryResultStore;
pub use record::{ResultFilter, ScanRecord, StoredScan, VerdictRecord};
pub use traits::ResultStore;
