//! Result store trait definition.

use crate::core::{ScanId, ScanResult, StoreError};
use crate::store::record::ResultFilter;

use async_trait::async_trait;
use std::fmt::Debug;

/// Trait for result storage implementations.
///
/// The orchestrator calls [`save`](ResultStore::save) exactly once per
/// successful scan, after the scorer contract has been validated. A failed
/// save fails the scan.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanfuse::store::{ResultFilter, ResultStore};
/// use scanfuse::core::{ScanId, ScanResult, StoreError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct SqlResultStore {
///     // Your connection pool
/// }
///
/// #[async_trait]
/// impl ResultStore for SqlResultStore {
///     async fn save(&self, result: &ScanResult) -> Result<(), StoreError> {
///         // Insert StoredScan::from_result(result)? rows
///         todo!()
///     }
///
///     async fn load(&self, id: &ScanId) -> Result<ScanResult, StoreError> {
///         todo!()
///     }
///
///     async fn delete(&self, id: &ScanId) -> Result<(), StoreError> {
///         todo!()
///     }
///
///     async fn list(&self, filter: ResultFilter) -> Result<Vec<ScanResult>, StoreError> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait ResultStore: Send + Sync + Debug {
    /// Persists a result, replacing any earlier result with the same id.
    async fn save(&self, result: &ScanResult) -> Result<(), StoreError>;

    /// Loads a result by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no result has this id.
    async fn load(&self, id: &ScanId) -> Result<ScanResult, StoreError>;

    /// Deletes a result. Deleting a missing id is not an error.
    async fn delete(&self, id: &ScanId) -> Result<(), StoreError>;

    /// Lists results matching the filter, newest first.
    async fn list(&self, filter: ResultFilter) -> Result<Vec<ScanResult>, StoreError>;

    /// Returns the number of stored results.
    async fn count(&self) -> Result<usize, StoreError> {
        let results = self.list(ResultFilter::new()).await?;
        Ok(results.len())
    }
}
