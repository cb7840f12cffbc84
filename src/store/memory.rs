//! In-memory result storage.

use crate::core::{ScanId, ScanResult, StoreError};
use crate::store::record::{ResultFilter, StoredScan};
use crate::store::traits::ResultStore;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Result store backed by a map.
///
/// Results are held in their persisted record shape, so a round trip
/// through this store exercises the same conversion as a database would.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    scans: RwLock<HashMap<ScanId, StoredScan>>,
}

impl InMemoryResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn save(&self, result: &ScanResult) -> Result<(), StoreError> {
        let stored = StoredScan::from_result(result)?;
        self.scans.write().await.insert(result.id.clone(), stored);
        tracing::debug!(scan_id = %result.id, "Result stored in memory");
        Ok(())
    }

    async fn load(&self, id: &ScanId) -> Result<ScanResult, StoreError> {
        let stored = self
            .scans
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        stored.into_result()
    }

    async fn delete(&self, id: &ScanId) -> Result<(), StoreError> {
        self.scans.write().await.remove(id);
        Ok(())
    }

    async fn list(&self, filter: ResultFilter) -> Result<Vec<ScanResult>, StoreError> {
        let stored: Vec<(ScanId, StoredScan)> = self
            .scans
            .read()
            .await
            .iter()
            .map(|(id, scan)| (id.clone(), scan.clone()))
            .collect();

        let mut results = Vec::with_capacity(stored.len());
        for (id, scan) in stored {
            match scan.into_result() {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(scan_id = %id, error = %e, "Skipping unreadable record");
                }
            }
        }
        Ok(filter.apply(results))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.scans.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RiskBreakdown, ScanFindings, ScanRequest, TargetType};

    fn result(target_type: TargetType, risk: f64) -> ScanResult {
        ScanResult::assemble(
            &ScanRequest::new(target_type, "target"),
            ScanFindings::default(),
            risk,
            RiskBreakdown::from_probability(risk / 5.0),
            0.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = InMemoryResultStore::new();
        let result = result(TargetType::Url, 1.5);

        store.save(&result).await.unwrap();
        assert_eq!(store.load(&result.id).await.unwrap(), result);
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete(&result.id).await.unwrap();
        assert!(matches!(
            store.load(&result.id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store_list() {
        let store = InMemoryResultStore::new();
        for (i, target_type) in [TargetType::Url, TargetType::File, TargetType::Url]
            .into_iter()
            .enumerate()
        {
            store.save(&result(target_type, i as f64)).await.unwrap();
        }

        assert_eq!(store.list(ResultFilter::new()).await.unwrap().len(), 3);
        assert_eq!(
            store
                .list(ResultFilter::new().with_target_type(TargetType::Url))
                .await
                .unwrap()
                .len(),
            2
        );
        let risky = store
            .list(ResultFilter::new().with_min_risk(1.0).with_limit(1))
            .await
            .unwrap();
        assert_eq!(risky.len(), 1);
        assert!(risky[0].risk >= 1.0);
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_records() {
        let store = InMemoryResultStore::new();
        let good = result(TargetType::Url, 2.0);
        store.save(&good).await.unwrap();

        let mut broken = StoredScan::from_result(&result(TargetType::Url, 1.0)).unwrap();
        broken.record.ml_json = Some(r#"{"probability":null,"model_version":"v1"}"#.into());
        let broken_id = ScanId::from(broken.record.scan_id.as_str());
        store.scans.write().await.insert(broken_id.clone(), broken);

        assert!(store.load(&broken_id).await.is_err());
        let listed = store.list(ResultFilter::new()).await.unwrap();
        assert_eq!(listed, vec![good]);
    }
}
