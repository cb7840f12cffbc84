//! Filesystem-based result storage implementation.

use crate::core::{ScanId, ScanResult, StoreError};
use crate::store::record::{ResultFilter, StoredScan};
use crate::store::traits::ResultStore;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Filesystem-based result storage.
///
/// Each result is one JSON document holding its scan row and verdict rows.
/// Writes go to a temporary file first and are renamed into place, so a
/// reader never observes a half-written record.
///
/// # Directory Structure
///
/// ```text
/// results/
/// └── {scan_id}.json
/// ```
#[derive(Debug)]
pub struct FilesystemResultStore {
    /// Directory holding the records.
    base_path: PathBuf,
}

impl FilesystemResultStore {
    /// Opens a store at the given path.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| StoreError::WriteFailed {
            reason: format!("Failed to create result directory: {}", e),
        })?;

        Ok(Self { base_path })
    }

    /// Returns the directory holding the records.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the record path for a given id.
    ///
    /// Ids are used as file names, so only ASCII alphanumerics, `-` and `_`
    /// are accepted.
    fn record_path(&self, id: &ScanId) -> Result<PathBuf, StoreError> {
        let valid = !id.as_str().is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::invalid(format!(
                "scan id '{id}' is not a valid record name"
            )));
        }
        Ok(self.base_path.join(format!("{}.json", id.as_str())))
    }

    async fn read_record(path: &Path) -> Result<ScanResult, StoreError> {
        let content = tokio::fs::read(path).await?;
        let stored: StoredScan = serde_json::from_slice(&content)?;
        stored.into_result()
    }
}

#[async_trait]
impl ResultStore for FilesystemResultStore {
    async fn save(&self, result: &ScanResult) -> Result<(), StoreError> {
        let path = self.record_path(&result.id)?;
        let stored = StoredScan::from_result(result)?;
        let content = serde_json::to_vec_pretty(&stored)?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &content)
            .await
            .map_err(|e| StoreError::WriteFailed {
                reason: format!("Failed to write record: {}", e),
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::WriteFailed {
                reason: format!("Failed to move record into place: {}", e),
            })?;

        tracing::debug!(scan_id = %result.id, path = %path.display(), "Result stored");
        Ok(())
    }

    async fn load(&self, id: &ScanId) -> Result<ScanResult, StoreError> {
        let path = self.record_path(id)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Self::read_record(&path).await,
            Ok(false) => Err(StoreError::NotFound { id: id.to_string() }),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete(&self, id: &ScanId) -> Result<(), StoreError> {
        let path = self.record_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(scan_id = %id, "Result deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn list(&self, filter: ResultFilter) -> Result<Vec<ScanResult>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        let mut results = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                }
            }
        }

        Ok(filter.apply(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Provider, RiskBreakdown, ScanFindings, ScanRequest, TargetType, VendorVerdict,
    };
    use tempfile::TempDir;

    fn make_result(risk: f64) -> ScanResult {
        let findings = ScanFindings {
            vendors: [
                VendorVerdict::malicious(Provider::UrlHaus, 0.9),
                VendorVerdict::error(Provider::UrlScan, "HTTP 503"),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        ScanResult::assemble(
            &ScanRequest::url("https://example.com/"),
            findings,
            risk,
            RiskBreakdown::from_probability(risk / 5.0),
            0.5,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_filesystem_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilesystemResultStore::new(temp_dir.path()).unwrap();
        let result = make_result(3.2);

        store.save(&result).await.unwrap();
        assert_eq!(store.load(&result.id).await.unwrap(), result);
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete(&result.id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(matches!(
            store.load(&result.id).await,
            Err(StoreError::NotFound { .. })
        ));
        // deleting twice is fine
        store.delete(&result.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let result = make_result(1.0);
        {
            let store = FilesystemResultStore::new(temp_dir.path()).unwrap();
            store.save(&result).await.unwrap();
        }

        let reopened = FilesystemResultStore::new(temp_dir.path()).unwrap();
        assert_eq!(reopened.load(&result.id).await.unwrap(), result);
    }

    #[tokio::test]
    async fn test_filesystem_store_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilesystemResultStore::new(temp_dir.path()).unwrap();

        for i in 0..5 {
            store.save(&make_result(i as f64)).await.unwrap();
        }
        std::fs::write(temp_dir.path().join("garbage.json"), b"not json").unwrap();

        let all = store.list(ResultFilter::new()).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let filtered = store
            .list(ResultFilter::new().with_min_risk(3.0))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);

        let none = store
            .list(ResultFilter::new().with_target_type(TargetType::File))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_path_like_ids_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilesystemResultStore::new(temp_dir.path()).unwrap();

        let err = store.load(&ScanId::from("../etc/passwd")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));
    }
}
