//! Persisted record shapes and listing filters.
//!
//! A `ScanResult` is stored as one `ScanRecord` row plus one `VerdictRecord`
//! row per provider, keyed by `(scan_id, provider)`. Reports and maps are
//! kept as JSON blobs. Conversion in both directions is lossless and
//! validated.

use crate::core::{
    MlReport, NetworkReport, Provider, RiskBreakdown, ScanId, ScanResult, SpecializedReport,
    StoreError, TargetType, VendorVerdict, VerdictMap, VerdictStatus, MAX_RISK,
};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The scan-level row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Scan id.
    pub scan_id: String,
    /// Target type.
    pub target_type: TargetType,
    /// Target as supplied by the caller.
    pub target_label: String,
    /// Normalized target.
    pub normalized_target: Option<String>,
    /// Request metadata as a JSON object.
    pub metadata_json: String,
    /// Final risk, checked to lie in `[0, 5]`.
    pub risk_score: f64,
    /// Fraction of decisive providers.
    pub confidence: f64,
    /// Fuzzy breakdown as a JSON object.
    pub breakdown_json: String,
    /// Network report blob.
    pub network_json: Option<String>,
    /// ML report blob.
    pub ml_json: Option<String>,
    /// File report blob.
    pub file_json: Option<String>,
    /// VPN profile report blob.
    pub vpn_json: Option<String>,
    /// Social handle report blob.
    pub social_json: Option<String>,
    /// Creation time in Unix milliseconds.
    pub created_at_millis: i64,
}

/// One provider's row, keyed by `(scan_id, provider)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    /// Owning scan id.
    pub scan_id: String,
    /// Provider key.
    pub provider: Provider,
    /// Verdict status.
    pub status: VerdictStatus,
    /// Verdict score.
    pub score: f64,
    /// Details as a JSON object.
    pub details_json: String,
}

/// A scan row together with its verdict rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScan {
    /// The scan row.
    pub record: ScanRecord,
    /// Verdict rows, in provider order.
    pub verdicts: Vec<VerdictRecord>,
}

fn check_risk(risk: f64) -> Result<(), StoreError> {
    if risk.is_finite() && (0.0..=MAX_RISK).contains(&risk) {
        Ok(())
    } else {
        Err(StoreError::invalid(format!(
            "risk score {risk} outside [0, {MAX_RISK}]"
        )))
    }
}

fn to_blob<T: Serialize>(value: &Option<T>) -> Result<Option<String>, StoreError> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

fn from_blob<T: DeserializeOwned>(blob: Option<&str>) -> Result<Option<T>, StoreError> {
    blob.map(serde_json::from_str).transpose().map_err(StoreError::from)
}

impl StoredScan {
    /// Flattens a result into rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRecord` if the risk is out of range, or a
    /// serialization error for an unserializable blob.
    pub fn from_result(result: &ScanResult) -> Result<Self, StoreError> {
        check_risk(result.risk)?;

        let (file, vpn, social) = match &result.specialized {
            Some(SpecializedReport::File(r)) => (Some(r), None, None),
            Some(SpecializedReport::VpnConfig(r)) => (None, Some(r), None),
            Some(SpecializedReport::SocialHandle(r)) => (None, None, Some(r)),
            None => (None, None, None),
        };

        let record = ScanRecord {
            scan_id: result.id.to_string(),
            target_type: result.target_type,
            target_label: result.target_label.clone(),
            normalized_target: result.normalized_target.clone(),
            metadata_json: serde_json::to_string(&result.metadata)?,
            risk_score: result.risk,
            confidence: result.confidence,
            breakdown_json: serde_json::to_string(&result.breakdown)?,
            network_json: to_blob(&result.network)?,
            ml_json: to_blob(&result.ml)?,
            file_json: to_blob(&file)?,
            vpn_json: to_blob(&vpn)?,
            social_json: to_blob(&social)?,
            created_at_millis: result.created_at.timestamp_millis(),
        };

        let verdicts = result
            .vendors
            .iter()
            .map(|v| {
                Ok(VerdictRecord {
                    scan_id: record.scan_id.clone(),
                    provider: v.provider,
                    status: v.status,
                    score: v.score,
                    details_json: serde_json::to_string(&v.details)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Self { record, verdicts })
    }

    /// Rebuilds the result.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRecord` if the risk is out of range, more
    /// than one specialized blob is set, a verdict row belongs to another
    /// scan, a provider appears twice, or the timestamp is out of range.
    pub fn into_result(self) -> Result<ScanResult, StoreError> {
        let record = self.record;
        check_risk(record.risk_score)?;

        let specialized_blobs = [&record.file_json, &record.vpn_json, &record.social_json]
            .iter()
            .filter(|b| b.is_some())
            .count();
        if specialized_blobs > 1 {
            return Err(StoreError::invalid("more than one specialized report"));
        }

        let specialized = if let Some(r) = from_blob(record.file_json.as_deref())? {
            Some(SpecializedReport::File(r))
        } else if let Some(r) = from_blob(record.vpn_json.as_deref())? {
            Some(SpecializedReport::VpnConfig(r))
        } else {
            from_blob(record.social_json.as_deref())?.map(SpecializedReport::SocialHandle)
        };

        let mut seen = BTreeSet::new();
        let mut vendors = VerdictMap::new();
        for row in self.verdicts {
            if row.scan_id != record.scan_id {
                return Err(StoreError::invalid(format!(
                    "verdict row for scan '{}' attached to scan '{}'",
                    row.scan_id, record.scan_id
                )));
            }
            if !seen.insert(row.provider) {
                return Err(StoreError::invalid(format!(
                    "duplicate verdict row for provider '{}'",
                    row.provider
                )));
            }
            let details: BTreeMap<String, Option<String>> = serde_json::from_str(&row.details_json)?;
            vendors.insert(VendorVerdict {
                provider: row.provider,
                status: row.status,
                score: row.score,
                details,
            });
        }

        let created_at = DateTime::<Utc>::from_timestamp_millis(record.created_at_millis)
            .ok_or_else(|| {
                StoreError::invalid(format!("timestamp {} out of range", record.created_at_millis))
            })?;

        let network: Option<NetworkReport> = from_blob(record.network_json.as_deref())?;
        let ml: Option<MlReport> = from_blob(record.ml_json.as_deref())?;
        let breakdown: RiskBreakdown = serde_json::from_str(&record.breakdown_json)?;

        Ok(ScanResult {
            id: ScanId::from(record.scan_id),
            target_type: record.target_type,
            target_label: record.target_label,
            normalized_target: record.normalized_target,
            metadata: serde_json::from_str(&record.metadata_json)?,
            vendors,
            network,
            ml,
            specialized,
            risk: record.risk_score,
            breakdown,
            confidence: record.confidence,
            created_at,
        })
    }
}

/// Filter for listing stored results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultFilter {
    /// Filter by target type.
    pub target_type: Option<TargetType>,

    /// Minimum risk, inclusive.
    pub min_risk: Option<f64>,

    /// Filter by minimum creation date.
    pub created_after: Option<DateTime<Utc>>,

    /// Maximum number of results to return.
    pub limit: Option<usize>,
}

impl ResultFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by target type.
    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    /// Keeps results with at least this risk.
    pub fn with_min_risk(mut self, risk: f64) -> Self {
        self.min_risk = Some(risk);
        self
    }

    /// Keeps results created at or after `after`.
    pub fn with_created_after(mut self, after: DateTime<Utc>) -> Self {
        self.created_after = Some(after);
        self
    }

    /// Caps the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks if a result matches this filter.
    pub fn matches(&self, result: &ScanResult) -> bool {
        if let Some(target_type) = self.target_type {
            if result.target_type != target_type {
                return false;
            }
        }

        if let Some(min) = self.min_risk {
            if result.risk < min {
                return false;
            }
        }

        if let Some(after) = self.created_after {
            if result.created_at < after {
                return false;
            }
        }

        true
    }

    /// Filters, orders newest first and truncates.
    pub(crate) fn apply(&self, results: impl IntoIterator<Item = ScanResult>) -> Vec<ScanResult> {
        let mut results: Vec<_> = results.into_iter().filter(|r| self.matches(r)).collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
        results
    }
}
