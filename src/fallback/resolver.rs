//! Heals failed verdicts from the fallback matrix.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::core::normalize::NormalizedTarget;
use crate::core::types::{
    Provider, VendorVerdict, VerdictMap, VerdictStatus, DETAIL_FALLBACK_PROVIDER,
    DETAIL_FALLBACK_REASON,
};
use crate::fallback::matrix::fallback_candidates;

/// Something that can produce a fresh verdict for a given provider.
///
/// Implemented by the orchestrator's provider pool. Returns `None` when no
/// client is registered for `provider`; query failures come back as
/// `Error`/`Unknown` verdicts rather than `None`.
#[async_trait]
pub trait VerdictSource: Send + Sync {
    /// Queries `provider` for `target`.
    async fn fetch(&self, provider: Provider, target: &NormalizedTarget) -> Option<VendorVerdict>;
}

/// A record of one healed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// The provider whose entry was rewritten.
    pub provider: Provider,

    /// The provider whose verdict was used.
    pub substitute: Provider,

    /// Status of the entry before healing.
    pub original_status: VerdictStatus,

    /// Status taken from the substitute.
    pub status: VerdictStatus,

    /// Whether the substitute had to be queried during resolution.
    pub fetched: bool,
}

/// Applies the fallback matrix to a verdict map.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl FallbackResolver {
    /// Creates a resolver.
    pub fn new() -> Self {
        Self
    }

    /// Heals every `Error`/`Unknown` entry in `verdicts`.
    ///
    /// Entries are visited in provider order, as they stood before this
    /// call. Present candidates are preferred; missing ones are fetched from
    /// `source` at most once each. Fetched usable verdicts are inserted under
    /// their own key. No entry is ever removed.
    pub async fn resolve(
        &self,
        verdicts: &mut VerdictMap,
        target: &NormalizedTarget,
        source: &dyn VerdictSource,
    ) -> Vec<Substitution> {
        let failed: Vec<(Provider, VerdictStatus)> = verdicts
            .iter()
            .filter(|v| !v.is_usable())
            .map(|v| (v.provider, v.status))
            .collect();

        let mut attempted = BTreeSet::new();
        let mut substitutions = Vec::new();

        for (provider, original_status) in failed {
            let candidates = fallback_candidates(provider);
            if candidates.is_empty() {
                continue;
            }

            let (substitute, fetched) =
                if let Some(found) = Self::present_candidate(verdicts, candidates) {
                    (found, false)
                } else if let Some(found) =
                    Self::fetch_candidate(verdicts, candidates, &mut attempted, target, source).await
                {
                    (found, true)
                } else {
                    tracing::debug!(
                        provider = %provider,
                        status = %original_status,
                        "No usable fallback"
                    );
                    continue;
                };

            let Some(substitute_verdict) = verdicts.get(substitute).cloned() else {
                continue;
            };
            let Some(entry) = verdicts.get_mut(provider) else {
                continue;
            };

            let mut details = substitute_verdict.details.clone();
            details.extend(std::mem::take(&mut entry.details));
            details.insert(
                DETAIL_FALLBACK_PROVIDER.to_string(),
                Some(substitute.as_str().to_string()),
            );
            details.insert(
                DETAIL_FALLBACK_REASON.to_string(),
                Some(format!("{} returned {}", provider, original_status)),
            );

            entry.status = substitute_verdict.status;
            entry.score = substitute_verdict.score;
            entry.details = details;

            tracing::debug!(
                provider = %provider,
                substitute = %substitute,
                status = %substitute_verdict.status,
                fetched,
                "Applied fallback verdict"
            );

            substitutions.push(Substitution {
                provider,
                substitute,
                original_status,
                status: substitute_verdict.status,
                fetched,
            });
        }

        substitutions
    }

    fn present_candidate(verdicts: &VerdictMap, candidates: &[Provider]) -> Option<Provider> {
        candidates.iter().copied().find(|&candidate| {
            verdicts
                .get(candidate)
                .is_some_and(|v| v.is_usable() && !v.is_fallback())
        })
    }

    async fn fetch_candidate(
        verdicts: &mut VerdictMap,
        candidates: &[Provider],
        attempted: &mut BTreeSet<Provider>,
        target: &NormalizedTarget,
        source: &dyn VerdictSource,
    ) -> Option<Provider> {
        for &candidate in candidates {
            if verdicts.contains(candidate) || !attempted.insert(candidate) {
                continue;
            }

            let Some(mut verdict) = source.fetch(candidate, target).await else {
                continue;
            };
            if !verdict.is_usable() {
                continue;
            }

            verdict.provider = candidate;
            verdicts.insert(verdict);
            return Some(candidate);
        }
        None
    }
}
