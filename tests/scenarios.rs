//! End-to-end scans through the public API.

use futures::StreamExt;
use scanfuse::core::{DETAIL_FALLBACK_PROVIDER, DETAIL_FALLBACK_REASON, DETAIL_REASON};
use scanfuse::prelude::*;
use scanfuse::providers::mock::MockFailure;
use scanfuse::providers::{LocalHeuristicProvider, MockMlAnalyzer, MockNetworkAnalyzer, MockProvider};
use scanfuse::store::InMemoryResultStore;
use std::sync::Arc;

fn clean(provider: Provider) -> MockProvider {
    MockProvider::new(provider).with_verdict(VerdictStatus::Clean, 0.0)
}

#[tokio::test]
async fn all_clean_without_ml_stays_minimal() {
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(clean(Provider::VirusTotal).with_verdict(VerdictStatus::Clean, 0.2))
        .add_provider(clean(Provider::GoogleSafeBrowsing).with_verdict(VerdictStatus::Clean, 0.2))
        .add_provider(clean(Provider::UrlScan).with_verdict(VerdictStatus::Clean, 0.2))
        .add_provider(clean(Provider::PhishTank).with_verdict(VerdictStatus::Clean, 0.2))
        .with_store(InMemoryResultStore::new())
        .build()
        .unwrap();

    let result = orchestrator.scan(ScanRequest::url("example.com")).await.unwrap();

    // raw vendor score is 0.08
    assert!(result.probability() < 0.04);
    assert_eq!(result.category(), RiskCategory::Minimal);
    assert_eq!(result.confidence, 1.0);
}

#[tokio::test]
async fn two_malicious_vendors_reach_three() {
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(MockProvider::new(Provider::VirusTotal).with_verdict(VerdictStatus::Malicious, 0.9))
        .add_provider(
            MockProvider::new(Provider::GoogleSafeBrowsing).with_verdict(VerdictStatus::Malicious, 0.9),
        )
        .add_provider(clean(Provider::UrlScan))
        .add_provider(clean(Provider::PhishTank))
        .add_provider(clean(Provider::OpenPhish))
        .with_store(InMemoryResultStore::new())
        .build()
        .unwrap();

    let result = orchestrator
        .scan(ScanRequest::url("http://bad.example/payload"))
        .await
        .unwrap();

    assert!(result.risk >= 3.0, "risk = {}", result.risk);
    assert_eq!(result.vendors.count(VerdictStatus::Malicious), 2);
}

#[tokio::test]
async fn insecure_transport_floors_the_risk() {
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(clean(Provider::VirusTotal))
        .add_provider(clean(Provider::GoogleSafeBrowsing))
        .add_provider(clean(Provider::UrlScan))
        .add_provider(clean(Provider::PhishTank))
        .with_network_analyzer(MockNetworkAnalyzer::insecure())
        .with_store(InMemoryResultStore::new())
        .build()
        .unwrap();

    let result = orchestrator.scan(ScanRequest::url("http://example.com")).await.unwrap();

    assert!((result.probability() - 0.72).abs() < 1e-9);
    assert!(result.risk >= 3.5);
    assert!(result.network.is_some());
}

#[tokio::test]
async fn failed_primary_is_healed_from_present_candidate() {
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(MockProvider::new(Provider::VirusTotal).failing(MockFailure::Permanent))
        .add_provider(
            MockProvider::new(Provider::GoogleSafeBrowsing).with_verdict(VerdictStatus::Suspicious, 0.5),
        )
        .add_fallback_provider(LocalHeuristicProvider::new())
        .with_store(InMemoryResultStore::new())
        .build()
        .unwrap();

    let result = orchestrator.scan(ScanRequest::url("example.com")).await.unwrap();

    let healed = result.vendors.get(Provider::VirusTotal).unwrap();
    assert_eq!(healed.status, VerdictStatus::Suspicious);
    assert_eq!(healed.score, 0.5);
    assert_eq!(healed.detail(DETAIL_FALLBACK_PROVIDER), Some("google_safe_browsing"));
    assert_eq!(
        healed.detail(DETAIL_FALLBACK_REASON),
        Some("virus_total returned error")
    );

    let substitute = result.vendors.get(Provider::GoogleSafeBrowsing).unwrap();
    assert_eq!(substitute.status, VerdictStatus::Suspicious);
    assert!(!substitute.is_fallback());
    // a present candidate wins; the heuristic is never fetched
    assert!(!result.vendors.contains(Provider::LocalHeuristic));
}

#[tokio::test]
async fn unconfigured_provider_is_unknown_and_never_called() {
    let phish_tank = Arc::new(MockProvider::new(Provider::PhishTank).without_credentials());
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(clean(Provider::VirusTotal))
        .add_arc_provider(phish_tank.clone())
        .with_store(InMemoryResultStore::new())
        .build()
        .unwrap();

    let result = orchestrator.scan(ScanRequest::url("example.com")).await.unwrap();

    let verdict = result.vendors.get(Provider::PhishTank).unwrap();
    assert_eq!(verdict.status, VerdictStatus::Unknown);
    assert!(verdict.detail(DETAIL_REASON).is_some());
    assert_eq!(phish_tank.call_count(), 0);
    assert!(result.confidence < 1.0);
}

#[tokio::test]
async fn stream_reports_stages_in_order_then_one_result() {
    let store = Arc::new(InMemoryResultStore::new());
    let orchestrator = Arc::new(
        ScanOrchestrator::builder()
            .add_provider(clean(Provider::VirusTotal))
            .with_network_analyzer(MockNetworkAnalyzer::hardened())
            .with_ml_analyzer(MockMlAnalyzer::new(0.05))
            .with_arc_store(store.clone())
            .build()
            .unwrap(),
    );

    let events: Vec<ScanEvent> = orchestrator
        .analyze(ScanRequest::url("https://www.example.com"))
        .collect()
        .await;

    let stages: Vec<ScanStage> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert!(stages.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(stages.first(), Some(&ScanStage::Initializing));
    assert_eq!(stages.last(), Some(&ScanStage::Completed));

    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    let Some(ScanEvent::Success(result)) = events.last() else {
        panic!("expected a success event, got {:?}", events.last());
    };
    assert!(result.ml.is_some());
    assert_eq!(store.load(&result.id).await.unwrap(), **result);
}

#[tokio::test]
async fn non_finite_ml_probability_is_stored_and_loads_back() {
    let store = Arc::new(InMemoryResultStore::new());
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(clean(Provider::VirusTotal))
        .with_ml_analyzer(MockMlAnalyzer::new(f64::NAN))
        .with_arc_store(store.clone())
        .build()
        .unwrap();

    let result = orchestrator.scan(ScanRequest::url("example.com")).await.unwrap();
    assert_eq!(result.ml.as_ref().map(|ml| ml.probability), Some(0.0));

    let loaded = store.load(&result.id).await.unwrap();
    assert_eq!(loaded, result);
    assert_eq!(store.list(ResultFilter::new()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn one_fetched_fallback_heals_two_failed_primaries() {
    let heuristic = Arc::new(
        MockProvider::new(Provider::LocalHeuristic).with_verdict(VerdictStatus::Suspicious, 0.4),
    );
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(MockProvider::new(Provider::VirusTotal).failing(MockFailure::Permanent))
        .add_provider(MockProvider::new(Provider::UrlScan).failing(MockFailure::Permanent))
        .add_arc_fallback_provider(heuristic.clone())
        .with_store(InMemoryResultStore::new())
        .build()
        .unwrap();

    let result = orchestrator.scan(ScanRequest::url("example.com")).await.unwrap();

    assert_eq!(heuristic.call_count(), 1);
    for provider in [Provider::VirusTotal, Provider::UrlScan] {
        let healed = result.vendors.get(provider).unwrap();
        assert_eq!(healed.status, VerdictStatus::Suspicious);
        assert_eq!(healed.detail(DETAIL_FALLBACK_PROVIDER), Some("local_heuristic"));
    }
    assert!(!result.vendors.get(Provider::LocalHeuristic).unwrap().is_fallback());
}
