//! Fallback healing example.
//!
//! This example shows how to:
//! - Register fallback-only providers
//! - Watch failed providers get healed from the fallback matrix
//! - Read the fallback details on a healed verdict
//!
//! Run with: cargo run --example fallback_healing

use scanfuse::core::{DETAIL_FALLBACK_PROVIDER, DETAIL_FALLBACK_REASON};
use scanfuse::fallback::fallback_candidates;
use scanfuse::prelude::*;
use scanfuse::providers::mock::MockFailure;
use scanfuse::providers::{LocalHeuristicProvider, MockProvider};
use scanfuse::store::InMemoryResultStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Scanfuse Fallback Healing Example ===\n");

    for provider in [Provider::VirusTotal, Provider::UrlScan, Provider::UrlHaus] {
        let candidates: Vec<&str> = fallback_candidates(provider)
            .iter()
            .map(|p| p.as_str())
            .collect();
        println!("{:<12} -> {}", provider.as_str(), candidates.join(", "));
    }

    // VirusTotal is down, UrlScan rejects our request, UrlHaus has no key
    let orchestrator = ScanOrchestrator::builder()
        .add_provider(MockProvider::new(Provider::VirusTotal).failing(MockFailure::Transient))
        .add_provider(MockProvider::new(Provider::UrlScan).failing(MockFailure::Permanent))
        .add_provider(MockProvider::new(Provider::UrlHaus).without_credentials())
        .add_provider(
            MockProvider::new(Provider::GoogleSafeBrowsing).with_verdict(VerdictStatus::Suspicious, 0.55),
        )
        .add_fallback_provider(LocalHeuristicProvider::new())
        .add_fallback_provider(
            MockProvider::new(Provider::AlienVaultOtx).with_verdict(VerdictStatus::Malicious, 0.85),
        )
        .with_store(InMemoryResultStore::new())
        .build()?;

    let result = orchestrator
        .scan(ScanRequest::url("http://203.0.113.7/wallet/confirm"))
        .await?;

    println!("\n=== Final Verdicts ===");
    for verdict in result.vendors.iter() {
        println!(
            "{:<22} {:<10} {:.2}",
            verdict.provider.as_str(),
            verdict.status.as_str(),
            verdict.score
        );
        if let Some(source) = verdict.detail(DETAIL_FALLBACK_PROVIDER) {
            println!(
                "    healed from {source}: {}",
                verdict.detail(DETAIL_FALLBACK_REASON).unwrap_or_default()
            );
        }
    }

    println!("\nRisk: {:.2} / 5 ({})", result.risk, result.category());
    Ok(())
}
