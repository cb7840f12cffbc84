//! URL scan example streaming progress events.
//!
//! This example shows how to:
//! - Load provider credentials from the environment
//! - Build a ScanOrchestrator with providers and analyzers
//! - Follow a scan through its event stream
//!
//! Run with: cargo run --example url_scan -- <url>
//! With a real VirusTotal key: SCANFUSE_VIRUS_TOTAL_API_KEY=... cargo run --features virustotal --example url_scan -- <url>

use futures::StreamExt;
use scanfuse::prelude::*;
use scanfuse::providers::{
    LocalHeuristicProvider, MockMlAnalyzer, MockNetworkAnalyzer, MockProvider, ProviderCredentials,
    VirusTotalClient, VirusTotalConfig,
};
use scanfuse::store::InMemoryResultStore;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://secure-login.example.xyz/verify".to_string());

    println!("=== Scanfuse URL Scan Example ===\n");

    let mut credentials = ProviderCredentials::from_env();
    let mut builder = ScanOrchestrator::builder();

    // Use the real VirusTotal client when it is available, a mock otherwise
    match VirusTotalClient::new(VirusTotalConfig::from_credentials(&mut credentials)) {
        Ok(client) if client.is_configured() => {
            println!("Using VirusTotal API");
            builder = builder.add_provider(client);
        }
        _ => {
            println!("Using a mock VirusTotal provider");
            builder = builder.add_provider(
                MockProvider::new(Provider::VirusTotal)
                    .with_verdict(VerdictStatus::Suspicious, 0.35)
                    .with_latency(Duration::from_millis(150)),
            );
        }
    }

    let orchestrator = Arc::new(
        builder
            .add_provider(
                MockProvider::new(Provider::GoogleSafeBrowsing)
                    .with_verdict(VerdictStatus::Malicious, 0.8)
                    .with_latency(Duration::from_millis(80)),
            )
            .add_provider(MockProvider::new(Provider::PhishTank).without_credentials())
            .add_fallback_provider(LocalHeuristicProvider::new())
            .with_network_analyzer(MockNetworkAnalyzer::insecure())
            .with_ml_analyzer(MockMlAnalyzer::new(0.62))
            .with_store(InMemoryResultStore::new())
            .build()?,
    );

    println!("Scanning: {target}\n");

    let mut events = orchestrator.analyze(ScanRequest::url(target));
    while let Some(event) = events.next().await {
        match event {
            ScanEvent::Progress { stage, message } => {
                println!("[{stage}] {message}");
            }
            ScanEvent::Success(result) => {
                println!("\n=== Scan Results ===");
                println!("Scan ID: {}", result.id);
                println!("Risk: {:.2} / 5 ({})", result.risk, result.category());
                println!("Confidence: {:.0}%", result.confidence * 100.0);

                println!("\nVendors:");
                for verdict in result.vendors.iter() {
                    let via = verdict
                        .is_fallback()
                        .then(|| format!(" (via {})", verdict.signal_source()))
                        .unwrap_or_default();
                    println!(
                        "  {:<22} {:<10} {:.2}{}",
                        verdict.provider.as_str(),
                        verdict.status.as_str(),
                        verdict.score,
                        via
                    );
                }

                println!("\nBreakdown:");
                for (category, degree) in result.breakdown.iter() {
                    println!("  {:<9} {:.2}", category.to_string(), degree);
                }
            }
            ScanEvent::Failure(e) => {
                println!("\nScan failed: {e}");
            }
        }
    }

    Ok(())
}
