//! The scan orchestrator implementation.

use crate::audit;
use crate::core::{
    ArcMlAnalyzer, ArcNetworkAnalyzer, ArcProvider, ArcSpecializedAnalyzer, DefaultNormalizer,
    MlAnalyzer, MlReport, NetworkAnalyzer, NetworkReport, NormalizedTarget, Normalizer,
    Provider, ProviderClient, ProviderError, ScanError, ScanFindings, ScanId, ScanRequest, ScanResult,
    SpecializedAnalyzer, SpecializedReport, TargetType, VendorVerdict, VerdictMap,
};
use crate::fallback::FallbackResolver;
use crate::orchestrator::events::{EventSink, ScanEventStream, ScanStage};
use crate::orchestrator::pool::ProviderPool;
use crate::orchestrator::retry::{retry_async, RetryConfig};
use crate::scoring::{score_specialized, score_url, RiskAssessment};
use crate::store::ResultStore;

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

/// Events buffered between the scan task and the stream consumer.
const EVENT_BUFFER: usize = 16;

/// Configuration for the scan orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Timeout for a single provider attempt.
    pub provider_timeout: Duration,

    /// Timeout for a single analyzer attempt.
    pub analyzer_timeout: Duration,

    /// Retry schedule for transient analyzer failures.
    pub analyzer_retry: RetryConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(20),
            analyzer_timeout: Duration::from_secs(30),
            analyzer_retry: RetryConfig::no_retry(),
        }
    }
}

impl OrchestratorConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-attempt provider timeout.
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Sets the per-attempt analyzer timeout.
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.analyzer_timeout = timeout;
        self
    }

    /// Sets the analyzer retry schedule.
    pub fn with_analyzer_retry(mut self, retry: RetryConfig) -> Self {
        self.analyzer_retry = retry;
        self
    }
}

/// Builder for creating a `ScanOrchestrator`.
pub struct ScanOrchestratorBuilder {
    providers: Vec<ArcProvider>,
    fallback_providers: Vec<ArcProvider>,
    network: Option<ArcNetworkAnalyzer>,
    ml: Option<ArcMlAnalyzer>,
    specialized: Vec<ArcSpecializedAnalyzer>,
    normalizer: Arc<dyn Normalizer>,
    store: Option<Arc<dyn ResultStore>>,
    config: OrchestratorConfig,
}

impl ScanOrchestratorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            fallback_providers: Vec::new(),
            network: None,
            ml: None,
            specialized: Vec::new(),
            normalizer: Arc::new(DefaultNormalizer::new()),
            store: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Adds a primary provider, queried on every URL scan.
    pub fn add_provider<P: ProviderClient + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Adds a primary provider wrapped in an Arc.
    pub fn add_arc_provider(mut self, provider: ArcProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Adds a provider that is only queried to heal a failed verdict.
    pub fn add_fallback_provider<P: ProviderClient + 'static>(mut self, provider: P) -> Self {
        self.fallback_providers.push(Arc::new(provider));
        self
    }

    /// Adds a fallback-only provider wrapped in an Arc.
    pub fn add_arc_fallback_provider(mut self, provider: ArcProvider) -> Self {
        self.fallback_providers.push(provider);
        self
    }

    /// Sets the network posture analyzer.
    pub fn with_network_analyzer<A: NetworkAnalyzer + 'static>(mut self, analyzer: A) -> Self {
        self.network = Some(Arc::new(analyzer));
        self
    }

    /// Sets the ML analyzer.
    pub fn with_ml_analyzer<A: MlAnalyzer + 'static>(mut self, analyzer: A) -> Self {
        self.ml = Some(Arc::new(analyzer));
        self
    }

    /// Registers the analyzer for one non-URL target type.
    pub fn add_specialized_analyzer<A: SpecializedAnalyzer + 'static>(mut self, analyzer: A) -> Self {
        self.specialized.push(Arc::new(analyzer));
        self
    }

    /// Registers a specialized analyzer wrapped in an Arc.
    pub fn add_arc_specialized_analyzer(mut self, analyzer: ArcSpecializedAnalyzer) -> Self {
        self.specialized.push(analyzer);
        self
    }

    /// Replaces the default normalizer.
    pub fn with_normalizer<N: Normalizer + 'static>(mut self, normalizer: N) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// Sets the result store.
    pub fn with_store<S: ResultStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Sets a result store wrapped in an Arc.
    pub fn with_arc_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Configuration` if no store is set, if there is
    /// nothing to scan with, or if a provider or target type is registered
    /// twice.
    pub fn build(self) -> Result<ScanOrchestrator, ScanError> {
        let store = self
            .store
            .ok_or_else(|| ScanError::configuration("A result store is required"))?;

        if self.providers.is_empty() && self.specialized.is_empty() {
            return Err(ScanError::configuration(
                "At least one provider or specialized analyzer is required",
            ));
        }

        let mut seen = BTreeSet::new();
        for client in self.providers.iter().chain(self.fallback_providers.iter()) {
            if !seen.insert(client.provider()) {
                return Err(ScanError::configuration(format!(
                    "Provider '{}' registered twice",
                    client.provider()
                )));
            }
        }

        let mut types = BTreeSet::new();
        for analyzer in &self.specialized {
            let target_type = analyzer.target_type();
            if target_type == TargetType::Url {
                return Err(ScanError::configuration(
                    "URL scans use providers, not a specialized analyzer",
                ));
            }
            if !types.insert(target_type) {
                return Err(ScanError::configuration(format!(
                    "Two analyzers registered for {target_type} targets"
                )));
            }
        }

        Ok(ScanOrchestrator {
            pool: ProviderPool::new(
                self.providers,
                self.fallback_providers,
                self.config.provider_timeout,
            ),
            network: self.network,
            ml: self.ml,
            specialized: self.specialized,
            normalizer: self.normalizer,
            store,
            resolver: FallbackResolver::new(),
            config: self.config,
        })
    }
}

impl Default for ScanOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives scans end to end: normalize, query, heal, score, persist.
///
/// One orchestrator serves any number of concurrent scans; every scan owns
/// its verdict map and reports.
pub struct ScanOrchestrator {
    pool: ProviderPool,
    network: Option<ArcNetworkAnalyzer>,
    ml: Option<ArcMlAnalyzer>,
    specialized: Vec<ArcSpecializedAnalyzer>,
    normalizer: Arc<dyn Normalizer>,
    store: Arc<dyn ResultStore>,
    resolver: FallbackResolver,
    config: OrchestratorConfig,
}

impl ScanOrchestrator {
    /// Creates a new builder.
    pub fn builder() -> ScanOrchestratorBuilder {
        ScanOrchestratorBuilder::new()
    }

    /// Starts a scan and returns its event stream.
    ///
    /// The stream yields progress events in stage order and ends with
    /// exactly one `Success` or `Failure`, unless it is cancelled.
    pub fn analyze(self: &Arc<Self>, request: ScanRequest) -> ScanEventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let orchestrator = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut sink = EventSink::channel(tx);
            match orchestrator.execute(&request, &mut sink).await {
                Ok(result) => {
                    if sink.succeed(result).await.is_err() {
                        tracing::debug!("Scan stream dropped before completion");
                    }
                }
                Err(e) if e.is_cancellation() => {
                    tracing::debug!(target_type = %request.target_type, "Scan cancelled");
                }
                Err(e) => {
                    let _ = sink.fail(e).await;
                }
            }
        });

        ScanEventStream::new(rx, task)
    }

    /// Runs a scan to completion without progress events.
    ///
    /// # Errors
    ///
    /// Returns the pipeline failure. Provider failures never surface here.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResult, ScanError> {
        let mut sink = EventSink::silent();
        self.execute(&request, &mut sink).await
    }

    /// Returns the number of registered provider clients.
    pub fn provider_count(&self) -> usize {
        self.pool.len()
    }

    /// Returns the result store.
    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    async fn execute(
        &self,
        request: &ScanRequest,
        sink: &mut EventSink,
    ) -> Result<ScanResult, ScanError> {
        let scan_id = ScanId::new();
        audit::emit_scan_started(&scan_id, request);

        match self.run(scan_id.clone(), request, sink).await {
            Ok(result) => Ok(result),
            Err(e) => {
                if !e.is_cancellation() {
                    tracing::warn!(scan_id = %scan_id, error = %e, "Scan failed");
                    audit::emit_scan_failed(&scan_id, request, &e);
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        scan_id: ScanId,
        request: &ScanRequest,
        sink: &mut EventSink,
    ) -> Result<ScanResult, ScanError> {
        sink.progress(
            ScanStage::Initializing,
            format!("Starting {} scan", request.target_type),
        )
        .await?;

        let target = self.normalizer.normalize(request)?;
        sink.progress(ScanStage::Normalizing, format!("Target {}", target.as_str()))
            .await?;

        let mut findings = ScanFindings {
            id: scan_id.clone(),
            normalized_target: Some(target.as_str().to_string()),
            ..Default::default()
        };

        let assessment = match request.target_type {
            TargetType::Url => self.run_url(&target, &mut findings, sink).await?,
            _ => {
                self.run_specialized(request, &target, &mut findings, sink)
                    .await?
            }
        };

        for verdict in findings.vendors.iter() {
            audit::emit_provider_verdict(&scan_id, verdict);
        }

        sink.progress(
            ScanStage::Aggregating,
            format!(
                "Risk {:.2} from {} verdicts",
                assessment.risk,
                findings.vendors.len()
            ),
        )
        .await?;

        let confidence = assessment.confidence();
        let result = ScanResult::assemble(
            request,
            findings,
            assessment.risk,
            assessment.breakdown,
            confidence,
        )?;

        self.store.save(&result).await?;
        audit::emit_scan_completed(&result);

        sink.progress(ScanStage::Completed, "Result saved").await?;
        Ok(result)
    }

    async fn run_url(
        &self,
        target: &NormalizedTarget,
        findings: &mut ScanFindings,
        sink: &mut EventSink,
    ) -> Result<RiskAssessment, ScanError> {
        let network_task = self.network.clone().map(|analyzer| {
            let target = target.clone();
            self.spawn_analysis(Provider::NetworkAnalyzer, move || {
                let analyzer = Arc::clone(&analyzer);
                let target = target.clone();
                async move { analyzer.analyze(&target).await }
            })
        });
        let ml_task = self.ml.clone().map(|analyzer| {
            let target = target.clone();
            self.spawn_analysis(Provider::MlModel, move || {
                let analyzer = Arc::clone(&analyzer);
                let target = target.clone();
                async move { analyzer.predict(&target).await }
            })
        });

        sink.progress(
            ScanStage::FetchingIntel,
            format!("Querying {} providers", self.pool.primaries_for(target)),
        )
        .await?;
        let mut vendors = self.pool.query_primaries(target).await;

        sink.progress(ScanStage::AnalyzingNetwork, "Checking transport security")
            .await?;
        let network: Option<NetworkReport> = join_analysis("network", network_task).await?;

        sink.progress(ScanStage::RunningMl, "Running URL classifier").await?;
        let ml: Option<MlReport> = join_analysis("ml", ml_task).await?;

        self.heal(&findings.id, &mut vendors, target).await;

        let assessment = score_url(&vendors, ml.as_ref(), network.as_ref());
        findings.vendors = vendors;
        findings.network = network;
        findings.ml = ml;
        Ok(assessment)
    }

    async fn run_specialized(
        &self,
        request: &ScanRequest,
        target: &NormalizedTarget,
        findings: &mut ScanFindings,
        sink: &mut EventSink,
    ) -> Result<RiskAssessment, ScanError> {
        let analyzer = self
            .specialized
            .iter()
            .find(|a| a.target_type() == request.target_type)
            .ok_or_else(|| {
                ScanError::configuration(format!(
                    "No analyzer registered for {} targets",
                    request.target_type
                ))
            })?;

        let stage = ScanStage::analyzing(request.target_type)
            .ok_or_else(|| ScanError::internal("URL scan routed to a specialized analyzer"))?;
        sink.progress(stage, format!("Analyzing {}", request.target_type))
            .await?;

        let provider = request
            .target_type
            .specialized_provider()
            .ok_or_else(|| ScanError::internal("no analyzer provider for target type"))?;
        let outcome = analyzer_call(
            provider,
            self.config.analyzer_timeout,
            &self.config.analyzer_retry,
            || analyzer.analyze(request, target),
        )
        .await;

        let mut vendors = VerdictMap::new();
        let report: Option<SpecializedReport> = match outcome {
            Ok(report) => {
                vendors.insert(report.verdict());
                Some(report)
            }
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Specialized analyzer failed");
                vendors.insert(VendorVerdict::error(provider, e.to_string()));
                None
            }
        };

        self.heal(&findings.id, &mut vendors, target).await;

        let assessment = score_specialized(&vendors, report.as_ref());
        findings.vendors = vendors;
        findings.specialized = report;
        Ok(assessment)
    }

    async fn heal(&self, scan_id: &ScanId, vendors: &mut VerdictMap, target: &NormalizedTarget) {
        let substitutions = self.resolver.resolve(vendors, target, &self.pool).await;
        for substitution in &substitutions {
            audit::emit_fallback_applied(scan_id, substitution);
        }
    }

    fn spawn_analysis<F, Fut, T>(
        &self,
        provider: Provider,
        operation: F,
    ) -> AbortOnDrop<Result<T, ProviderError>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ProviderError>> + Send + 'static,
        T: Send + 'static,
    {
        let timeout = self.config.analyzer_timeout;
        let retry = self.config.analyzer_retry.clone();
        AbortOnDrop(tokio::spawn(async move {
            analyzer_call(provider, timeout, &retry, operation).await
        }))
    }
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("primary_providers", &self.pool.primary_count())
            .field("providers", &self.pool.len())
            .field("network", &self.network.is_some())
            .field("ml", &self.ml.is_some())
            .field("specialized", &self.specialized.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Applies the analyzer timeout and retry schedule to one analyzer call.
async fn analyzer_call<F, Fut, T>(
    provider: Provider,
    timeout: Duration,
    retry: &RetryConfig,
    operation: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    retry_async(retry, || {
        let call = operation();
        async move {
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    provider,
                    elapsed: timeout,
                }),
            }
        }
    })
    .await
}

/// Awaits an optional analysis task. Analyzer failures, including an
/// analyzer cancelling its own call, yield no report.
async fn join_analysis<T>(
    name: &'static str,
    task: Option<AbortOnDrop<Result<T, ProviderError>>>,
) -> Result<Option<T>, ScanError> {
    let Some(task) = task else {
        return Ok(None);
    };
    match task.join().await {
        Ok(Ok(report)) => Ok(Some(report)),
        Ok(Err(e)) => {
            tracing::warn!(analysis = name, error = %e, "Analysis failed, continuing without it");
            Ok(None)
        }
        Err(e) if e.is_cancelled() => Err(ScanError::Cancelled),
        Err(e) => Err(ScanError::internal(format!("{name} analysis panicked: {e}"))),
    }
}

/// A spawned task that is aborted when the guard is dropped.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> AbortOnDrop<T> {
    async fn join(mut self) -> Result<T, JoinError> {
        (&mut self.0).await
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
