//! Progress events and the event stream returned by `analyze`.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::error::ScanError;
use crate::core::result::ScanResult;
use crate::core::types::TargetType;

/// A phase of one scan, in the order phases happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScanStage {
    /// The scan was accepted.
    Initializing,
    /// The raw input was normalized.
    Normalizing,
    /// Provider queries are running.
    FetchingIntel,
    /// Waiting on the network posture analysis.
    AnalyzingNetwork,
    /// Waiting on the ML classifier.
    RunningMl,
    /// Running the file analyzer.
    AnalyzingFile,
    /// Running the VPN profile analyzer.
    AnalyzingVpnConfig,
    /// Running the social handle analyzer.
    AnalyzingSocialHandle,
    /// Scoring the collected signals.
    Aggregating,
    /// The result was persisted.
    Completed,
    /// The scan failed.
    Failed,
}

impl ScanStage {
    /// The analysis stage for a non-URL target type.
    pub fn analyzing(target_type: TargetType) -> Option<Self> {
        match target_type {
            TargetType::Url => None,
            TargetType::File => Some(Self::AnalyzingFile),
            TargetType::VpnConfig => Some(Self::AnalyzingVpnConfig),
            TargetType::SocialHandle => Some(Self::AnalyzingSocialHandle),
        }
    }

    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns a stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Normalizing => "normalizing",
            Self::FetchingIntel => "fetching_intel",
            Self::AnalyzingNetwork => "analyzing_network",
            Self::RunningMl => "running_ml",
            Self::AnalyzingFile => "analyzing_file",
            Self::AnalyzingVpnConfig => "analyzing_vpn_config",
            Self::AnalyzingSocialHandle => "analyzing_social_handle",
            Self::Aggregating => "aggregating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of a scan's event stream.
#[derive(Debug)]
pub enum ScanEvent {
    /// The scan entered a new stage.
    Progress {
        /// The stage entered.
        stage: ScanStage,
        /// Human-readable description.
        message: String,
    },

    /// The scan finished; always the last event.
    Success(Box<ScanResult>),

    /// The scan failed; always the last event.
    Failure(ScanError),
}

impl ScanEvent {
    /// Returns `true` for `Success` and `Failure`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success(_) | Self::Failure(_))
    }

    /// The stage of a `Progress` event.
    pub fn stage(&self) -> Option<ScanStage> {
        match self {
            Self::Progress { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Stream of events for one scan.
///
/// Dropping the stream, or calling [`cancel`](Self::cancel), aborts the scan
/// and every provider call still in flight. A cancelled stream ends without
/// a terminal event.
pub struct ScanEventStream {
    events: mpsc::Receiver<ScanEvent>,
    task: JoinHandle<()>,
}

impl ScanEventStream {
    pub(crate) fn new(events: mpsc::Receiver<ScanEvent>, task: JoinHandle<()>) -> Self {
        Self { events, task }
    }

    /// Aborts the scan. Events already buffered are discarded.
    pub fn cancel(&mut self) {
        self.task.abort();
        self.events.close();
        while self.events.try_recv().is_ok() {}
    }
}

impl Stream for ScanEventStream {
    type Item = ScanEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ScanEvent>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for ScanEventStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl fmt::Debug for ScanEventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanEventStream")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Where the pipeline reports progress.
///
/// A silent sink backs the non-streaming `scan` call.
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<ScanEvent>>,
    last: Option<ScanStage>,
}

impl EventSink {
    pub(crate) fn channel(tx: mpsc::Sender<ScanEvent>) -> Self {
        Self {
            tx: Some(tx),
            last: None,
        }
    }

    pub(crate) fn silent() -> Self {
        Self { tx: None, last: None }
    }

    /// Reports entry into `stage`.
    ///
    /// Fails with `ScanError::Cancelled` once the receiving stream is gone.
    pub(crate) async fn progress(
        &mut self,
        stage: ScanStage,
        message: impl Into<String>,
    ) -> Result<(), ScanError> {
        if self.last.is_some_and(|last| stage <= last) {
            return Err(ScanError::internal(format!(
                "stage {stage} reported after {}",
                self.last.map_or("", |s| s.as_str())
            )));
        }
        self.last = Some(stage);

        let message = message.into();
        tracing::debug!(stage = %stage, message = %message, "Scan progress");
        self.send(ScanEvent::Progress { stage, message }).await
    }

    /// Sends the terminal success event.
    pub(crate) async fn succeed(&mut self, result: ScanResult) -> Result<(), ScanError> {
        self.send(ScanEvent::Success(Box::new(result))).await
    }

    /// Sends `Progress(Failed)` followed by the terminal failure event.
    pub(crate) async fn fail(&mut self, error: ScanError) -> Result<(), ScanError> {
        self.last = Some(ScanStage::Failed);
        self.send(ScanEvent::Progress {
            stage: ScanStage::Failed,
            message: error.to_string(),
        })
        .await?;
        self.send(ScanEvent::Failure(error)).await
    }

    async fn send(&self, event: ScanEvent) -> Result<(), ScanError> {
        match &self.tx {
            Some(tx) => tx.send(event).await.map_err(|_| ScanError::Cancelled),
            None => Ok(()),
        }
    }
}
