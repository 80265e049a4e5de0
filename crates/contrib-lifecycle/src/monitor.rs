//! Progress reporting for one in-flight operation
//!
//! A [`ProgressMonitor`] is handed to the pipeline and owned by it. Progress
//! updates flow through an unbounded channel to whoever holds the matching
//! [`MonitorEvents`]. Terminal methods consume the monitor, so an operation
//! reports at most one outcome; dropping a monitor without reporting one
//! emits an error so the observer is never left waiting.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

/// Message reported when a monitor is dropped before reaching a terminal
pub const NO_RESULT_MESSAGE: &str = "operation ended without reporting a result";

/// Non-terminal phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Progress {
    Starting,
    /// `percent` is `None` while the amount of work is unknown
    Running { percent: Option<u8> },
}

/// Terminal outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum Outcome {
    Finished,
    Cancelled,
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Finished => f.write_str("finished"),
            Outcome::Cancelled => f.write_str("cancelled"),
            Outcome::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// Event delivered to the monitor's reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Progress(Progress),
    Terminal(Outcome),
}

/// Writer half, owned by the pipeline
pub struct ProgressMonitor {
    tx: Option<mpsc::UnboundedSender<MonitorEvent>>,
    cancel: CancellationToken,
    last: Option<Progress>,
}

/// Reader half
pub struct MonitorEvents {
    rx: mpsc::UnboundedReceiver<MonitorEvent>,
}

impl ProgressMonitor {
    /// Create a monitor observing `cancel`, plus the reader for its events
    pub fn new(cancel: CancellationToken) -> (Self, MonitorEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            tx: Some(tx),
            cancel,
            last: None,
        };
        (monitor, MonitorEvents { rx })
    }

    fn emit(&mut self, progress: Progress) {
        if self.last == Some(progress) {
            return;
        }
        self.last = Some(progress);
        if let Some(tx) = &self.tx {
            // A closed reader only means nobody is listening anymore
            let _ = tx.send(MonitorEvent::Progress(progress));
        }
    }

    pub fn start(&mut self) {
        self.emit(Progress::Starting);
    }

    /// Report determinate progress; values above 100 are clamped
    pub fn set_progress(&mut self, percent: u8) {
        self.emit(Progress::Running {
            percent: Some(percent.min(100)),
        });
    }

    pub fn set_indeterminate(&mut self) {
        self.emit(Progress::Running { percent: None });
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    fn terminate(mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(MonitorEvent::Terminal(outcome));
        }
    }

    pub fn finish(self) {
        self.terminate(Outcome::Finished);
    }

    pub fn report_cancelled(self) {
        self.terminate(Outcome::Cancelled);
    }

    pub fn fail(self, message: impl Into<String>) {
        self.terminate(Outcome::Failed(message.into()));
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            debug!("Progress monitor dropped without a terminal outcome");
            let _ = tx.send(MonitorEvent::Terminal(Outcome::Failed(
                NO_RESULT_MESSAGE.to_string(),
            )));
        }
    }
}

impl MonitorEvents {
    /// Next event; `None` once the monitor is gone and everything was read
    pub async fn recv(&mut self) -> Option<MonitorEvent> {
        self.rx.recv().await
    }

    /// Skip progress and wait for the terminal outcome
    pub async fn outcome(mut self) -> Outcome {
        while let Some(event) = self.rx.recv().await {
            if let MonitorEvent::Terminal(outcome) = event {
                return outcome;
            }
        }
        Outcome::Failed(NO_RESULT_MESSAGE.to_string())
    }
}
