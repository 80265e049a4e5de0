//! Mock implementations for testing
//!
//! Provides a scripted pipeline, a configurable host and a recording
//! observer so controller behavior can be tested without network or disk.

#![allow(dead_code)]

use super::constants::{DEFAULT_TEST_TIMEOUT, TEST_HOST_REVISION};
use async_trait::async_trait;
use contrib_core::types::{ContributionId, ContributionRecord, ContributionType};
use contrib_lifecycle::{
    HostApplication, OperationObserver, OperationPipeline, Progress, ProgressMonitor,
    RemovalMode, TerminalReport,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};

/// What the scripted pipeline does for one call
#[derive(Clone)]
pub enum Script {
    /// Report a little progress, then finish
    Finish,
    /// Report progress steps, then finish
    Progress(Vec<u8>),
    /// Fail with a message
    Fail(String),
    /// Wait for cancellation, then report it
    WaitForCancel,
    /// Wait for the gate or for cancellation, whichever comes first
    Gate(Arc<Notify>),
    /// Wait for the gate and finish, even if cancelled meanwhile
    GateIgnoringCancel(Arc<Notify>),
    /// Drop the monitor without a terminal outcome
    Abandon,
}

/// Record of a pipeline invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineCall {
    Install {
        id: ContributionId,
        version: String,
        source_url: String,
    },
    Remove {
        id: ContributionId,
        mode: RemovalMode,
    },
}

/// Pipeline that follows queued scripts; unscripted calls finish
#[derive(Default)]
pub struct ScriptedPipeline {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<PipelineCall>>,
    discarded: Mutex<Vec<ContributionId>>,
}

impl ScriptedPipeline {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the behavior of the next call
    pub fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn calls(&self) -> Vec<PipelineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn discarded(&self) -> Vec<ContributionId> {
        self.discarded.lock().unwrap().clone()
    }

    async fn run(&self, mut monitor: ProgressMonitor) {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Finish);

        monitor.start();
        match script {
            Script::Finish => {
                monitor.set_progress(50);
                monitor.finish();
            }
            Script::Progress(steps) => {
                for step in steps {
                    monitor.set_progress(step);
                    tokio::task::yield_now().await;
                }
                monitor.finish();
            }
            Script::Fail(message) => monitor.fail(message),
            Script::WaitForCancel => {
                monitor.cancelled().await;
                monitor.report_cancelled();
            }
            Script::Gate(gate) => {
                let cancelled = tokio::select! {
                    _ = gate.notified() => false,
                    _ = monitor.cancelled() => true,
                };
                if cancelled {
                    monitor.report_cancelled();
                } else {
                    monitor.finish();
                }
            }
            Script::GateIgnoringCancel(gate) => {
                gate.notified().await;
                monitor.finish();
            }
            Script::Abandon => drop(monitor),
        }
    }
}

#[async_trait]
impl OperationPipeline for ScriptedPipeline {
    async fn download_and_install(
        &self,
        record: ContributionRecord,
        source_url: String,
        monitor: ProgressMonitor,
    ) {
        self.calls.lock().unwrap().push(PipelineCall::Install {
            id: record.id.clone(),
            version: record.version.clone(),
            source_url,
        });
        self.run(monitor).await;
    }

    async fn remove(&self, record: ContributionRecord, mode: RemovalMode, monitor: ProgressMonitor) {
        self.calls.lock().unwrap().push(PipelineCall::Remove {
            id: record.id.clone(),
            mode,
        });
        self.run(monitor).await;
    }

    fn discard_deferred(&self, id: &ContributionId) -> anyhow::Result<()> {
        self.discarded.lock().unwrap().push(id.clone());
        Ok(())
    }
}

/// Host with a settable revision and loaded types
pub struct MockHost {
    revision: u32,
    loaded: Mutex<HashSet<ContributionType>>,
    restart_requests: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Self::with_revision(TEST_HOST_REVISION)
    }

    pub fn with_revision(revision: u32) -> Arc<Self> {
        Arc::new(Self {
            revision,
            loaded: Mutex::new(HashSet::new()),
            restart_requests: AtomicUsize::new(0),
        })
    }

    pub fn set_loaded(&self, kind: ContributionType, loaded: bool) {
        let mut kinds = self.loaded.lock().unwrap();
        if loaded {
            kinds.insert(kind);
        } else {
            kinds.remove(&kind);
        }
    }

    pub fn restart_requests(&self) -> usize {
        self.restart_requests.load(Ordering::SeqCst)
    }
}

impl HostApplication for MockHost {
    fn current_revision(&self) -> u32 {
        self.revision
    }

    fn is_type_loaded(&self, kind: ContributionType) -> bool {
        self.loaded.lock().unwrap().contains(&kind)
    }

    fn request_restart(&self) {
        self.restart_requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observer that records progress and hands out terminal reports in order
pub struct RecordingObserver {
    progress: Mutex<Vec<(ContributionId, Progress)>>,
    terminal_tx: mpsc::UnboundedSender<TerminalReport>,
    terminal_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TerminalReport>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        let (terminal_tx, terminal_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            progress: Mutex::new(Vec::new()),
            terminal_tx,
            terminal_rx: tokio::sync::Mutex::new(terminal_rx),
        })
    }

    pub fn progress(&self) -> Vec<Progress> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .map(|(_, progress)| *progress)
            .collect()
    }

    /// Wait for the next terminal report
    pub async fn next_terminal(&self) -> TerminalReport {
        let mut rx = self.terminal_rx.lock().await;
        tokio::time::timeout(DEFAULT_TEST_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for a terminal report")
            .expect("observer channel closed")
    }

    /// True when no terminal report is waiting
    pub async fn no_pending_terminal(&self) -> bool {
        self.terminal_rx.lock().await.try_recv().is_err()
    }
}

impl OperationObserver for RecordingObserver {
    fn on_progress(&self, id: &ContributionId, progress: Progress) {
        self.progress.lock().unwrap().push((id.clone(), progress));
    }

    fn on_terminal(&self, _id: &ContributionId, report: &TerminalReport) {
        let _ = self.terminal_tx.send(report.clone());
    }
}
