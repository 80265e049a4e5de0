//! Per-contribution lifecycle state machine
//!
//! The controller decides which requests are legal, keeps at most one
//! operation running per contribution and applies each operation's
//! terminal outcome to the [`Listing`].
//!
//! Every accepted request launches two tasks: the pipeline task writes
//! progress into a [`ProgressMonitor`], and a driver task reads it,
//! forwards progress to observers and applies the terminal outcome. Each
//! launch carries a generation number so a terminal that does not belong
//! to the active operation is ignored.

use crate::events::{ContributionState, EventEnvelope, LifecycleEvent};
use crate::host::HostApplication;
use crate::journal::EventJournal;
use crate::listing::Listing;
use crate::monitor::{MonitorEvent, MonitorEvents, Outcome, Progress, ProgressMonitor, NO_RESULT_MESSAGE};
use crate::pipeline::{OperationPipeline, RemovalMode};
use contrib_core::types::{ContributionId, ContributionRecord, PendingChange};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events kept in memory for [`Controller::history`]
const HISTORY_CAPACITY: usize = 256;

/// What a contribution is busy with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Idle,
    Installing,
    Updating,
    Removing,
}

impl OperationState {
    pub fn is_active(self) -> bool {
        self != OperationState::Idle
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OperationState::Idle => "idle",
            OperationState::Installing => "installing",
            OperationState::Updating => "updating",
            OperationState::Removing => "removing",
        };
        f.write_str(text)
    }
}

/// Why a request was turned down. Nothing was started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("Another operation is in progress ({0})")]
    OperationInProgress(OperationState),

    #[error("Already installed")]
    AlreadyInstalled,

    #[error("Not installed")]
    NotInstalled,

    #[error("Not compatible with host revision {revision}")]
    IncompatibleRevision { revision: u32 },

    #[error("The contribution list could not be downloaded")]
    ListDownloadFailed,

    #[error("No update available")]
    NoUpdateAvailable,

    #[error("No removal is pending")]
    NotFlaggedForDeletion,

    #[error("A {0} is waiting for restart")]
    PendingChange(PendingChange),

    #[error("No download is available for this platform")]
    UnsupportedPlatform,

    #[error("Unknown contribution")]
    UnknownContribution,
}

/// A request that was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub id: ContributionId,
    /// State right after the request; `Idle` for undo
    pub state: OperationState,
    /// Whether contributions of this type still wait for a restart
    pub restart_pending: bool,
}

/// Result of one launched operation, delivered to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalReport {
    pub id: ContributionId,
    pub operation: OperationState,
    pub outcome: Outcome,
    /// Listing record after the outcome was applied
    pub record: ContributionRecord,
    pub restart_suggested: bool,
    pub update_enabled: bool,
}

/// Receives progress and terminal reports for a contribution
pub trait OperationObserver: Send + Sync {
    fn on_progress(&self, id: &ContributionId, progress: Progress);

    fn on_terminal(&self, id: &ContributionId, report: &TerminalReport);
}

/// Observer built from a pair of closures
pub struct FnObserver<P, T> {
    progress: P,
    terminal: T,
}

impl<P, T> FnObserver<P, T>
where
    P: Fn(&ContributionId, Progress) + Send + Sync,
    T: Fn(&ContributionId, &TerminalReport) + Send + Sync,
{
    pub fn new(progress: P, terminal: T) -> Self {
        Self { progress, terminal }
    }
}

impl<P, T> OperationObserver for FnObserver<P, T>
where
    P: Fn(&ContributionId, Progress) + Send + Sync,
    T: Fn(&ContributionId, &TerminalReport) + Send + Sync,
{
    fn on_progress(&self, id: &ContributionId, progress: Progress) {
        (self.progress)(id, progress)
    }

    fn on_terminal(&self, id: &ContributionId, report: &TerminalReport) {
        (self.terminal)(id, report)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Install,
    Update,
    Remove,
}

impl Operation {
    fn state(self) -> OperationState {
        match self {
            Operation::Install => OperationState::Installing,
            Operation::Update => OperationState::Updating,
            Operation::Remove => OperationState::Removing,
        }
    }
}

#[derive(Debug, Clone)]
enum Job {
    Install {
        target: ContributionRecord,
        source_url: String,
    },
    Remove {
        record: ContributionRecord,
        mode: RemovalMode,
    },
}

impl Job {
    fn is_deferred(&self) -> bool {
        matches!(self, Job::Remove { mode, .. } if mode.is_deferred())
    }
}

/// Everything the driver needs to apply a terminal outcome
#[derive(Debug, Clone)]
struct Launch {
    operation: Operation,
    before: ContributionRecord,
    to_version: String,
    job: Job,
}

struct ActiveSlot {
    state: OperationState,
    generation: u64,
    cancel: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Controller {
    listing: Arc<Listing>,
    pipeline: Arc<dyn OperationPipeline>,
    host: Arc<dyn HostApplication>,
    journal: Option<EventJournal>,
    slots: Mutex<HashMap<ContributionId, ActiveSlot>>,
    observers: Mutex<HashMap<ContributionId, Vec<Arc<dyn OperationObserver>>>>,
    history: Mutex<VecDeque<EventEnvelope>>,
    next_generation: AtomicU64,
}

impl Controller {
    pub fn new(
        listing: Arc<Listing>,
        pipeline: Arc<dyn OperationPipeline>,
        host: Arc<dyn HostApplication>,
    ) -> Self {
        Self {
            listing,
            pipeline,
            host,
            journal: None,
            slots: Mutex::new(HashMap::new()),
            observers: Mutex::new(HashMap::new()),
            history: Mutex::new(VecDeque::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Also append every lifecycle event to `journal`
    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn listing(&self) -> &Arc<Listing> {
        &self.listing
    }

    pub fn state(&self, id: &ContributionId) -> OperationState {
        lock(&self.slots)
            .get(id)
            .map_or(OperationState::Idle, |slot| slot.state)
    }

    pub fn subscribe(&self, id: &ContributionId, observer: Arc<dyn OperationObserver>) {
        lock(&self.observers)
            .entry(id.clone())
            .or_default()
            .push(observer);
    }

    /// Stop delivering reports to `observer`. Returns false if it was not
    /// subscribed to `id`.
    pub fn unsubscribe(&self, id: &ContributionId, observer: &Arc<dyn OperationObserver>) -> bool {
        let mut observers = lock(&self.observers);
        let Some(list) = observers.get_mut(id) else {
            return false;
        };
        let before = list.len();
        list.retain(|existing| !Arc::ptr_eq(existing, observer));
        let removed = list.len() != before;
        if list.is_empty() {
            observers.remove(id);
        }
        removed
    }

    /// Install the available version of a contribution.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_install(self: &Arc<Self>, id: &ContributionId) -> Result<Accepted, Rejected> {
        self.request(id, |this, record| this.plan_install(record))
    }

    /// Replace an installed contribution with the latest available version.
    /// Restart-required types are flagged and updated at the next start.
    pub fn request_update(self: &Arc<Self>, id: &ContributionId) -> Result<Accepted, Rejected> {
        self.request(id, |this, record| this.plan_update(record))
    }

    /// Remove an installed contribution. Restart-required types are flagged
    /// and removed at the next start.
    pub fn request_remove(self: &Arc<Self>, id: &ContributionId) -> Result<Accepted, Rejected> {
        self.request(id, |this, record| this.plan_remove(record))
    }

    /// Withdraw a pending deletion or update before the restart happens
    pub fn request_undo(&self, id: &ContributionId) -> Result<Accepted, Rejected> {
        let slots = lock(&self.slots);
        if let Some(slot) = slots.get(id) {
            return Err(Rejected::OperationInProgress(slot.state));
        }

        let record = self.listing.get(id).ok_or(Rejected::UnknownContribution)?;
        let Some(change) = record.flags().pending else {
            return Err(Rejected::NotFlaggedForDeletion);
        };

        let mut restored = record.clone();
        restored.clear_pending();
        self.listing
            .replace(&record, restored.clone())
            .map_err(|_| Rejected::UnknownContribution)?;
        drop(slots);

        if let Err(e) = self.pipeline.discard_deferred(id) {
            warn!(contribution = %id, "Failed to clear deferred removal marker: {:#}", e);
        }

        let restart_pending = self.listing.restart_pending(id.kind);
        info!(contribution = %id, "Undid {}", change);
        self.record_event(
            id,
            Some(ContributionState::of(&record)),
            ContributionState::of(&restored),
            LifecycleEvent::UndoApplied {
                version: restored.version.clone(),
                cleared: change,
            },
        );

        Ok(Accepted {
            id: id.clone(),
            state: OperationState::Idle,
            restart_pending,
        })
    }

    /// Signal the active operation to stop. Returns false when idle.
    pub fn cancel(&self, id: &ContributionId) -> bool {
        match lock(&self.slots).get(id) {
            Some(slot) => {
                info!(contribution = %id, "Cancelling {}", slot.state);
                slot.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether any contribution waits for a restart
    pub fn restart_required(&self) -> bool {
        self.listing.any_restart_pending()
    }

    /// Forward a restart request to the host when one is needed
    pub fn request_restart(&self) -> bool {
        if !self.restart_required() {
            debug!("Restart requested but nothing is pending");
            return false;
        }
        self.host.request_restart();
        true
    }

    /// Recent lifecycle events, oldest first
    pub fn history(&self) -> Vec<EventEnvelope> {
        lock(&self.history).iter().cloned().collect()
    }

    fn request<F>(self: &Arc<Self>, id: &ContributionId, plan: F) -> Result<Accepted, Rejected>
    where
        F: FnOnce(&Self, ContributionRecord) -> Result<Launch, Rejected>,
    {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(id) {
            return Err(Rejected::OperationInProgress(slot.state));
        }

        let record = self.listing.get(id).ok_or(Rejected::UnknownContribution)?;
        let launch = plan(self.as_ref(), record).inspect_err(|reason| {
            debug!(contribution = %id, "Request rejected: {}", reason);
        })?;

        let state = launch.operation.state();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        slots.insert(
            id.clone(),
            ActiveSlot {
                state,
                generation,
                cancel: cancel.clone(),
            },
        );
        drop(slots);

        info!(contribution = %id, generation, "Starting {}", state);
        let before = ContributionState::of(&launch.before);
        self.record_event(id, Some(before), before, started_event(&launch));
        self.spawn(id.clone(), generation, cancel, launch);

        Ok(Accepted {
            id: id.clone(),
            state,
            restart_pending: self.listing.restart_pending(id.kind),
        })
    }

    fn plan_install(&self, record: ContributionRecord) -> Result<Launch, Rejected> {
        if record.is_installed() {
            return Err(Rejected::AlreadyInstalled);
        }
        if self.listing.has_list_download_failed() {
            return Err(Rejected::ListDownloadFailed);
        }
        let revision = self.host.current_revision();
        if !record.is_compatible(revision) {
            return Err(Rejected::IncompatibleRevision { revision });
        }

        let mut target = record.clone();
        if let Some(available) = self.listing.available(&record.id) {
            target.apply_available(&available);
        }
        let source_url = target
            .download_url
            .clone()
            .ok_or(Rejected::UnsupportedPlatform)?;

        Ok(Launch {
            operation: Operation::Install,
            to_version: target.version.clone(),
            before: record,
            job: Job::Install { target, source_url },
        })
    }

    fn plan_update(&self, record: ContributionRecord) -> Result<Launch, Rejected> {
        if !record.is_installed() {
            return Err(Rejected::NotInstalled);
        }
        if let Some(change) = record.flags().pending {
            return Err(Rejected::PendingChange(change));
        }
        if self.listing.has_list_download_failed() {
            return Err(Rejected::ListDownloadFailed);
        }
        if !self.listing.has_update(&record.id) {
            return Err(Rejected::NoUpdateAvailable);
        }
        let available = self
            .listing
            .available(&record.id)
            .ok_or(Rejected::NoUpdateAvailable)?;

        let mut target = record.clone();
        target.apply_available(&available);
        let revision = self.host.current_revision();
        if !target.is_compatible(revision) {
            return Err(Rejected::IncompatibleRevision { revision });
        }
        let source_url = target
            .download_url
            .clone()
            .ok_or(Rejected::UnsupportedPlatform)?;

        let job = if record.kind().requires_restart() {
            Job::Remove {
                record: record.clone(),
                mode: RemovalMode::DeferForUpdate,
            }
        } else {
            Job::Install { target, source_url }
        };

        Ok(Launch {
            operation: Operation::Update,
            to_version: available.version,
            before: record,
            job,
        })
    }

    fn plan_remove(&self, record: ContributionRecord) -> Result<Launch, Rejected> {
        if !record.is_installed() {
            return Err(Rejected::NotInstalled);
        }
        if let Some(change) = record.flags().pending {
            return Err(Rejected::PendingChange(change));
        }

        let mode = if record.kind().requires_restart() {
            RemovalMode::DeferDeletion
        } else {
            RemovalMode::Immediate
        };

        Ok(Launch {
            operation: Operation::Remove,
            to_version: record.version.clone(),
            before: record.clone(),
            job: Job::Remove { record, mode },
        })
    }

    fn spawn(
        self: &Arc<Self>,
        id: ContributionId,
        generation: u64,
        cancel: CancellationToken,
        launch: Launch,
    ) {
        let (monitor, events) = ProgressMonitor::new(cancel);
        let pipeline = Arc::clone(&self.pipeline);

        match launch.job.clone() {
            Job::Install { target, source_url } => {
                tokio::spawn(async move {
                    pipeline.download_and_install(target, source_url, monitor).await
                });
            }
            Job::Remove { record, mode } => {
                tokio::spawn(async move { pipeline.remove(record, mode, monitor).await });
            }
        }

        let this = Arc::clone(self);
        tokio::spawn(async move { this.drive(id, generation, launch, events).await });
    }

    async fn drive(
        self: Arc<Self>,
        id: ContributionId,
        generation: u64,
        launch: Launch,
        mut events: MonitorEvents,
    ) {
        let started = Instant::now();
        let outcome = loop {
            match events.recv().await {
                Some(MonitorEvent::Progress(progress)) => {
                    if self.is_current(&id, generation) {
                        for observer in self.observers_for(&id) {
                            observer.on_progress(&id, progress);
                        }
                    }
                }
                Some(MonitorEvent::Terminal(outcome)) => break outcome,
                None => break Outcome::Failed(NO_RESULT_MESSAGE.to_string()),
            }
        };

        self.complete(&id, generation, &launch, outcome, started.elapsed());
    }

    fn is_current(&self, id: &ContributionId, generation: u64) -> bool {
        lock(&self.slots)
            .get(id)
            .is_some_and(|slot| slot.generation == generation)
    }

    fn observers_for(&self, id: &ContributionId) -> Vec<Arc<dyn OperationObserver>> {
        lock(&self.observers).get(id).cloned().unwrap_or_default()
    }

    /// Apply a terminal outcome, return the slot to idle, then notify
    fn complete(
        &self,
        id: &ContributionId,
        generation: u64,
        launch: &Launch,
        outcome: Outcome,
        elapsed: Duration,
    ) {
        if !self.is_current(id, generation) {
            debug!(contribution = %id, generation, "Ignoring terminal of a finished operation");
            return;
        }

        let (outcome, record) = match self.apply(id, launch, &outcome) {
            Ok(record) => (outcome, record),
            Err(e) => {
                error!(contribution = %id, "Failed to apply {}: {}", outcome, e);
                let record = self
                    .listing
                    .get(id)
                    .unwrap_or_else(|| launch.before.clone());
                (Outcome::Failed(format!("Failed to record result: {}", e)), record)
            }
        };

        let operation = launch.operation.state();
        let loaded = self.host.is_type_loaded(id.kind);
        let has_update = self.listing.has_update(id);
        let (restart_suggested, update_enabled) = match (&outcome, operation) {
            (Outcome::Finished, _) => (!record.flags().is_empty(), has_update),
            (Outcome::Cancelled, OperationState::Removing | OperationState::Updating) => {
                (!loaded, loaded && has_update)
            }
            _ => (false, has_update),
        };

        match &outcome {
            Outcome::Finished => info!(contribution = %id, "{} finished", operation),
            Outcome::Cancelled => info!(contribution = %id, "{} cancelled", operation),
            Outcome::Failed(message) => warn!(contribution = %id, "{} failed: {}", operation, message),
        }

        self.record_event(
            id,
            Some(ContributionState::of(&launch.before)),
            ContributionState::of(&record),
            terminal_event(launch, &outcome, elapsed),
        );

        {
            let mut slots = lock(&self.slots);
            if slots.get(id).is_some_and(|slot| slot.generation == generation) {
                slots.remove(id);
            }
        }

        let report = TerminalReport {
            id: id.clone(),
            operation,
            outcome,
            record,
            restart_suggested,
            update_enabled,
        };
        for observer in self.observers_for(id) {
            observer.on_terminal(id, &report);
        }
    }

    /// Update the listing for an outcome and return the resulting record.
    /// Errors and most cancellations leave the record untouched.
    fn apply(
        &self,
        id: &ContributionId,
        launch: &Launch,
        outcome: &Outcome,
    ) -> contrib_core::Result<ContributionRecord> {
        let current = self
            .listing
            .get(id)
            .ok_or_else(|| contrib_core::Error::unknown_contribution(id))?;

        let updated = match (outcome, &launch.job) {
            (Outcome::Finished, Job::Install { target, .. }) => {
                let mut record = target.clone();
                record.mark_installed(target.version.clone());
                if id.kind.requires_restart() {
                    record.flag_restart_after_install()?;
                }
                Some(record)
            }
            (Outcome::Finished, Job::Remove { mode, .. }) => {
                let mut record = current.clone();
                match mode {
                    RemovalMode::Immediate => {
                        record.mark_uninstalled();
                        if let Some(available) = self.listing.available(id) {
                            record.apply_available(&available);
                        }
                    }
                    RemovalMode::DeferDeletion => record.flag_pending(PendingChange::Deletion)?,
                    RemovalMode::DeferForUpdate => record.flag_pending(PendingChange::Update)?,
                }
                Some(record)
            }
            (Outcome::Cancelled, _)
                if launch.operation == Operation::Update
                    && current.flags().is_deletion_flagged() =>
            {
                let mut record = current.clone();
                record.flag_pending(PendingChange::Update)?;
                Some(record)
            }
            _ => None,
        };

        match updated {
            Some(record) => {
                self.listing.replace(&current, record.clone())?;
                Ok(record)
            }
            None => Ok(current),
        }
    }

    fn record_event(
        &self,
        id: &ContributionId,
        before: Option<ContributionState>,
        after: ContributionState,
        event: LifecycleEvent,
    ) {
        let envelope = EventEnvelope::new(id.clone(), before, after, event);

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(&envelope) {
                warn!("Failed to write lifecycle journal: {:#}", e);
            }
        }

        let mut history = lock(&self.history);
        if history.len() == HISTORY_CAPACITY {
            history.pop_front();
        }
        history.push_back(envelope);
    }
}

fn started_event(launch: &Launch) -> LifecycleEvent {
    let version = launch.before.version.clone();
    match (&launch.operation, &launch.job) {
        (Operation::Install, Job::Install { source_url, .. }) => LifecycleEvent::InstallStarted {
            version: launch.to_version.clone(),
            source_url: source_url.clone(),
        },
        (Operation::Update, job) => LifecycleEvent::UpdateStarted {
            from_version: version,
            to_version: launch.to_version.clone(),
            deferred: job.is_deferred(),
        },
        (_, job) => LifecycleEvent::RemoveStarted {
            version,
            deferred: job.is_deferred(),
        },
    }
}

fn terminal_event(launch: &Launch, outcome: &Outcome, elapsed: Duration) -> LifecycleEvent {
    let duration_secs = elapsed.as_secs();
    let from_version = launch.before.version.clone();
    let to_version = launch.to_version.clone();
    let deferred = launch.job.is_deferred();

    match (launch.operation, outcome) {
        (Operation::Install, Outcome::Finished) => LifecycleEvent::InstallCompleted {
            version: to_version,
            duration_secs,
        },
        (Operation::Install, Outcome::Cancelled) => {
            LifecycleEvent::InstallCancelled { version: to_version }
        }
        (Operation::Install, Outcome::Failed(message)) => LifecycleEvent::InstallFailed {
            version: to_version,
            error_message: message.clone(),
            duration_secs,
        },
        (Operation::Update, Outcome::Finished) => LifecycleEvent::UpdateCompleted {
            from_version,
            to_version,
            deferred,
            duration_secs,
        },
        (Operation::Update, Outcome::Cancelled) => LifecycleEvent::UpdateCancelled {
            from_version,
            to_version,
        },
        (Operation::Update, Outcome::Failed(message)) => LifecycleEvent::UpdateFailed {
            from_version,
            to_version,
            error_message: message.clone(),
            duration_secs,
        },
        (Operation::Remove, Outcome::Finished) => LifecycleEvent::RemoveCompleted {
            version: from_version,
            deferred,
            duration_secs,
        },
        (Operation::Remove, Outcome::Cancelled) => LifecycleEvent::RemoveCancelled {
            version: from_version,
        },
        (Operation::Remove, Outcome::Failed(message)) => LifecycleEvent::RemoveFailed {
            version: from_version,
            error_message: message.clone(),
            duration_secs,
        },
    }
}
