//! Deferred changes applied when the host starts
//!
//! Restart-required contributions are not removed or replaced while the
//! host runs; they carry a pending flag instead. [`PendingResolver`] runs
//! once at start-up, before any controller accepts requests, and carries
//! those flags out.

use crate::events::{ContributionState, EventEnvelope, LifecycleEvent};
use crate::journal::EventJournal;
use crate::listing::Listing;
use crate::monitor::{Outcome, ProgressMonitor};
use crate::pipeline::{OperationPipeline, RemovalMode};
use contrib_core::types::{ContributionId, ContributionRecord, PendingChange};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What a start-up pass did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveSummary {
    /// Deleted because of a pending deletion
    pub removed: Vec<ContributionId>,
    /// Replaced by the latest version because of a pending update
    pub updated: Vec<ContributionId>,
    /// Installed before the restart and active now
    pub activated: Vec<ContributionId>,
    pub failures: Vec<(ContributionId, String)>,
}

impl ResolveSummary {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.updated.is_empty()
            && self.activated.is_empty()
            && self.failures.is_empty()
    }
}

pub struct PendingResolver {
    listing: Arc<Listing>,
    pipeline: Arc<dyn OperationPipeline>,
    journal: Option<EventJournal>,
}

impl PendingResolver {
    pub fn new(listing: Arc<Listing>, pipeline: Arc<dyn OperationPipeline>) -> Self {
        Self {
            listing,
            pipeline,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Carry out every pending flag in the listing
    pub async fn resolve(&self) -> ResolveSummary {
        let mut summary = ResolveSummary::default();

        for record in self.listing.snapshot() {
            let flags = record.flags();
            if flags.is_empty() {
                continue;
            }

            match flags.pending {
                Some(PendingChange::Deletion) => self.resolve_deletion(record, &mut summary).await,
                Some(PendingChange::Update) => self.resolve_update(record, &mut summary).await,
                None => self.activate(record, &mut summary),
            }
        }

        if !summary.is_empty() {
            info!(
                "Applied pending changes: {} removed, {} updated, {} activated, {} failed",
                summary.removed.len(),
                summary.updated.len(),
                summary.activated.len(),
                summary.failures.len()
            );
        }
        summary
    }

    async fn remove_now(&self, record: &ContributionRecord) -> Outcome {
        let (monitor, events) = ProgressMonitor::new(CancellationToken::new());
        self.pipeline
            .remove(record.clone(), RemovalMode::Immediate, monitor)
            .await;
        events.outcome().await
    }

    async fn install_now(&self, target: &ContributionRecord, source_url: String) -> Outcome {
        let (monitor, events) = ProgressMonitor::new(CancellationToken::new());
        self.pipeline
            .download_and_install(target.clone(), source_url, monitor)
            .await;
        events.outcome().await
    }

    async fn resolve_deletion(&self, record: ContributionRecord, summary: &mut ResolveSummary) {
        let id = record.id.clone();
        match self.remove_now(&record).await {
            Outcome::Finished => {
                let removed = self.uninstalled(&record);
                self.commit(&record, removed, Some(PendingChange::Deletion), None);
                summary.removed.push(id);
            }
            outcome => self.fail(&record, Some(PendingChange::Deletion), outcome, summary),
        }
    }

    /// The pipeline swaps the new copy over the old one, so a failed
    /// download leaves the installed version and its flag for the next start
    async fn resolve_update(&self, record: ContributionRecord, summary: &mut ResolveSummary) {
        let id = record.id.clone();
        let available = self.listing.available(&id);
        let source_url = available
            .as_ref()
            .and_then(|available| available.download_url.clone());

        let (Some(available), Some(source_url)) = (available, source_url) else {
            let outcome = Outcome::Failed("No download is available for this platform".into());
            return self.fail(&record, Some(PendingChange::Update), outcome, summary);
        };

        let mut target = record.clone();
        target.apply_available(&available);

        match self.install_now(&target, source_url).await {
            Outcome::Finished => {
                let mut updated = target.clone();
                updated.mark_installed(target.version.clone());
                self.commit(&record, updated, Some(PendingChange::Update), None);
                summary.updated.push(id);
            }
            outcome => self.fail(&record, Some(PendingChange::Update), outcome, summary),
        }
    }

    fn activate(&self, record: ContributionRecord, summary: &mut ResolveSummary) {
        let mut active = record.clone();
        active.clear_restart_after_install();
        self.commit(&record, active, None, None);
        summary.activated.push(record.id);
    }

    /// Uninstalled copy of `record` carrying the remote metadata, if any
    fn uninstalled(&self, record: &ContributionRecord) -> ContributionRecord {
        let mut removed = record.clone();
        removed.mark_uninstalled();
        if let Some(available) = self.listing.available(&record.id) {
            removed.apply_available(&available);
        }
        removed
    }

    /// A failed change leaves the record and its flag for the next start
    fn fail(
        &self,
        record: &ContributionRecord,
        change: Option<PendingChange>,
        outcome: Outcome,
        summary: &mut ResolveSummary,
    ) {
        let message = outcome_message(&outcome);
        warn!(contribution = %record.id, "Pending change not applied: {}", message);
        self.journal_event(record, record, change, Some(message.clone()));
        summary.failures.push((record.id.clone(), message));
    }

    fn commit(
        &self,
        old: &ContributionRecord,
        new: ContributionRecord,
        change: Option<PendingChange>,
        error_message: Option<String>,
    ) {
        self.journal_event(old, &new, change, error_message);
        if let Err(e) = self.listing.replace(old, new) {
            warn!(contribution = %old.id, "Failed to update listing: {}", e);
        }
    }

    fn journal_event(
        &self,
        old: &ContributionRecord,
        new: &ContributionRecord,
        change: Option<PendingChange>,
        error_message: Option<String>,
    ) {
        let Some(journal) = &self.journal else {
            return;
        };
        let envelope = EventEnvelope::new(
            old.id.clone(),
            Some(ContributionState::of(old)),
            ContributionState::of(new),
            LifecycleEvent::PendingResolved {
                version: new.version.clone(),
                change,
                error_message,
            },
        );
        if let Err(e) = journal.append(&envelope) {
            warn!("Failed to write lifecycle journal: {:#}", e);
        }
    }
}

fn outcome_message(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Failed(message) => message.clone(),
        other => format!("operation {}", other),
    }
}
