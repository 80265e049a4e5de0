use chrono::{DateTime, Utc};
use contrib_core::types::{ContributionId, ContributionRecord, PendingChange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settled state of a contribution as seen from its record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionState {
    Available,
    Installed,
    /// Installed, active after the next restart
    RestartRequired,
    PendingDeletion,
    PendingUpdate,
}

impl ContributionState {
    pub fn of(record: &ContributionRecord) -> Self {
        if !record.is_installed() {
            return ContributionState::Available;
        }
        let flags = record.flags();
        match flags.pending {
            Some(PendingChange::Deletion) => ContributionState::PendingDeletion,
            Some(PendingChange::Update) => ContributionState::PendingUpdate,
            None if flags.restart_after_install => ContributionState::RestartRequired,
            None => ContributionState::Installed,
        }
    }
}

impl fmt::Display for ContributionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ContributionState::Available => "available",
            ContributionState::Installed => "installed",
            ContributionState::RestartRequired => "restart required",
            ContributionState::PendingDeletion => "pending deletion",
            ContributionState::PendingUpdate => "pending update",
        };
        f.write_str(text)
    }
}

/// Contribution lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    InstallStarted {
        version: String,
        source_url: String,
    },

    InstallCompleted {
        version: String,
        duration_secs: u64,
    },

    InstallFailed {
        version: String,
        error_message: String,
        duration_secs: u64,
    },

    InstallCancelled {
        version: String,
    },

    UpdateStarted {
        from_version: String,
        to_version: String,
        /// The new version is installed at the next restart
        deferred: bool,
    },

    UpdateCompleted {
        from_version: String,
        to_version: String,
        deferred: bool,
        duration_secs: u64,
    },

    UpdateFailed {
        from_version: String,
        to_version: String,
        error_message: String,
        duration_secs: u64,
    },

    UpdateCancelled {
        from_version: String,
        to_version: String,
    },

    RemoveStarted {
        version: String,
        deferred: bool,
    },

    RemoveCompleted {
        version: String,
        deferred: bool,
        duration_secs: u64,
    },

    RemoveFailed {
        version: String,
        error_message: String,
        duration_secs: u64,
    },

    RemoveCancelled {
        version: String,
    },

    /// A pending deletion or update was withdrawn before restart
    UndoApplied {
        version: String,
        cleared: PendingChange,
    },

    /// A deferred change was carried out at start-up
    PendingResolved {
        version: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        change: Option<PendingChange>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error_message: Option<String>,
    },
}

impl LifecycleEvent {
    /// Snake-case name matching the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::InstallStarted { .. } => "install_started",
            LifecycleEvent::InstallCompleted { .. } => "install_completed",
            LifecycleEvent::InstallFailed { .. } => "install_failed",
            LifecycleEvent::InstallCancelled { .. } => "install_cancelled",
            LifecycleEvent::UpdateStarted { .. } => "update_started",
            LifecycleEvent::UpdateCompleted { .. } => "update_completed",
            LifecycleEvent::UpdateFailed { .. } => "update_failed",
            LifecycleEvent::UpdateCancelled { .. } => "update_cancelled",
            LifecycleEvent::RemoveStarted { .. } => "remove_started",
            LifecycleEvent::RemoveCompleted { .. } => "remove_completed",
            LifecycleEvent::RemoveFailed { .. } => "remove_failed",
            LifecycleEvent::RemoveCancelled { .. } => "remove_cancelled",
            LifecycleEvent::UndoApplied { .. } => "undo_applied",
            LifecycleEvent::PendingResolved { .. } => "pending_resolved",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            LifecycleEvent::InstallFailed { error_message, .. }
            | LifecycleEvent::UpdateFailed { error_message, .. }
            | LifecycleEvent::RemoveFailed { error_message, .. } => Some(error_message),
            LifecycleEvent::PendingResolved { error_message, .. } => error_message.as_deref(),
            _ => None,
        }
    }
}

/// Event metadata envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID (UUID v4)
    pub event_id: String,

    /// Event timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    pub contribution: ContributionId,

    /// Version of the tool that recorded the event
    pub cli_version: String,

    pub state_before: Option<ContributionState>,

    pub state_after: ContributionState,

    pub event: LifecycleEvent,
}

impl EventEnvelope {
    pub fn new(
        contribution: ContributionId,
        state_before: Option<ContributionState>,
        state_after: ContributionState,
        event: LifecycleEvent,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            contribution,
            cli_version: env!("CARGO_PKG_VERSION").to_string(),
            state_before,
            state_after,
            event,
        }
    }
}
