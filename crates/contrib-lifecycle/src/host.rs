//! Host application collaborator

use contrib_core::types::{ContributionType, HostConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// What the lifecycle needs to know about the running host
pub trait HostApplication: Send + Sync {
    /// Revision compared against contribution compatibility bounds
    fn current_revision(&self) -> u32;

    /// Whether contributions of `kind` are loaded in the running process
    fn is_type_loaded(&self, kind: ContributionType) -> bool;

    /// Ask the host to restart so deferred changes get applied
    fn request_restart(&self);
}

/// Host described by runtime configuration.
///
/// Used by command-line front ends, which cannot restart anything
/// themselves: a restart request is recorded and logged.
pub struct ConfiguredHost {
    config: HostConfig,
    restart_requested: AtomicBool,
}

impl ConfiguredHost {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            restart_requested: AtomicBool::new(false),
        }
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.load(Ordering::SeqCst)
    }
}

impl HostApplication for ConfiguredHost {
    fn current_revision(&self) -> u32 {
        self.config.revision
    }

    fn is_type_loaded(&self, kind: ContributionType) -> bool {
        self.config.is_loaded(kind)
    }

    fn request_restart(&self) {
        info!("Restart the host application to apply pending changes");
        self.restart_requested.store(true, Ordering::SeqCst);
    }
}
