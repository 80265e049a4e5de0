//! Contribution lifecycle management
//!
//! This crate drives contributions through install, update, remove and
//! undo. Key pieces:
//! - [`Listing`]: shared registry merging installed and available contributions
//! - [`Controller`]: per-contribution state machine, one operation at a time
//! - [`OperationPipeline`]: async download/install/remove work, with
//!   [`ArchivePipeline`] as the default implementation
//! - [`ProgressMonitor`]: progress and exactly one terminal outcome per operation
//! - [`PendingResolver`]: applies deferred removals and updates at host start

pub mod controller;
pub mod events;
pub mod host;
pub mod journal;
pub mod listing;
pub mod monitor;
pub mod notice;
pub mod pipeline;
pub mod restart;
pub mod store;

pub use controller::{
    Accepted, Controller, FnObserver, OperationObserver, OperationState, Rejected, TerminalReport,
};
pub use events::{ContributionState, EventEnvelope, LifecycleEvent};
pub use host::{ConfiguredHost, HostApplication};
pub use journal::EventJournal;
pub use listing::{Listing, ListingChange};
pub use monitor::{MonitorEvent, MonitorEvents, Outcome, Progress, ProgressMonitor};
pub use notice::{display_version, update_notice, Affordances, PrimaryAction, StatusNotice};
pub use pipeline::{ArchivePipeline, OperationPipeline, PipelineError, RemovalMode};
pub use restart::{PendingResolver, ResolveSummary};
pub use store::{ListingSnapshot, ListingStore};
