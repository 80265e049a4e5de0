//! Status notices and available actions for one contribution

use crate::controller::OperationState;
use crate::listing::Listing;
use contrib_core::types::{ContributionId, ContributionRecord};
use std::fmt;

/// Restart-related notice shown next to a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusNotice {
    None,
    RemoveOnRestart,
    InstallOnRestart,
    UpdateOnRestart,
}

impl StatusNotice {
    /// Pending deletion wins over a fresh install, which wins over a
    /// pending update
    pub fn for_record(record: &ContributionRecord) -> Self {
        let flags = record.flags();
        if flags.is_deletion_flagged() {
            StatusNotice::RemoveOnRestart
        } else if flags.restart_after_install {
            StatusNotice::InstallOnRestart
        } else if flags.is_update_flagged() {
            StatusNotice::UpdateOnRestart
        } else {
            StatusNotice::None
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            StatusNotice::None => None,
            StatusNotice::RemoveOnRestart => Some("Removed on restart"),
            StatusNotice::InstallOnRestart => Some("Installed on restart"),
            StatusNotice::UpdateOnRestart => Some("Updated on restart"),
        }
    }
}

impl fmt::Display for StatusNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message().unwrap_or(""))
    }
}

/// "New version available" text, unless a pending change already covers it
pub fn update_notice(listing: &Listing, id: &ContributionId) -> Option<String> {
    if !listing.has_update(id) {
        return None;
    }
    match listing.latest_version(id) {
        Some(latest) => Some(format!("New version ({}) available.", latest)),
        None => Some("New version available.".to_string()),
    }
}

/// Normalize a published version for display.
///
/// Build-style versions ("build 0123, 2015-01-02") keep only the build
/// number; versions already starting with "v" are kept; everything else
/// gets a "v" prefix.
pub fn display_version(version: &str) -> String {
    let trimmed = version.trim();
    let lower = trimmed.to_lowercase();

    if lower.starts_with("build") {
        let rest = trimmed.get("build".len()..).unwrap_or("");
        let number = rest.split(',').next().unwrap_or(rest).trim();
        return format!("v{}", number);
    }
    if lower.starts_with('v') {
        return trimmed.to_string();
    }
    format!("v{}", trimmed)
}

/// Main button of a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Install,
    Remove,
    Undo,
}

impl fmt::Display for PrimaryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryAction::Install => f.write_str("install"),
            PrimaryAction::Remove => f.write_str("remove"),
            PrimaryAction::Undo => f.write_str("undo"),
        }
    }
}

/// Which actions a front end should offer for a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Affordances {
    pub primary: PrimaryAction,
    pub primary_enabled: bool,
    /// A pending change can be withdrawn
    pub undo_available: bool,
    pub update_visible: bool,
    pub update_enabled: bool,
}

impl Affordances {
    pub fn compute(
        record: &ContributionRecord,
        state: OperationState,
        listing: &Listing,
        host_revision: u32,
    ) -> Self {
        let flags = record.flags();
        let busy = state.is_active();

        let (primary, primary_enabled) = if flags.is_deletion_flagged() {
            (PrimaryAction::Undo, !busy)
        } else if record.is_installed() {
            (PrimaryAction::Remove, !busy && !flags.is_update_flagged())
        } else {
            let installable =
                !listing.has_list_download_failed() && record.is_compatible(host_revision);
            (PrimaryAction::Install, !busy && installable)
        };

        let updating = state == OperationState::Updating;
        let update_visible = listing.has_update(&record.id) || updating;

        Self {
            primary,
            primary_enabled,
            undo_available: flags.is_removal_pending() && !busy,
            update_visible,
            update_enabled: update_visible && !busy && record.is_compatible(host_revision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrib_core::types::{AvailableContribution, ContributionType, PendingChange};

    fn mode() -> ContributionId {
        ContributionId::new(ContributionType::Mode, "python-mode")
    }

    fn listing_with(record: ContributionRecord) -> Listing {
        Listing::merge(
            vec![record],
            vec![(mode(), AvailableContribution::new("3.1").with_pretty_version("3.1.0"))],
        )
    }

    #[test]
    fn test_notice_priority() {
        let mut record = ContributionRecord::installed(mode(), "3.0");
        assert_eq!(StatusNotice::for_record(&record), StatusNotice::None);

        record.flag_pending(PendingChange::Update).unwrap();
        assert_eq!(StatusNotice::for_record(&record), StatusNotice::UpdateOnRestart);

        record.flag_restart_after_install().unwrap();
        assert_eq!(StatusNotice::for_record(&record), StatusNotice::InstallOnRestart);

        record.flag_pending(PendingChange::Deletion).unwrap();
        assert_eq!(StatusNotice::for_record(&record), StatusNotice::RemoveOnRestart);
        assert_eq!(record_message(&record), "Removed on restart");
    }

    fn record_message(record: &ContributionRecord) -> String {
        StatusNotice::for_record(record).to_string()
    }

    #[test]
    fn test_update_notice() {
        let listing = listing_with(ContributionRecord::installed(mode(), "3.0"));
        assert_eq!(
            update_notice(&listing, &mode()).as_deref(),
            Some("New version (3.1.0) available.")
        );

        let flagged = {
            let mut record = ContributionRecord::installed(mode(), "3.0");
            record.flag_pending(PendingChange::Update).unwrap();
            record
        };
        let listing = listing_with(flagged);
        assert!(update_notice(&listing, &mode()).is_none());
    }

    #[test]
    fn test_display_version() {
        assert_eq!(display_version("build 0123, 2015-01-02"), "v0123");
        assert_eq!(display_version("Build 7"), "v7");
        assert_eq!(display_version("v2.4"), "v2.4");
        assert_eq!(display_version("3.1"), "v3.1");
    }

    #[test]
    fn test_affordances_installed() {
        let record = ContributionRecord::installed(mode(), "3.0");
        let listing = listing_with(record.clone());
        let affordances = Affordances::compute(&record, OperationState::Idle, &listing, 1300);

        assert_eq!(affordances.primary, PrimaryAction::Remove);
        assert!(affordances.primary_enabled);
        assert!(affordances.update_visible);
        assert!(affordances.update_enabled);
        assert!(!affordances.undo_available);
    }

    #[test]
    fn test_affordances_pending_update_blocks_remove() {
        let mut record = ContributionRecord::installed(mode(), "3.0");
        record.flag_pending(PendingChange::Update).unwrap();
        let listing = listing_with(record.clone());
        let affordances = Affordances::compute(&record, OperationState::Idle, &listing, 1300);

        assert_eq!(affordances.primary, PrimaryAction::Remove);
        assert!(!affordances.primary_enabled);
        assert!(affordances.undo_available);
        assert!(!affordances.update_visible);
    }

    #[test]
    fn test_affordances_pending_deletion_offers_undo() {
        let mut record = ContributionRecord::installed(mode(), "3.0");
        record.flag_pending(PendingChange::Deletion).unwrap();
        let listing = listing_with(record.clone());
        let affordances = Affordances::compute(&record, OperationState::Idle, &listing, 1300);

        assert_eq!(affordances.primary, PrimaryAction::Undo);
        assert!(affordances.primary_enabled);
    }

    #[test]
    fn test_affordances_install_gated() {
        let record = ContributionRecord::new(mode(), "3.1").with_revisions(Some(2000), None);
        let listing = listing_with(record.clone());
        let affordances = Affordances::compute(&record, OperationState::Idle, &listing, 1300);
        assert_eq!(affordances.primary, PrimaryAction::Install);
        assert!(!affordances.primary_enabled);

        let compatible = ContributionRecord::new(mode(), "3.1");
        let listing = listing_with(compatible.clone());
        listing.set_list_download_failed(true);
        let affordances = Affordances::compute(&compatible, OperationState::Idle, &listing, 1300);
        assert!(!affordances.primary_enabled);
    }

    #[test]
    fn test_affordances_busy() {
        let record = ContributionRecord::installed(mode(), "3.0");
        let listing = listing_with(record.clone());
        let affordances = Affordances::compute(&record, OperationState::Updating, &listing, 1300);
        assert!(!affordances.primary_enabled);
        assert!(affordances.update_visible);
        assert!(!affordances.update_enabled);
    }
}
