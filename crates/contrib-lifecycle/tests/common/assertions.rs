//! Assertion helpers for contribution lifecycle testing

#![allow(dead_code)]

use contrib_core::types::{ContributionFlags, ContributionId, ContributionRecord, PendingChange};
use contrib_lifecycle::{Listing, Outcome, TerminalReport};

/// Assert the listing record's installed bit and flags
pub fn assert_record(listing: &Listing, id: &ContributionId, installed: bool, flags: ContributionFlags) {
    let record = listing
        .get(id)
        .unwrap_or_else(|| panic!("{} missing from listing", id));
    assert_eq!(
        record.is_installed(),
        installed,
        "{} installed bit mismatch",
        id
    );
    assert_eq!(record.flags(), flags, "{} flags mismatch", id);
}

/// Assert a record is installed and carries no flags
pub fn assert_installed_clean(listing: &Listing, id: &ContributionId) {
    assert_record(listing, id, true, ContributionFlags::default());
}

/// Assert a record carries exactly the given pending change
pub fn assert_pending(listing: &Listing, id: &ContributionId, change: PendingChange) {
    let record = listing.get(id).expect("record present");
    assert!(record.is_installed(), "{} should still be installed", id);
    assert_eq!(record.flags().pending, Some(change), "{} pending mismatch", id);
}

/// Assert the record is identical to a snapshot taken before an operation
pub fn assert_unchanged(listing: &Listing, before: &ContributionRecord) {
    let after = listing.get(&before.id).expect("record present");
    assert_eq!(after.is_installed(), before.is_installed());
    assert_eq!(after.flags(), before.flags());
    assert_eq!(after.version, before.version);
}

pub fn assert_finished(report: &TerminalReport) {
    assert_eq!(
        report.outcome,
        Outcome::Finished,
        "{} expected to finish, got {}",
        report.id,
        report.outcome
    );
}

pub fn assert_failed_with(report: &TerminalReport, fragment: &str) {
    match &report.outcome {
        Outcome::Failed(message) => assert!(
            message.contains(fragment),
            "error '{}' does not mention '{}'",
            message,
            fragment
        ),
        other => panic!("{} expected to fail, got {}", report.id, other),
    }
}
