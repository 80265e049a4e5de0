//! Shared registry of every known contribution
//!
//! The listing merges the local view (what is installed) with the remote
//! view (what the feed offers) and answers update queries. It is shared
//! between the controller, the restart resolver and the front end through
//! an `Arc<Listing>`.

use contrib_core::types::{AvailableContribution, ContributionId, ContributionRecord, ContributionType};
use contrib_core::version::is_newer;
use contrib_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::debug;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Notification sent to listing subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingChange {
    /// A record was inserted or overwritten
    Registered(ContributionId),
    /// A record was swapped through [`Listing::replace`]
    Replaced(ContributionId),
}

#[derive(Default)]
struct Entries {
    records: HashMap<ContributionId, ContributionRecord>,
    available: HashMap<ContributionId, AvailableContribution>,
}

/// Process-wide table of contributions
pub struct Listing {
    entries: RwLock<Entries>,
    list_download_failed: AtomicBool,
    changes: broadcast::Sender<ListingChange>,
}

impl Default for Listing {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.read();
        f.debug_struct("Listing")
            .field("records", &entries.records.len())
            .field("available", &entries.available.len())
            .field("list_download_failed", &self.has_list_download_failed())
            .finish()
    }
}

impl Listing {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(Entries::default()),
            list_download_failed: AtomicBool::new(false),
            changes,
        }
    }

    /// Build the merged view from installed records and the remote feed.
    ///
    /// Installed records are kept as they are; remote entries without a
    /// local record become uninstalled records carrying the remote metadata.
    pub fn merge<L, R>(local: L, remote: R) -> Self
    where
        L: IntoIterator<Item = ContributionRecord>,
        R: IntoIterator<Item = (ContributionId, AvailableContribution)>,
    {
        let listing = Self::new();
        {
            let mut entries = listing.write();
            for record in local {
                entries.records.insert(record.id.clone(), record);
            }
            for (id, available) in remote {
                entries
                    .records
                    .entry(id.clone())
                    .or_insert_with(|| available.to_record(id.clone()));
                entries.available.insert(id, available);
            }
        }
        listing
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: ListingChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }

    /// Insert or overwrite a record by identity
    pub fn register(&self, record: ContributionRecord) {
        let id = record.id.clone();
        self.write().records.insert(id.clone(), record);
        self.notify(ListingChange::Registered(id));
    }

    /// Insert the remote view for an identity. A record is created for
    /// identities the listing has not seen yet.
    pub fn register_available(&self, id: ContributionId, available: AvailableContribution) {
        {
            let mut entries = self.write();
            entries
                .records
                .entry(id.clone())
                .or_insert_with(|| available.to_record(id.clone()));
            entries.available.insert(id.clone(), available);
        }
        self.notify(ListingChange::Registered(id));
    }

    /// Swap one record for another of the same identity.
    ///
    /// Readers observe either the old or the new record, never neither.
    pub fn replace(&self, old: &ContributionRecord, new: ContributionRecord) -> Result<()> {
        if old.id != new.id {
            return Err(Error::identity_mismatch(&old.id, &new.id));
        }
        let id = new.id.clone();
        {
            let mut entries = self.write();
            debug!(contribution = %id, installed = new.is_installed(), "Replacing listing entry");
            entries.records.insert(id.clone(), new);
        }
        self.notify(ListingChange::Replaced(id));
        Ok(())
    }

    pub fn get(&self, id: &ContributionId) -> Option<ContributionRecord> {
        self.read().records.get(id).cloned()
    }

    pub fn available(&self, id: &ContributionId) -> Option<AvailableContribution> {
        self.read().available.get(id).cloned()
    }

    /// Remote entries, sorted like [`Listing::snapshot`]
    pub fn available_entries(&self) -> Vec<(ContributionId, AvailableContribution)> {
        let mut entries: Vec<_> = self
            .read()
            .available
            .iter()
            .map(|(id, available)| (id.clone(), available.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| sort_key(a).cmp(&sort_key(b)));
        entries
    }

    /// True when the feed offers a strictly newer version of an installed
    /// contribution that carries no pending change
    pub fn has_update(&self, id: &ContributionId) -> bool {
        let entries = self.read();
        let Some(record) = entries.records.get(id) else {
            return false;
        };
        if !record.is_installed() || record.flags().is_removal_pending() {
            return false;
        }
        entries
            .available
            .get(id)
            .is_some_and(|available| is_newer(&available.version, &record.version))
    }

    /// Version string of the latest available release
    pub fn latest_version(&self, id: &ContributionId) -> Option<String> {
        self.read().available.get(id).map(|available| {
            available
                .pretty_version
                .clone()
                .unwrap_or_else(|| available.version.clone())
        })
    }

    /// All records ordered by type, then case-insensitive name
    pub fn snapshot(&self) -> Vec<ContributionRecord> {
        let mut records: Vec<_> = self.read().records.values().cloned().collect();
        records.sort_by(|a, b| sort_key(&a.id).cmp(&sort_key(&b.id)));
        records
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    pub fn has_list_download_failed(&self) -> bool {
        self.list_download_failed.load(Ordering::SeqCst)
    }

    pub fn set_list_download_failed(&self, failed: bool) {
        self.list_download_failed.store(failed, Ordering::SeqCst);
    }

    /// Whether any contribution of `kind` still needs a restart to settle
    pub fn restart_pending(&self, kind: ContributionType) -> bool {
        self.read()
            .records
            .values()
            .any(|record| record.kind() == kind && !record.flags().is_empty())
    }

    /// Whether any contribution at all needs a restart to settle
    pub fn any_restart_pending(&self) -> bool {
        self.read()
            .records
            .values()
            .any(|record| !record.flags().is_empty())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListingChange> {
        self.changes.subscribe()
    }
}

fn sort_key(id: &ContributionId) -> (ContributionType, String) {
    (id.kind, id.name.to_lowercase())
}
