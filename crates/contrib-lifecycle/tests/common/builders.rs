//! Listing builders and a ready-made controller harness

#![allow(dead_code)]

use super::constants::*;
use super::mocks::{MockHost, RecordingObserver, ScriptedPipeline};
use contrib_core::types::{
    AvailableContribution, ContributionId, ContributionRecord, ContributionType,
};
use contrib_lifecycle::{Controller, Listing};
use std::sync::Arc;

pub fn library(name: &str) -> ContributionId {
    ContributionId::new(ContributionType::Library, name)
}

pub fn mode(name: &str) -> ContributionId {
    ContributionId::new(ContributionType::Mode, name)
}

pub fn tool(name: &str) -> ContributionId {
    ContributionId::new(ContributionType::Tool, name)
}

/// Fluent builder for listings
#[derive(Default)]
pub struct ListingBuilder {
    local: Vec<ContributionRecord>,
    remote: Vec<(ContributionId, AvailableContribution)>,
    list_download_failed: bool,
}

impl ListingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an installed record
    pub fn installed(mut self, id: ContributionId, version: &str) -> Self {
        self.local.push(ContributionRecord::installed(id, version));
        self
    }

    /// Add an arbitrary local record
    pub fn record(mut self, record: ContributionRecord) -> Self {
        self.local.push(record);
        self
    }

    /// Add a remote entry with a download link
    pub fn available(mut self, id: ContributionId, version: &str, url: &str) -> Self {
        self.remote
            .push((id, AvailableContribution::new(version).with_download_url(url)));
        self
    }

    /// Add a remote entry
    pub fn available_entry(mut self, id: ContributionId, available: AvailableContribution) -> Self {
        self.remote.push((id, available));
        self
    }

    pub fn list_download_failed(mut self) -> Self {
        self.list_download_failed = true;
        self
    }

    pub fn build(self) -> Arc<Listing> {
        let listing = Listing::merge(self.local, self.remote);
        listing.set_list_download_failed(self.list_download_failed);
        Arc::new(listing)
    }
}

/// The standard catalogue: an uninstalled library, an installed mode with
/// an update, and an installed tool
pub fn catalogue() -> ListingBuilder {
    ListingBuilder::new()
        .available(library(SOUND_LIBRARY), "2.2", SOUND_URL)
        .installed(mode(PYTHON_MODE), "3.0")
        .available(mode(PYTHON_MODE), "3.1", PYTHON_MODE_URL)
        .installed(tool(COLOR_TOOL), "1.0")
        .available(tool(COLOR_TOOL), "1.0", COLOR_TOOL_URL)
}

/// Controller wired to mocks, with one observer per known contribution
pub struct Harness {
    pub controller: Arc<Controller>,
    pub listing: Arc<Listing>,
    pub pipeline: Arc<ScriptedPipeline>,
    pub host: Arc<MockHost>,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(listing: Arc<Listing>) -> Self {
        Self::with_host(listing, MockHost::new())
    }

    pub fn with_host(listing: Arc<Listing>, host: Arc<MockHost>) -> Self {
        let pipeline = ScriptedPipeline::new();
        let observer = RecordingObserver::new();
        let controller = Arc::new(Controller::new(
            Arc::clone(&listing),
            pipeline.clone(),
            host.clone(),
        ));
        for record in listing.snapshot() {
            controller.subscribe(&record.id, observer.clone());
        }

        Self {
            controller,
            listing,
            pipeline,
            host,
            observer,
        }
    }

    pub fn record(&self, id: &ContributionId) -> ContributionRecord {
        self.listing.get(id).expect("record present")
    }
}
