//! YAML persistence of the listing between runs

use crate::listing::Listing;
use anyhow::{Context, Result};
use contrib_core::types::{AvailableContribution, ContributionId, ContributionRecord};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Remote view of one contribution as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AvailableEntry {
    pub id: ContributionId,
    #[serde(flatten)]
    pub available: AvailableContribution,
}

/// On-disk shape of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingSnapshot {
    #[serde(default)]
    pub records: Vec<ContributionRecord>,

    #[serde(default)]
    pub available: Vec<AvailableEntry>,

    #[serde(default)]
    pub list_download_failed: bool,
}

impl ListingSnapshot {
    pub fn capture(listing: &Listing) -> Self {
        Self {
            records: listing.snapshot(),
            available: listing
                .available_entries()
                .into_iter()
                .map(|(id, available)| AvailableEntry { id, available })
                .collect(),
            list_download_failed: listing.has_list_download_failed(),
        }
    }

    pub fn into_listing(self) -> Result<Listing> {
        for record in &self.records {
            record
                .validate()
                .with_context(|| format!("Invalid record for {}", record.id))?;
        }
        let listing = Listing::merge(
            self.records,
            self.available
                .into_iter()
                .map(|entry| (entry.id, entry.available)),
        );
        listing.set_list_download_failed(self.list_download_failed);
        Ok(listing)
    }
}

pub struct ListingStore {
    path: PathBuf,
}

impl ListingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored listing; an absent file yields an empty listing
    pub fn load(&self) -> Result<Listing> {
        if !self.path.exists() {
            debug!("No listing at {}, starting empty", self.path.display());
            return Ok(Listing::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let snapshot: ListingSnapshot = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        snapshot.into_listing()
    }

    /// Write the listing through a temporary file so readers never see a
    /// half-written snapshot
    pub fn save(&self, listing: &Listing) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let yaml = serde_yaml_ng::to_string(&ListingSnapshot::capture(listing))
            .context("Failed to serialize listing")?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .context("Failed to create temporary listing file")?;
        temp.write_all(yaml.as_bytes())
            .context("Failed to write listing")?;
        temp.persist(&self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("Saved {} records to {}", listing.len(), self.path.display());
        Ok(())
    }
}
