//! Contribution records, identities and deferred-change flags

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of installable unit managed by the host
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContributionType {
    Library,
    Mode,
    Tool,
    Examples,
}

impl ContributionType {
    /// All contribution types, in listing order
    pub const ALL: [ContributionType; 4] = [
        ContributionType::Library,
        ContributionType::Mode,
        ContributionType::Tool,
        ContributionType::Examples,
    ];

    /// Modes and tools are loaded into the running host, so changes to
    /// them only take effect after a restart.
    pub fn requires_restart(self) -> bool {
        matches!(self, ContributionType::Mode | ContributionType::Tool)
    }

    /// Directory under the contributions root holding this type
    pub fn folder_name(self) -> &'static str {
        match self {
            ContributionType::Library => "libraries",
            ContributionType::Mode => "modes",
            ContributionType::Tool => "tools",
            ContributionType::Examples => "examples",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContributionType::Library => "library",
            ContributionType::Mode => "mode",
            ContributionType::Tool => "tool",
            ContributionType::Examples => "examples",
        }
    }
}

impl fmt::Display for ContributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContributionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "library" | "libraries" => Ok(ContributionType::Library),
            "mode" | "modes" => Ok(ContributionType::Mode),
            "tool" | "tools" => Ok(ContributionType::Tool),
            "examples" | "example" => Ok(ContributionType::Examples),
            _ => Err(Error::invalid_contribution_type(s)),
        }
    }
}

/// Stable identity of a contribution: its type plus its name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContributionId {
    pub kind: ContributionType,
    pub name: String,
}

impl ContributionId {
    pub fn new(kind: ContributionType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ContributionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

impl FromStr for ContributionId {
    type Err = Error;

    /// Parses `kind:name`, e.g. `mode:python-mode`
    fn from_str(s: &str) -> Result<Self> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| Error::unknown_contribution(s))?;
        if name.is_empty() {
            return Err(Error::unknown_contribution(s));
        }
        Ok(Self::new(kind.parse()?, name))
    }
}

/// Deferred change applied at the next host start.
///
/// Deletion and update are mutually exclusive, which the enum enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingChange {
    /// Remove the local copy on restart
    Deletion,
    /// Remove the local copy on restart, then install the latest version
    Update,
}

impl fmt::Display for PendingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingChange::Deletion => f.write_str("pending deletion"),
            PendingChange::Update => f.write_str("pending update"),
        }
    }
}

/// Flags carried by an installed contribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContributionFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingChange>,

    /// A restart-required type was just installed and is not active yet
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub restart_after_install: bool,
}

impl ContributionFlags {
    pub fn is_empty(&self) -> bool {
        self.pending.is_none() && !self.restart_after_install
    }

    pub fn is_deletion_flagged(&self) -> bool {
        self.pending == Some(PendingChange::Deletion)
    }

    pub fn is_update_flagged(&self) -> bool {
        self.pending == Some(PendingChange::Update)
    }

    /// Either pending change removes the current local copy at restart
    pub fn is_removal_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Remote view of a contribution, as published by the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AvailableContribution {
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretty_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    /// Archive location; absent when no build exists for this platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_revision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_revision: Option<u32>,
}

impl AvailableContribution {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            pretty_version: None,
            last_updated: None,
            download_url: None,
            min_revision: None,
            max_revision: None,
        }
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    pub fn with_pretty_version(mut self, pretty: impl Into<String>) -> Self {
        self.pretty_version = Some(pretty.into());
        self
    }

    pub fn with_revisions(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_revision = min;
        self.max_revision = max;
        self
    }

    pub fn with_last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }

    /// Build an uninstalled record describing this available version
    pub fn to_record(&self, id: ContributionId) -> ContributionRecord {
        let mut record = ContributionRecord::new(id, self.version.clone());
        record.apply_available(self);
        record
    }
}

/// Descriptor of one contribution in the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContributionRecord {
    pub id: ContributionId,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pretty_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    installed: bool,

    #[serde(default)]
    flags: ContributionFlags,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_revision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_revision: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,

    /// One-line description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,

    /// Project home page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl ContributionRecord {
    /// Create an uninstalled record with no flags
    pub fn new(id: ContributionId, version: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
            pretty_version: None,
            last_updated: None,
            installed: false,
            flags: ContributionFlags::default(),
            min_revision: None,
            max_revision: None,
            authors: None,
            sentence: None,
            url: None,
            download_url: None,
        }
    }

    /// Create a record for a local copy found on disk
    pub fn installed(id: ContributionId, version: impl Into<String>) -> Self {
        let mut record = Self::new(id, version);
        record.installed = true;
        record
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    pub fn with_revisions(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min_revision = min;
        self.max_revision = max;
        self
    }

    pub fn with_pretty_version(mut self, pretty: impl Into<String>) -> Self {
        self.pretty_version = Some(pretty.into());
        self
    }

    pub fn kind(&self) -> ContributionType {
        self.id.kind
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    pub fn flags(&self) -> ContributionFlags {
        self.flags
    }

    /// Whether the contribution works with the given host revision.
    /// Missing bounds are open.
    pub fn is_compatible(&self, revision: u32) -> bool {
        self.min_revision.is_none_or(|min| revision >= min)
            && self.max_revision.is_none_or(|max| revision <= max)
    }

    /// Set a deferred change. Only installed contributions can carry one;
    /// a new change replaces any previous one.
    pub fn flag_pending(&mut self, change: PendingChange) -> Result<()> {
        if !self.installed {
            return Err(Error::not_installed(&self.id));
        }
        self.flags.pending = Some(change);
        Ok(())
    }

    /// Clear the deferred change, returning what was set
    pub fn clear_pending(&mut self) -> Option<PendingChange> {
        self.flags.pending.take()
    }

    pub fn flag_restart_after_install(&mut self) -> Result<()> {
        if !self.installed {
            return Err(Error::not_installed(&self.id));
        }
        self.flags.restart_after_install = true;
        Ok(())
    }

    pub fn clear_restart_after_install(&mut self) {
        self.flags.restart_after_install = false;
    }

    /// Record a fresh local copy at `version`; any previous flags are dropped
    pub fn mark_installed(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.installed = true;
        self.flags = ContributionFlags::default();
    }

    /// Record that no local copy exists anymore. Flags cannot outlive the
    /// local copy, so they are cleared too.
    pub fn mark_uninstalled(&mut self) {
        self.installed = false;
        self.flags = ContributionFlags::default();
    }

    /// Copy the remote metadata onto this record
    pub fn apply_available(&mut self, available: &AvailableContribution) {
        self.version = available.version.clone();
        self.pretty_version = available.pretty_version.clone();
        self.last_updated = available.last_updated;
        self.download_url = available.download_url.clone();
        self.min_revision = available.min_revision;
        self.max_revision = available.max_revision;
    }

    /// Check the flags-imply-installed invariant, e.g. after deserializing
    pub fn validate(&self) -> Result<()> {
        if !self.installed && !self.flags.is_empty() {
            return Err(Error::not_installed(&self.id));
        }
        Ok(())
    }
}
