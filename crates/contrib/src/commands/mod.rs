//! Contribution commands
//!
//! Implements the CLI commands:
//! - list: List known contributions with filtering
//! - status: Show state, notices and available actions of one contribution
//! - install / update / remove: Run an operation with a progress bar
//! - undo: Withdraw a change waiting for restart
//! - resolve-pending: Apply changes deferred to restart
//! - log: View the lifecycle event log

pub mod install;
pub mod list;
pub mod log;
mod operation;
pub mod remove;
pub mod resolve_pending;
pub mod status;
pub mod undo;
pub mod update;

use anyhow::{anyhow, bail, Context, Result};
use camino::Utf8PathBuf;
use contrib_core::types::{ContributionId, ContributionType, RuntimeConfig};
use contrib_core::HierarchicalConfigLoader;
use contrib_lifecycle::{
    ArchivePipeline, ConfiguredHost, Controller, EventJournal, Listing, ListingStore,
};
use std::sync::Arc;
use tracing::debug;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config_dir: Option<Utf8PathBuf>,
    pub quiet: bool,
}

/// Loaded configuration and listing for one command invocation
pub(crate) struct Session {
    config: RuntimeConfig,
    loader: HierarchicalConfigLoader,
    store: ListingStore,
    listing: Arc<Listing>,
}

impl Session {
    pub(crate) fn open(global: &GlobalOptions) -> Result<Self> {
        let loader = match &global.config_dir {
            Some(dir) => HierarchicalConfigLoader::with_dir(dir.clone()),
            None => HierarchicalConfigLoader::new()
                .context("Failed to locate configuration directory")?,
        };
        let config = loader
            .load_runtime_config()
            .context("Failed to load runtime configuration")?;

        if !config.display.color_enabled {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        let store = ListingStore::new(loader.state_file(&config));
        let listing = store.load().context("Failed to load listing")?;
        debug!(
            "Loaded {} contributions from {}",
            listing.len(),
            store.path().display()
        );

        Ok(Self {
            config,
            loader,
            store,
            listing: Arc::new(listing),
        })
    }

    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn listing(&self) -> &Arc<Listing> {
        &self.listing
    }

    pub(crate) fn journal(&self) -> EventJournal {
        EventJournal::new(self.loader.journal_file(&self.config))
    }

    pub(crate) fn pipeline(&self) -> Result<ArchivePipeline> {
        ArchivePipeline::new(
            self.loader.contributions_dir(&self.config),
            &self.config.network,
        )
    }

    pub(crate) fn controller(&self) -> Result<Arc<Controller>> {
        let controller = Controller::new(
            Arc::clone(&self.listing),
            Arc::new(self.pipeline()?),
            Arc::new(ConfiguredHost::new(self.config.host.clone())),
        )
        .with_journal(self.journal());
        Ok(Arc::new(controller))
    }

    /// Persist the listing, including any flags set by this command
    pub(crate) fn save(&self) -> Result<()> {
        self.store
            .save(&self.listing)
            .context("Failed to save listing")
    }

    /// Find a contribution by `name` or `type:name`
    pub(crate) fn resolve(
        &self,
        name: &str,
        kind: Option<ContributionType>,
    ) -> Result<ContributionId> {
        resolve_id(&self.listing, name, kind)
    }
}

fn resolve_id(
    listing: &Listing,
    name: &str,
    kind: Option<ContributionType>,
) -> Result<ContributionId> {
    if name.contains(':') {
        let id: ContributionId = name.parse()?;
        if let Some(kind) = kind {
            if kind != id.kind {
                bail!("'{}' is a {}, not a {}", name, id.kind, kind);
            }
        }
        if listing.get(&id).is_none() {
            return Err(anyhow!("Unknown contribution '{}'", id));
        }
        return Ok(id);
    }

    let matches: Vec<ContributionId> = listing
        .snapshot()
        .into_iter()
        .map(|record| record.id)
        .filter(|id| id.name.eq_ignore_ascii_case(name))
        .filter(|id| kind.is_none_or(|kind| id.kind == kind))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!("Unknown contribution '{}'", name)),
        [id] => Ok(id.clone()),
        _ => {
            let candidates: Vec<String> = matches.iter().map(ToString::to_string).collect();
            Err(anyhow!(
                "'{}' matches several contributions ({}). Use --kind or type:name.",
                name,
                candidates.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contrib_core::types::{AvailableContribution, ContributionRecord};

    fn listing() -> Listing {
        Listing::merge(
            vec![ContributionRecord::installed(
                ContributionId::new(ContributionType::Mode, "python-mode"),
                "3.0",
            )],
            vec![
                (
                    ContributionId::new(ContributionType::Library, "sound"),
                    AvailableContribution::new("2.2"),
                ),
                (
                    ContributionId::new(ContributionType::Examples, "sound"),
                    AvailableContribution::new("1.0"),
                ),
            ],
        )
    }

    #[test]
    fn test_resolve_unique_name() {
        let id = resolve_id(&listing(), "Python-Mode", None).unwrap();
        assert_eq!(id.to_string(), "mode:python-mode");
    }

    #[test]
    fn test_resolve_ambiguous_name() {
        let err = resolve_id(&listing(), "sound", None).unwrap_err();
        assert!(err.to_string().contains("several contributions"));

        let id = resolve_id(&listing(), "sound", Some(ContributionType::Examples)).unwrap();
        assert_eq!(id.kind, ContributionType::Examples);
    }

    #[test]
    fn test_resolve_qualified_name() {
        let id = resolve_id(&listing(), "library:sound", None).unwrap();
        assert_eq!(id.kind, ContributionType::Library);

        assert!(resolve_id(&listing(), "library:sound", Some(ContributionType::Mode)).is_err());
        assert!(resolve_id(&listing(), "tool:sound", None).is_err());
    }

    #[test]
    fn test_resolve_unknown_name() {
        let err = resolve_id(&listing(), "video", None).unwrap_err();
        assert_eq!(err.to_string(), "Unknown contribution 'video'");
    }
}
