//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Runtime config (~/.contrib/contrib-runtime.yaml)
//! 3. Environment variables (CONTRIB_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::{ContributionType, RuntimeConfig};
use crate::utils::home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use tracing::debug;

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

const RUNTIME_FILE: &str = "contrib-runtime.yaml";
const STATE_FILE: &str = "listing.yaml";
const JOURNAL_FILE: &str = "lifecycle.jsonl";
const CONTRIBUTIONS_DIR: &str = "contributions";

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration and state files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a loader rooted at ~/.contrib, creating it when missing
    pub fn new() -> Result<Self> {
        let config_dir = Self::default_config_dir()?;
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    fn default_config_dir() -> Result<Utf8PathBuf> {
        Ok(home_dir()?.join(".contrib"))
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        let runtime_config_path = self.config_dir.join(RUNTIME_FILE);
        if runtime_config_path.exists() {
            debug!("Loading runtime config from {}", runtime_config_path);
            let file_config = self.load_yaml_file::<RuntimeConfig>(&runtime_config_path)?;
            config = Self::merge_runtime_config(config, file_config);
        }

        self.apply_env_overrides(config)
    }

    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })
    }

    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Overlay sections replace base sections; unset paths keep the base value
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        let mut paths = base.paths;
        if overlay.paths.contributions_dir.is_some() {
            paths.contributions_dir = overlay.paths.contributions_dir;
        }
        if overlay.paths.state_file.is_some() {
            paths.state_file = overlay.paths.state_file;
        }
        if overlay.paths.journal_file.is_some() {
            paths.journal_file = overlay.paths.journal_file;
        }

        RuntimeConfig {
            network: overlay.network,
            host: overlay.host,
            paths,
            display: overlay.display,
        }
    }

    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("CONTRIB_HTTP_TIMEOUT_SECS") {
            config.network.http_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("CONTRIB_HTTP_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONTRIB_DOWNLOAD_TIMEOUT_SECS") {
            config.network.download_timeout_secs = val.parse().map_err(|_| {
                Error::invalid_config("CONTRIB_DOWNLOAD_TIMEOUT_SECS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONTRIB_DOWNLOAD_CHUNK_SIZE") {
            config.network.download_chunk_size = val.parse().map_err(|_| {
                Error::invalid_config("CONTRIB_DOWNLOAD_CHUNK_SIZE must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONTRIB_HOST_REVISION") {
            config.host.revision = val.parse().map_err(|_| {
                Error::invalid_config("CONTRIB_HOST_REVISION must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONTRIB_LOADED_KINDS") {
            config.host.loaded_kinds = val
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<ContributionType>())
                .collect::<Result<Vec<_>>>()?;
        }

        if let Ok(val) = env::var("CONTRIB_ROOT") {
            config.paths.contributions_dir = Some(Utf8PathBuf::from(val));
        }

        if let Ok(val) = env::var("CONTRIB_VERBOSE") {
            config.display.verbose = val.parse().unwrap_or(false);
        }

        if let Ok(val) = env::var("CONTRIB_NO_COLOR") {
            config.display.color_enabled = !val.parse().unwrap_or(false);
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Root of the per-type contribution folders
    pub fn contributions_dir(&self, config: &RuntimeConfig) -> Utf8PathBuf {
        config
            .paths
            .contributions_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join(CONTRIBUTIONS_DIR))
    }

    /// Listing snapshot file
    pub fn state_file(&self, config: &RuntimeConfig) -> Utf8PathBuf {
        config
            .paths
            .state_file
            .clone()
            .unwrap_or_else(|| self.config_dir.join(STATE_FILE))
    }

    /// Lifecycle journal file
    pub fn journal_file(&self, config: &RuntimeConfig) -> Utf8PathBuf {
        config
            .paths
            .journal_file
            .clone()
            .unwrap_or_else(|| self.config_dir.join(JOURNAL_FILE))
    }
}
