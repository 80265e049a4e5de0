//! Runtime configuration types for operational parameters
//!
//! These types control network timeouts, what the host reports about itself,
//! where contributions and state live on disk, and output settings.

use crate::types::ContributionType;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// What the host application reports about itself
    #[serde(default)]
    pub host: HostConfig,

    /// File locations; unset entries fall back to the config directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Display and output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Connect timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Whole-download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Write buffer size used while streaming archives to disk
    #[serde(default = "default_chunk_size")]
    pub download_chunk_size: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            download_chunk_size: default_chunk_size(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    300 // 5 minutes
}
fn default_chunk_size() -> usize {
    64 * 1024
}
fn default_user_agent() -> String {
    format!(
        "contrib/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Host application description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostConfig {
    /// Revision checked against a contribution's min/max revision
    #[serde(default = "default_revision")]
    pub revision: u32,

    /// Contribution types currently loaded into the running host
    #[serde(default)]
    pub loaded_kinds: Vec<ContributionType>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            revision: default_revision(),
            loaded_kinds: vec![ContributionType::Mode],
        }
    }
}

fn default_revision() -> u32 {
    1300
}

impl HostConfig {
    pub fn is_loaded(&self, kind: ContributionType) -> bool {
        self.loaded_kinds.contains(&kind)
    }
}

/// On-disk locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Root holding the per-type contribution folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributions_dir: Option<Utf8PathBuf>,

    /// Persisted listing snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<Utf8PathBuf>,

    /// Lifecycle event journal (JSONL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_file: Option<Utf8PathBuf>,
}

/// Display and output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Enable colored output
    #[serde(default = "default_color_enabled")]
    pub color_enabled: bool,

    /// Enable verbose output by default
    #[serde(default)]
    pub verbose: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color_enabled: default_color_enabled(),
            verbose: false,
        }
    }
}

fn default_color_enabled() -> bool {
    true
}
