//! Error types for contrib-core

use thiserror::Error;

/// Result type alias using contrib-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for contribution management
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid version string
    #[error("Invalid version format: {version}")]
    InvalidVersion { version: String },

    /// Unknown contribution type name
    #[error("Unknown contribution type: {name}. Valid types: library, mode, tool, examples")]
    InvalidContributionType { name: String },

    /// Flag mutation on a contribution that has no local copy
    #[error("Contribution {id} is not installed")]
    NotInstalled { id: String },

    /// `replace` called with two records of different identity
    #[error("Cannot replace {old} with {new}: identities differ")]
    IdentityMismatch { old: String, new: String },

    /// Contribution not present in the listing
    #[error("Unknown contribution: {id}")]
    UnknownContribution { id: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create an invalid contribution type error
    pub fn invalid_contribution_type(name: impl Into<String>) -> Self {
        Self::InvalidContributionType { name: name.into() }
    }

    /// Create a not installed error
    pub fn not_installed(id: impl ToString) -> Self {
        Self::NotInstalled { id: id.to_string() }
    }

    /// Create an identity mismatch error
    pub fn identity_mismatch(old: impl ToString, new: impl ToString) -> Self {
        Self::IdentityMismatch {
            old: old.to_string(),
            new: new.to_string(),
        }
    }

    /// Create an unknown contribution error
    pub fn unknown_contribution(id: impl ToString) -> Self {
        Self::UnknownContribution { id: id.to_string() }
    }
}
