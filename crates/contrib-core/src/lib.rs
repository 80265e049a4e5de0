//! # contrib-core
//!
//! Core library for contribution management providing:
//! - Contribution records, identities and deferred-change flags
//! - Lenient version comparison for update detection
//! - Error types shared across the workspace
//! - Runtime configuration with hierarchical loading

pub mod config;
pub mod error;
pub mod types;
pub mod utils;
pub mod version;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use utils::home_dir;
