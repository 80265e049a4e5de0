//! Type definitions for contributions and runtime configuration

mod contribution;
mod runtime_config;

pub use contribution::*;
pub use runtime_config::*;
