//! Common test utilities for contrib-lifecycle
//!
//! This module provides shared test infrastructure including:
//! - Constants and configuration
//! - Listing builders and a ready-made controller harness
//! - Mock pipeline, host and observer implementations
//! - Archive fixtures and a mock download server
//! - Assertion helpers for lifecycle testing

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod assertions;
pub mod builders;
pub mod constants;
pub mod fixtures;
pub mod mocks;

pub use assertions::*;
pub use builders::*;
pub use constants::*;
pub use fixtures::*;
pub use mocks::*;
