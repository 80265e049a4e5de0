//! Test constants for contrib-lifecycle tests

#![allow(dead_code)]

use std::time::Duration;

/// Upper bound for waiting on a terminal report
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Revision reported by the mock host
pub const TEST_HOST_REVISION: u32 = 1300;

pub const SOUND_LIBRARY: &str = "sound";
pub const PYTHON_MODE: &str = "python-mode";
pub const COLOR_TOOL: &str = "color-picker";

pub const SOUND_URL: &str = "https://contrib.example.org/sound-2.2.tar.gz";
pub const PYTHON_MODE_URL: &str = "https://contrib.example.org/python-mode-3.1.tar.gz";
pub const COLOR_TOOL_URL: &str = "https://contrib.example.org/color-picker-1.1.tar.gz";
