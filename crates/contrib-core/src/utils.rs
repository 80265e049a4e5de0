//! Shared utility functions for contrib crates

use crate::error::{Error, Result};
use camino::Utf8PathBuf;

/// Home directory holding `.contrib`, as a UTF-8 path.
///
/// `$HOME` wins over the platform lookup so a host can point the manager
/// at another profile; an empty `$HOME` counts as unset.
pub fn home_dir() -> Result<Utf8PathBuf> {
    let home = match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => home.into(),
        _ => dirs::home_dir()
            .ok_or_else(|| Error::invalid_config("Could not determine home directory"))?,
    };

    Utf8PathBuf::from_path_buf(home)
        .map_err(|p| Error::invalid_config(format!("Non UTF-8 home directory: {}", p.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_home_dir_follows_env() {
        let original = env::var_os("HOME");
        env::set_var("HOME", "/srv/host-profile");

        let home = home_dir();

        match original {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
        assert_eq!(home.unwrap(), Utf8PathBuf::from("/srv/host-profile"));
    }

    #[test]
    #[serial]
    fn test_empty_home_falls_back() {
        let original = env::var_os("HOME");
        env::set_var("HOME", "");

        let home = home_dir();

        match original {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
        if let Ok(home) = home {
            assert!(!home.as_str().is_empty());
        }
    }
}
