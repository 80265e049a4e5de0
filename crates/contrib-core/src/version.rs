//! Version comparison for update detection
//!
//! Contribution feeds are loose about versions: some publish semver
//! (`1.2.3`), some two-part versions (`3.1`), some bare build numbers
//! (`14`), and some prefix a `v`. Everything is normalized to
//! [`semver::Version`] before comparing.

use semver::Version;
use std::cmp::Ordering;

/// Parse a version string leniently.
///
/// Accepts an optional `v` prefix and pads missing minor/patch parts with
/// zeros. Returns `None` when the string cannot be interpreted.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if trimmed.is_empty() {
        return None;
    }

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    // Pad "3" and "3.1" to full triples; pre-release/build suffixes only
    // survive when the core already has three parts.
    let (core, suffix) = match trimmed.find(['-', '+']) {
        Some(idx) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, suffix),
        2 => format!("{}.0{}", core, suffix),
        _ => return None,
    };

    Version::parse(&padded).ok()
}

/// Compare two version strings. `None` when either side is not a version.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let left = parse_lenient(a)?;
    let right = parse_lenient(b)?;
    Some(left.cmp(&right))
}

/// True when `candidate` is strictly newer than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare_versions(candidate, current) == Some(Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_semver() {
        let v = parse_lenient("1.2.3").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
    }

    #[test]
    fn test_parse_pads_short_versions() {
        assert_eq!(parse_lenient("3.1").unwrap(), Version::new(3, 1, 0));
        assert_eq!(parse_lenient("14").unwrap(), Version::new(14, 0, 0));
    }

    #[test]
    fn test_parse_strips_prefix() {
        assert_eq!(parse_lenient("v2.0").unwrap(), Version::new(2, 0, 0));
        assert_eq!(parse_lenient("V4.5.6").unwrap(), Version::new(4, 5, 6));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_lenient("").is_none());
        assert!(parse_lenient("build 0123, beta").is_none());
        assert!(parse_lenient("1.2.3.4").is_none());
    }

    #[test]
    fn test_short_version_with_prerelease() {
        let v = parse_lenient("3.1-beta").unwrap();
        assert_eq!(v.major, 3);
        assert_eq!(v.minor, 1);
        assert!(!v.pre.is_empty());
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("3.1", "3.0"));
        assert!(is_newer("10", "9"));
        assert!(!is_newer("3.0", "3.0.0"));
        assert!(!is_newer("2.9", "3.0"));
        assert!(!is_newer("unknown", "1.0"));
    }

    #[test]
    fn test_prerelease_is_older_than_release() {
        assert!(is_newer("1.0.0", "1.0.0-rc.1"));
    }
}
