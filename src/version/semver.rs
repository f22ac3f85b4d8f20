use semver::{BuildMetadata, Prerelease, Version};

use crate::version::error::VersionError;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "1.2.3-beta" -> Version(1, 2, 3, pre: beta)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let (core, label) = match version.split_once(['-', '+']) {
        Some((core, _)) => (core, &version[core.len()..]),
        None => (version, ""),
    };

    let parts: Vec<&str> = core.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0{}", parts[0], label),
        2 => format!("{}.{}.0{}", parts[0], parts[1], label),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Like [`parse_version`] but reports the offending text
pub fn require_version(version: &str) -> Result<Version, VersionError> {
    parse_version(version).ok_or_else(|| VersionError::InvalidVersion(version.to_string()))
}

pub fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// The same major.minor with the given patch, without label or metadata
pub fn with_patch(version: &Version, patch: u64) -> Version {
    Version {
        major: version.major,
        minor: version.minor,
        patch,
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
    }
}

/// Deduplicate and sort versions from newest to oldest
pub fn sort_descending(versions: impl IntoIterator<Item = Version>) -> Vec<Version> {
    let mut versions: Vec<Version> = versions.into_iter().collect();
    versions.sort_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some("1.0.0"))]
    #[case("1.2", Some("1.2.0"))]
    #[case("1.2.3", Some("1.2.3"))]
    #[case("1.2-beta", Some("1.2.0-beta"))]
    #[case(" 2.0.0-pre.1 ", Some("2.0.0-pre.1"))]
    #[case("1.2.3.4", None)]
    #[case("invalid", None)]
    #[case("", None)]
    fn parse_version_normalizes_partial_versions(
        #[case] input: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            parse_version(input),
            expected.map(|v| Version::parse(v).unwrap())
        );
    }

    #[test]
    fn require_version_reports_invalid_text() {
        assert!(matches!(
            require_version("not-a-version"),
            Err(VersionError::InvalidVersion(text)) if text == "not-a-version"
        ));
    }

    #[test]
    fn sort_descending_orders_stable_above_prerelease_and_dedups() {
        let versions = ["1.0.0", "1.5.0-pre", "2.0.0", "1.5.0", "1.0.0"]
            .iter()
            .map(|v| Version::parse(v).unwrap());

        let sorted: Vec<String> = sort_descending(versions)
            .iter()
            .map(|v| v.to_string())
            .collect();

        assert_eq!(sorted, vec!["2.0.0", "1.5.0", "1.5.0-pre", "1.0.0"]);
    }

    #[test]
    fn with_patch_drops_prerelease_label() {
        let version = Version::parse("1.2.3-beta+sha").unwrap();
        assert_eq!(with_patch(&version, 4), Version::new(1, 2, 4));
    }
}
