//! Common types for package updates

use semver::Version;
use serde::Serialize;

use crate::version::error::VersionError;

/// A package reference that may be updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdateSuggestion {
    pub id: String,
    pub current_version: Version,
    /// Version glob captured from the project file, overrides the global glob
    pub version_pattern: Option<String>,
}

impl PackageUpdateSuggestion {
    pub fn new(id: &str, current_version: Version) -> Self {
        Self {
            id: id.to_string(),
            current_version,
            version_pattern: None,
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.version_pattern = Some(pattern.to_string());
        self
    }
}

/// A package whose version changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpdate {
    pub id: String,
    #[serde(serialize_with = "serialize_display")]
    pub current_version: Version,
    #[serde(serialize_with = "serialize_display")]
    pub new_version: Version,
}

/// A package whose new version could not be determined
#[derive(Debug)]
pub struct UpdateFailure {
    pub id: String,
    pub error: VersionError,
}

/// Outcome of selecting updates for a batch of packages
#[derive(Debug, Default)]
pub struct UpdateSelection {
    pub updates: Vec<PackageUpdate>,
    pub failures: Vec<UpdateFailure>,
}

impl UpdateSelection {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn serialize_display<S: serde::Serializer>(
    version: &Version,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(version)
}
