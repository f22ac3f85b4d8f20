//! Common types for parsers

use serde::Serialize;
use tracing::debug;

use crate::version::semver::parse_version;
use crate::version::types::PackageUpdateSuggestion;

/// Project files that may carry package references
const PROJECT_EXTENSIONS: &[&str] = &[".csproj", ".fsproj", ".vbproj"];
const CENTRAL_PACKAGES_FILE: &str = "Directory.Packages.props";

/// True for MSBuild project files and central package version files
pub fn is_project_file(path: &str) -> bool {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let lower = file_name.to_ascii_lowercase();
    PROJECT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || file_name.eq_ignore_ascii_case(CENTRAL_PACKAGES_FILE)
}

/// A package reference found in a project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReference {
    /// Package id (e.g., "Sundew.Base")
    pub id: String,
    /// Version text as written in the file
    pub version: String,
    /// Version glob from a trailing `<!-- stagefeed: ... -->` comment
    pub version_pattern: Option<String>,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column of the version text (byte offset within line)
    pub column: usize,
}

impl PackageReference {
    /// Convert into an update suggestion; references without a semver version are skipped
    pub fn to_suggestion(&self) -> Option<PackageUpdateSuggestion> {
        let Some(version) = parse_version(&self.version) else {
            debug!(
                "Skipping {}: '{}' is not a semantic version",
                self.id, self.version
            );
            return None;
        };

        let suggestion = PackageUpdateSuggestion::new(&self.id, version);
        Some(match &self.version_pattern {
            Some(pattern) => suggestion.with_pattern(pattern),
            None => suggestion,
        })
    }
}
