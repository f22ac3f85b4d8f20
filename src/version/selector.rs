//! Selection of the newest acceptable version for package references

use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use semver::Version;
use tracing::{debug, info, warn};

use crate::config::MAX_CONCURRENT_FETCHES;
use crate::glob::GlobCache;
use crate::source::settings::SettingsProvider;
use crate::version::cache::VersionCache;
use crate::version::error::VersionError;
use crate::version::feed::VersionLister;
use crate::version::semver::{is_prerelease, require_version};
use crate::version::types::{
    PackageUpdate, PackageUpdateSuggestion, UpdateFailure, UpdateSelection,
};

/// Source name that selects every configured package source
pub const ALL_SOURCES: &str = "All";

/// Resolve a source name (or [`ALL_SOURCES`]) to feed URIs.
///
/// A configured source name resolves to its URI; anything else is taken as a URI.
pub fn resolve_sources(
    settings: &dyn SettingsProvider,
    root: &Path,
    source_name_or_all: &str,
) -> std::io::Result<Vec<String>> {
    let sources = settings.package_sources(root)?;

    if source_name_or_all.eq_ignore_ascii_case(ALL_SOURCES) {
        return Ok(sources.into_values().collect());
    }

    let resolved = sources
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(source_name_or_all))
        .map(|(_, uri)| uri.clone())
        .unwrap_or_else(|| source_name_or_all.to_string());

    Ok(vec![resolved])
}

pub struct PackageVersionSelector {
    lister: Arc<dyn VersionLister>,
    sources: Vec<String>,
    globs: GlobCache,
}

impl PackageVersionSelector {
    pub fn new(lister: Arc<dyn VersionLister>, sources: Vec<String>) -> Self {
        Self {
            lister,
            sources,
            globs: GlobCache::new(),
        }
    }

    /// Select new versions for `suggestions`.
    ///
    /// A suggestion's own version glob takes precedence over `global_pattern`.
    /// Packages are processed concurrently; the result keeps the input order and
    /// only lists packages whose version changes. A failing package is recorded
    /// in [`UpdateSelection::failures`] without affecting the others.
    pub async fn select_updates(
        &self,
        suggestions: &[PackageUpdateSuggestion],
        global_pattern: Option<&str>,
        allow_prerelease: bool,
    ) -> UpdateSelection {
        let cache = VersionCache::new();

        let results: Vec<_> = stream::iter(suggestions)
            .map(|suggestion| {
                let cache = &cache;
                async move {
                    let result = self
                        .select_version(cache, suggestion, global_pattern, allow_prerelease)
                        .await;
                    (suggestion, result)
                }
            })
            .buffered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let mut selection = UpdateSelection::default();
        for (suggestion, result) in results {
            match result {
                Ok(new_version) if new_version != suggestion.current_version => {
                    info!(
                        "{}: {} -> {}",
                        suggestion.id, suggestion.current_version, new_version
                    );
                    selection.updates.push(PackageUpdate {
                        id: suggestion.id.clone(),
                        current_version: suggestion.current_version.clone(),
                        new_version,
                    });
                }
                Ok(_) => debug!("{} is up to date", suggestion.id),
                Err(error) => {
                    warn!("Failed to select a version for {}: {}", suggestion.id, error);
                    selection.failures.push(UpdateFailure {
                        id: suggestion.id.clone(),
                        error,
                    });
                }
            }
        }

        selection
    }

    /// The version `suggestion` should move to
    pub async fn select_version(
        &self,
        cache: &VersionCache,
        suggestion: &PackageUpdateSuggestion,
        global_pattern: Option<&str>,
        allow_prerelease: bool,
    ) -> Result<Version, VersionError> {
        let pattern = suggestion
            .version_pattern
            .as_deref()
            .or(global_pattern)
            .filter(|pattern| !pattern.is_empty());

        let glob = pattern
            .map(|pattern| {
                self.globs
                    .get_or_create(pattern, true)
                    .map_err(|source| VersionError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .transpose()?;

        if let Some(glob) = &glob
            && !glob.is_pattern()
        {
            return require_version(glob.original());
        }

        let versions = cache
            .get_or_fetch(&suggestion.id, move || self.fetch_all(&suggestion.id))
            .await?;

        versions
            .iter()
            .find(|version| {
                glob.as_ref()
                    .is_none_or(|glob| glob.is_match(&version.to_string()))
                    && (allow_prerelease || !is_prerelease(version))
            })
            .cloned()
            .ok_or_else(|| VersionError::NotFound {
                package_id: suggestion.id.clone(),
                pattern: pattern.unwrap_or_default().to_string(),
                candidates: versions.to_vec(),
            })
    }

    /// Versions of `package_id` from every source
    async fn fetch_all(&self, package_id: &str) -> Result<Vec<Version>, VersionError> {
        let per_source: Vec<Vec<Version>> = stream::iter(&self.sources)
            .map(|source| self.lister.list_all_versions(package_id, source))
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .try_collect()
            .await?;

        Ok(per_source.into_iter().flatten().collect())
    }
}
