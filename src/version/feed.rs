//! Capabilities for querying package feeds

#[cfg(test)]
use mockall::automock;

use semver::Version;

use crate::version::error::RegistryError;

/// A package at a specific version on a specific source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub id: String,
    pub version: Version,
    pub source: String,
}

impl PackageIdentity {
    pub fn new(id: &str, version: Version, source: &str) -> Self {
        Self {
            id: id.to_string(),
            version,
            source: source.to_string(),
        }
    }
}

/// Trait for checking whether a package version is already published
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ExistenceChecker: Send + Sync {
    /// Returns true when `package_id` at `version` exists on `source`
    async fn exists(
        &self,
        package_id: &str,
        version: &Version,
        source: &str,
    ) -> Result<bool, RegistryError>;
}

/// Trait for listing the published versions of a package
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionLister: Send + Sync {
    /// Fetches all versions of a package known to `source`
    ///
    /// # Returns
    /// * `Ok(Vec<Version>)` - Versions in no particular order, empty for unknown packages
    /// * `Err(RegistryError)` - If the source could not be queried
    async fn list_all_versions(
        &self,
        package_id: &str,
        source: &str,
    ) -> Result<Vec<Version>, RegistryError>;
}

/// True when `source` refers to the local filesystem rather than an HTTP feed
pub fn is_local_source(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    !(lower.starts_with("http://") || lower.starts_with("https://"))
}
