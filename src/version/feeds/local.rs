//! Local filesystem feed
//!
//! Packages are laid out as `<source>/<id>/<id>.<major>.<minor>.<patch>[-<label>].nupkg`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use semver::Version;
use tracing::debug;

use crate::version::error::RegistryError;
use crate::version::feed::{ExistenceChecker, VersionLister};
use crate::version::semver::parse_version;

const PACKAGE_EXTENSION: &str = ".nupkg";

/// Feed implementation for a directory of packages
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFeed;

impl LocalFeed {
    pub fn new() -> Self {
        Self
    }

    /// Path of the package file for `package_id` at `version` below `source`
    pub fn package_path(source: &str, package_id: &str, version: &Version) -> PathBuf {
        source_root(source)
            .join(package_id)
            .join(format!("{}.{}{}", package_id, file_version(version), PACKAGE_EXTENSION))
    }
}

fn source_root(source: &str) -> &Path {
    Path::new(source.strip_prefix("file://").unwrap_or(source))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn file_version(version: &Version) -> String {
    if version.pre.is_empty() {
        format!("{}.{}.{}", version.major, version.minor, version.patch)
    } else {
        format!(
            "{}.{}.{}-{}",
            version.major, version.minor, version.patch, version.pre
        )
    }
}

#[async_trait::async_trait]
impl ExistenceChecker for LocalFeed {
    async fn exists(
        &self,
        package_id: &str,
        version: &Version,
        source: &str,
    ) -> Result<bool, RegistryError> {
        let path = Self::package_path(source, package_id, version);
        let exists = tokio::fs::try_exists(&path).await?;
        debug!("Probed {:?}: exists={}", path, exists);
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl VersionLister for LocalFeed {
    async fn list_all_versions(
        &self,
        package_id: &str,
        source: &str,
    ) -> Result<Vec<Version>, RegistryError> {
        let directory = source_root(source).join(package_id);
        let mut entries = match tokio::fs::read_dir(&directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No package directory at {:?}", directory);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}.", package_id);
        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let Some(version_text) = strip_prefix_ignore_case(&file_name, &prefix)
                .and_then(|rest| rest.strip_suffix(PACKAGE_EXTENSION))
            else {
                continue;
            };

            match parse_version(version_text) {
                Some(version) => versions.push(version),
                None => debug!("Skipping unparseable package file {}", file_name),
            }
        }

        Ok(versions)
    }
}
