//! Feed test utilities

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use semver::Version;

use stagefeed::version::error::RegistryError;
use stagefeed::version::feed::{ExistenceChecker, VersionLister};

/// In-memory feed keyed by (source, lowercase package id)
#[derive(Default)]
pub struct MockFeed {
    versions: Mutex<HashMap<(String, String), Vec<Version>>>,
    list_calls: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(self, source: &str, package: &str, versions: Vec<&str>) -> Self {
        self.publish_all(source, package, versions);
        self
    }

    pub fn publish_all(&self, source: &str, package: &str, versions: Vec<&str>) {
        let mut map = self.versions.lock().unwrap();
        map.entry((source.to_string(), package.to_lowercase()))
            .or_default()
            .extend(versions.into_iter().map(|v| Version::parse(v).unwrap()));
    }

    /// Number of listing requests served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionLister for MockFeed {
    async fn list_all_versions(
        &self,
        package_id: &str,
        source: &str,
    ) -> Result<Vec<Version>, RegistryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let map = self.versions.lock().unwrap();
        Ok(map
            .get(&(source.to_string(), package_id.to_lowercase()))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ExistenceChecker for MockFeed {
    async fn exists(
        &self,
        package_id: &str,
        version: &Version,
        source: &str,
    ) -> Result<bool, RegistryError> {
        let map = self.versions.lock().unwrap();
        Ok(map
            .get(&(source.to_string(), package_id.to_lowercase()))
            .is_some_and(|versions| versions.contains(version)))
    }
}

/// Lay out `id.version.nupkg` files the way a local feed stores them
pub fn write_local_packages(feed: &Path, package: &str, versions: &[&str]) {
    let directory = feed.join(package);
    std::fs::create_dir_all(&directory).unwrap();
    for version in versions {
        std::fs::write(directory.join(format!("{package}.{version}.nupkg")), b"").unwrap();
    }
}

/// Write a NuGet.Config with the given package sources and default push source
pub fn write_nuget_config(directory: &Path, sources: &[(&str, &str)], default_push: Option<&str>) {
    let sources: String = sources
        .iter()
        .map(|(name, uri)| format!(r#"    <add key="{name}" value="{uri}" />"#) + "\n")
        .collect();
    let config = default_push
        .map(|push| format!(r#"  <config><add key="defaultPushSource" value="{push}" /></config>"#))
        .unwrap_or_default();

    std::fs::create_dir_all(directory).unwrap();
    std::fs::write(
        directory.join("NuGet.Config"),
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<configuration>\n  <packageSources>\n    <clear />\n{sources}  </packageSources>\n{config}\n</configuration>\n"
        ),
    )
    .unwrap();
}
