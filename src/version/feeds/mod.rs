//! Feed implementations for querying package versions

pub mod local;
pub mod nuget;

use std::sync::Arc;

use semver::Version;

pub use local::LocalFeed;
pub use nuget::NuGetFeed;

use crate::version::error::RegistryError;
use crate::version::feed::{ExistenceChecker, VersionLister, is_local_source};

/// Dispatches each request to the local or the remote feed by source kind
pub struct RoutedFeed {
    local: Arc<LocalFeed>,
    remote: Arc<NuGetFeed>,
}

impl RoutedFeed {
    pub fn new(local: Arc<LocalFeed>, remote: Arc<NuGetFeed>) -> Self {
        Self { local, remote }
    }
}

impl Default for RoutedFeed {
    fn default() -> Self {
        Self::new(Arc::new(LocalFeed::new()), Arc::new(NuGetFeed::new()))
    }
}

#[async_trait::async_trait]
impl ExistenceChecker for RoutedFeed {
    async fn exists(
        &self,
        package_id: &str,
        version: &Version,
        source: &str,
    ) -> Result<bool, RegistryError> {
        if is_local_source(source) {
            self.local.exists(package_id, version, source).await
        } else {
            self.remote.exists(package_id, version, source).await
        }
    }
}

#[async_trait::async_trait]
impl VersionLister for RoutedFeed {
    async fn list_all_versions(
        &self,
        package_id: &str,
        source: &str,
    ) -> Result<Vec<Version>, RegistryError> {
        if is_local_source(source) {
            self.local.list_all_versions(package_id, source).await
        } else {
            self.remote.list_all_versions(package_id, source).await
        }
    }
}
