//! Per-invocation cache of known package versions
//!
//! Each package id is fetched at most once per cache. Concurrent requests for
//! the same id wait on the single in-flight fetch; requests for different ids
//! never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use semver::Version;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::version::error::VersionError;
use crate::version::semver::sort_descending;

type Entry = Arc<OnceCell<Arc<Vec<Version>>>>;

#[derive(Debug, Default)]
pub struct VersionCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Package ids are case-insensitive
    fn key(package_id: &str) -> String {
        package_id.to_lowercase()
    }

    fn entry(&self, package_id: &str) -> Entry {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(Self::key(package_id)).or_default())
    }

    /// Versions of `package_id`, newest first, fetching them on first use.
    ///
    /// A failed fetch leaves the entry empty so a later call may try again.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        package_id: &str,
        fetch: F,
    ) -> Result<Arc<Vec<Version>>, VersionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Version>, VersionError>>,
    {
        let entry = self.entry(package_id);
        let versions = entry
            .get_or_try_init(move || async move {
                let versions = fetch().await?;
                debug!("Caching {} versions of {}", versions.len(), package_id);
                Ok::<_, VersionError>(Arc::new(sort_descending(versions)))
            })
            .await?;

        Ok(Arc::clone(versions))
    }

    /// Cached versions of `package_id`, if already fetched
    pub fn get(&self, package_id: &str) -> Option<Arc<Vec<Version>>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&Self::key(package_id))
            .and_then(|entry| entry.get().cloned())
    }
}
