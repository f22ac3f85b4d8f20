//! NuGet v3 feed implementation
//!
//! Uses the flat container (`PackageBaseAddress/3.0.0`) resource:
//! - `{base}/{id}/index.json` lists all versions
//! - `{base}/{id}/{version}/{id}.{version}.nupkg` is the package itself
//!
//! A source ending in `index.json` is treated as a service index and the
//! flat container address is looked up from it.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use semver::Version;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FETCH_TIMEOUT;
use crate::version::error::RegistryError;
use crate::version::feed::{ExistenceChecker, VersionLister};
use crate::version::semver::parse_version;

const PACKAGE_BASE_ADDRESS_TYPE: &str = "PackageBaseAddress/3.0.0";

/// Response from a NuGet v3 service index
#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    resource_type: String,
}

/// Response from the flat container version listing
#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

/// Feed implementation for NuGet v3 HTTP sources
pub struct NuGetFeed {
    client: reqwest::Client,
    base_addresses: Mutex<HashMap<String, String>>,
}

impl NuGetFeed {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("stagefeed")
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_addresses: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the flat container address for `source`
    async fn base_address(&self, source: &str) -> Result<String, RegistryError> {
        let source = source.trim_end_matches('/');
        if !source.ends_with("index.json") {
            return Ok(source.to_string());
        }

        let cached = self
            .base_addresses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let response = self.client.get(source).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("Service index returned status {}: {}", status, source);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let index: ServiceIndex = response.json().await.map_err(|e| {
            warn!("Failed to parse service index {}: {}", source, e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let base = index
            .resources
            .into_iter()
            .find(|r| r.resource_type == PACKAGE_BASE_ADDRESS_TYPE)
            .map(|r| r.id.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                RegistryError::InvalidSource(format!(
                    "{} does not provide {}",
                    source, PACKAGE_BASE_ADDRESS_TYPE
                ))
            })?;

        debug!("Resolved flat container for {}: {}", source, base);
        self.base_addresses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), base.clone());

        Ok(base)
    }
}

impl Default for NuGetFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase normalized version as used in flat container URLs
fn normalized_version(version: &Version) -> String {
    let mut normalized = format!("{}.{}.{}", version.major, version.minor, version.patch);
    if !version.pre.is_empty() {
        normalized.push('-');
        normalized.push_str(version.pre.as_str());
    }
    normalized.to_lowercase()
}

#[async_trait::async_trait]
impl ExistenceChecker for NuGetFeed {
    async fn exists(
        &self,
        package_id: &str,
        version: &Version,
        source: &str,
    ) -> Result<bool, RegistryError> {
        let base = self.base_address(source).await?;
        let id = package_id.to_lowercase();
        let version = normalized_version(version);
        let url = format!("{}/{}/{}/{}.{}.nupkg", base, id, version, id, version);

        let response = self.client.head(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        if !status.is_success() {
            warn!("Feed returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        Ok(true)
    }
}

#[async_trait::async_trait]
impl VersionLister for NuGetFeed {
    async fn list_all_versions(
        &self,
        package_id: &str,
        source: &str,
    ) -> Result<Vec<Version>, RegistryError> {
        let base = self.base_address(source).await?;
        let url = format!("{}/{}/index.json", base, package_id.to_lowercase());

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("{} is not published on {}", package_id, source);
            return Ok(Vec::new());
        }

        if !status.is_success() {
            warn!("Feed returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let index: VersionIndex = response.json().await.map_err(|e| {
            warn!("Failed to parse version listing: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(index
            .versions
            .iter()
            .filter_map(|v| parse_version(v))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn list_all_versions_reads_flat_container_listing() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/flat/sundew.base/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"versions": ["1.0.0", "1.5.0-pre", "2.0.0", "1.0.0.1"]}"#)
            .create_async()
            .await;

        let feed = NuGetFeed::new();
        let source = format!("{}/flat", server.url());
        let result = feed.list_all_versions("Sundew.Base", &source).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            vec![
                Version::new(1, 0, 0),
                Version::parse("1.5.0-pre").unwrap(),
                Version::new(2, 0, 0)
            ]
        );
    }

    #[tokio::test]
    async fn list_all_versions_returns_empty_for_unknown_package() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/unknown/index.json")
            .with_status(404)
            .create_async()
            .await;

        let feed = NuGetFeed::new();
        let result = feed.list_all_versions("Unknown", &server.url()).await.unwrap();

        mock.assert_async().await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn list_all_versions_fails_on_server_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/broken/index.json")
            .with_status(500)
            .create_async()
            .await;

        let feed = NuGetFeed::new();
        let result = feed.list_all_versions("Broken", &server.url()).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn service_index_is_resolved_once_per_source() {
        let mut server = Server::new_async().await;

        let index = server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"version": "3.0.0", "resources": [
                    {{"@id": "{0}/search", "@type": "SearchQueryService"}},
                    {{"@id": "{0}/flat/", "@type": "PackageBaseAddress/3.0.0"}}
                ]}}"#,
                server.url()
            ))
            .expect(1)
            .create_async()
            .await;

        let listing = server
            .mock("GET", "/flat/sundew.base/index.json")
            .with_status(200)
            .with_body(r#"{"versions": ["1.0.0"]}"#)
            .expect(2)
            .create_async()
            .await;

        let feed = NuGetFeed::new();
        let source = format!("{}/v3/index.json", server.url());
        feed.list_all_versions("Sundew.Base", &source).await.unwrap();
        let result = feed.list_all_versions("Sundew.Base", &source).await.unwrap();

        index.assert_async().await;
        listing.assert_async().await;
        assert_eq!(result, vec![Version::new(1, 0, 0)]);
    }

    #[tokio::test]
    async fn service_index_without_flat_container_is_invalid_source() {
        let mut server = Server::new_async().await;

        let _index = server
            .mock("GET", "/v3/index.json")
            .with_status(200)
            .with_body(r#"{"resources": []}"#)
            .create_async()
            .await;

        let feed = NuGetFeed::new();
        let source = format!("{}/v3/index.json", server.url());
        let result = feed.list_all_versions("Sundew.Base", &source).await;

        assert!(matches!(result, Err(RegistryError::InvalidSource(_))));
    }

    #[tokio::test]
    async fn exists_checks_package_download_url() {
        let mut server = Server::new_async().await;

        let found = server
            .mock("HEAD", "/sundew.base/1.2.3-beta/sundew.base.1.2.3-beta.nupkg")
            .with_status(200)
            .create_async()
            .await;
        let missing = server
            .mock("HEAD", "/sundew.base/1.2.4/sundew.base.1.2.4.nupkg")
            .with_status(404)
            .create_async()
            .await;

        let feed = NuGetFeed::new();
        let exists = feed
            .exists(
                "Sundew.Base",
                &Version::parse("1.2.3-Beta").unwrap(),
                &server.url(),
            )
            .await
            .unwrap();
        let not_exists = feed
            .exists("Sundew.Base", &Version::new(1, 2, 4), &server.url())
            .await
            .unwrap();

        found.assert_async().await;
        missing.assert_async().await;
        assert!(exists);
        assert!(!not_exists);
    }
}
