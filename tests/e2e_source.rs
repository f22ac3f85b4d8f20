//! Stage source selection and push version E2E tests

mod helper;

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use semver::Version;
use tempfile::TempDir;

use helper::{MockFeed, write_local_packages, write_nuget_config};
use stagefeed::source::{NuGetConfigSettings, SelectionRequest, SourceError, SourceSelector};
use stagefeed::version::automatic::AutomaticPackageVersioner;
use stagefeed::version::feeds::LocalFeed;
use stagefeed::version::prerelease::{FixedClock, PrereleaseVersioner, PrereleaseVersioningMode};

fn request(root: &Path, stage: &str) -> SelectionRequest {
    SelectionRequest {
        stage: Some(stage.to_string()),
        production: Some("^(?:master||main)$|prod-key@https://api.nuget.org/v3/index.json".to_string()),
        integration: Some(
            r"^release/(?<Postfix>[\d.]+)$|https://ci.example/v3/index.json{{Prefix}-{DateTime}.{Postfix}}|https://ci.example/symbols"
                .to_string(),
        ),
        development: Some(r"^feature/(?<Prefix>\w+)$|https://dev.example/v3/index.json".to_string()),
        local_source: root.join("local").to_string_lossy().to_string(),
        local_stage: "local".to_string(),
        root_directory: root.to_path_buf(),
        allow_local_source: true,
        is_publish_enabled: true,
        ..SelectionRequest::default()
    }
}

fn selector() -> SourceSelector {
    SourceSelector::new(Arc::new(NuGetConfigSettings::with_user_config(None)))
}

fn versioner() -> PrereleaseVersioner {
    let instant = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
    PrereleaseVersioner::new(Arc::new(FixedClock(instant)))
}

#[test]
fn production_stage_is_a_release_source() {
    let dir = TempDir::new().unwrap();

    let source = selector().select(&request(dir.path(), "MAIN")).unwrap();

    assert_eq!(source.stage, "production");
    assert_eq!(source.feed, "https://api.nuget.org/v3/index.json");
    assert_eq!(source.api_key.as_deref(), Some("prod-key"));
    assert!(source.is_release);
    assert!(source.fallback_feeds.is_empty());
}

#[test]
fn integration_stage_formats_prerelease_with_captured_postfix() {
    let dir = TempDir::new().unwrap();

    let source = selector()
        .select(&request(dir.path(), "release/4.1"))
        .unwrap();
    let version = versioner()
        .format(
            &Version::new(4, 1, 0),
            PrereleaseVersioningMode::IncrementPatch,
            &source,
        )
        .unwrap();

    assert_eq!(source.symbols_feed.as_deref(), Some("https://ci.example/symbols"));
    assert_eq!(
        source.search_feeds().collect::<Vec<_>>(),
        vec![
            "https://ci.example/v3/index.json",
            "https://api.nuget.org/v3/index.json"
        ]
    );
    assert_eq!(version.to_string(), "4.1.1-ci-20240305-070809.4.1");
}

#[test]
fn development_stage_uses_captured_prefix_and_inherits_fallbacks() {
    let dir = TempDir::new().unwrap();

    let source = selector()
        .select(&request(dir.path(), "feature/login"))
        .unwrap();
    let version = versioner()
        .format(&Version::new(1, 0, 0), PrereleaseVersioningMode::NoChange, &source)
        .unwrap();

    assert_eq!(source.stage, "development");
    assert_eq!(
        source.fallback_feeds,
        vec![
            "https://api.nuget.org/v3/index.json",
            "https://ci.example/v3/index.json"
        ]
    );
    assert_eq!(version.to_string(), "1.0.0-login20240305-070809");
}

#[test]
fn unknown_stage_falls_back_to_local_source() {
    let dir = TempDir::new().unwrap();

    let source = selector().select(&request(dir.path(), "hotfix")).unwrap();

    assert_eq!(source.feed, dir.path().join("local").to_string_lossy());
    assert!(source.is_local_fallback);
    assert!(source.is_publish_enabled);
    assert_eq!(source.prerelease_prefix, "local");
}

#[test]
fn default_stage_reads_push_source_from_nuget_config() {
    let dir = TempDir::new().unwrap();
    write_nuget_config(dir.path(), &[], Some("https://push.example/v3/index.json"));

    let prerelease = selector().select(&request(dir.path(), "default")).unwrap();
    let release = selector()
        .select(&request(dir.path(), "Default-Stable"))
        .unwrap();

    assert_eq!(prerelease.feed, "https://push.example/v3/index.json");
    assert!(!prerelease.is_release);
    assert_eq!(prerelease.prerelease_prefix, "local");
    assert_eq!(release.feed, "https://push.example/v3/index.json");
    assert!(release.is_release);
    assert_eq!(release.prerelease_prefix, "");
}

#[test]
fn default_stage_without_push_source_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();

    let result = selector().select(&request(dir.path(), "default"));

    assert!(matches!(result, Err(SourceError::Configuration(_))));
}

#[tokio::test]
async fn release_version_skips_patch_already_on_local_feed() {
    let dir = TempDir::new().unwrap();
    let source = selector()
        .select(&request(dir.path(), "local-stable"))
        .unwrap();
    write_local_packages(Path::new(&source.feed), "Sundew.Base", &["2.0.0"]);
    let versioner = AutomaticPackageVersioner::new(
        Arc::new(LocalFeed::new()),
        Arc::new(MockFeed::new()),
    );

    let taken = versioner
        .resolve("Sundew.Base", &Version::new(2, 0, 0), &source.feed)
        .await
        .unwrap();
    let free = versioner
        .resolve("Sundew.Base", &Version::new(2, 1, 0), &source.feed)
        .await
        .unwrap();

    assert!(source.is_release);
    assert_eq!(taken, Version::new(2, 0, 1));
    assert_eq!(free, Version::new(2, 1, 0));
}

#[tokio::test]
async fn release_version_uses_remote_checker_for_http_feeds() {
    let dir = TempDir::new().unwrap();
    let source = selector().select(&request(dir.path(), "master")).unwrap();
    let remote = MockFeed::new().with_versions(&source.feed, "Sundew.Base", vec!["3.0.0"]);
    let versioner = AutomaticPackageVersioner::new(Arc::new(LocalFeed::new()), Arc::new(remote));

    let result = versioner
        .resolve("Sundew.Base", &Version::new(3, 0, 0), &source.feed)
        .await
        .unwrap();

    assert_eq!(result, Version::new(3, 0, 1));
}
