use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Time-related constants
// =============================================================================

/// How long `await` waits for a pushed package by default (5 minutes)
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Delay between existence checks while waiting for a package (5 seconds)
pub const PUBLISH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Timeout for a single HTTP request to a feed (30 seconds)
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Concurrency
// =============================================================================

/// Upper bound on in-flight feed requests during version selection
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Name of the per-repository configuration file
pub const CONFIG_FILE_NAME: &str = "stagefeed.json";

/// Stage used as prerelease prefix for local builds
pub const DEFAULT_LOCAL_STAGE: &str = "local";

/// Repository configuration, read from `stagefeed.json`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct StagefeedConfig {
    pub sources: SourcesConfig,
    pub prerelease: PrereleaseConfig,
    pub publish: PublishConfig,
    /// Version glob applied to package references without their own
    pub version_pattern: Option<String>,
    /// Source name, URI or `All` used when selecting package updates
    pub update_source: String,
}

impl Default for StagefeedConfig {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            prerelease: PrereleaseConfig::default(),
            publish: PublishConfig::default(),
            version_pattern: None,
            update_source: "All".to_string(),
        }
    }
}

/// Stage source configuration strings and fallbacks
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SourcesConfig {
    pub production: Option<String>,
    pub integration: Option<String>,
    pub development: Option<String>,
    /// Feed for builds that match no stage; defaults to a directory under the data dir
    pub local_source: Option<String>,
    pub api_key: Option<String>,
    pub symbols_api_key: Option<String>,
    pub allow_local_source: bool,
}

/// Prerelease label settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PrereleaseConfig {
    pub format: Option<String>,
    pub prefix: Option<String>,
    pub postfix: Option<String>,
    pub local_stage: String,
    /// One of `IncrementPatch`, `NoChange`, `AutomaticLatestPatch`, `AutomaticLatestRevision`
    pub versioning_mode: String,
}

impl Default for PrereleaseConfig {
    fn default() -> Self {
        Self {
            format: None,
            prefix: None,
            postfix: None,
            local_stage: DEFAULT_LOCAL_STAGE.to_string(),
            versioning_mode: "IncrementPatch".to_string(),
        }
    }
}

/// Publishing settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PublishConfig {
    pub enabled: bool,
    /// Await timeout in milliseconds
    pub timeout: u64,
    /// Await poll interval in milliseconds
    pub poll_interval: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: DEFAULT_PUBLISH_TIMEOUT.as_millis() as u64,
            poll_interval: PUBLISH_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Error type for loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StagefeedConfig {
    /// Load `stagefeed.json` from `root`, falling back to defaults when it is absent
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Json { path, source })
    }

    /// Configured local source, or the default one under the data directory
    pub fn local_source(&self) -> String {
        self.sources
            .local_source
            .clone()
            .unwrap_or_else(|| default_local_source().to_string_lossy().to_string())
    }
}

/// Returns the path to the data directory for stagefeed.
/// Uses $XDG_DATA_HOME/stagefeed if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/stagefeed,
/// or ./stagefeed if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path of the local package feed used when no stage matches.
pub fn default_local_source() -> PathBuf {
    data_dir().join("packages")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("stagefeed.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("stagefeed")
}
