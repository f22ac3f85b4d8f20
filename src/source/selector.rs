//! Resolution of a stage name to the source a package is pushed to
//!
//! Precedence:
//! 1. no stage: the local source
//! 2. `default` / `default-stable`: the configured default push source
//! 3. `local-stable`: the local source as a release source
//! 4. the first of production, integration, development whose expression matches
//! 5. otherwise the local source, if allowed

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::source::error::SourceError;
use crate::source::settings::SettingsProvider;
use crate::source::stage::{StageDefinition, StageFallbacks, StageKind, StageMatch};

const DEFAULT_STAGE: &str = "default";
const DEFAULT_STABLE_STAGE: &str = "default-stable";
const LOCAL_STABLE_STAGE: &str = "local-stable";

/// The resolved source for a push or restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSource {
    /// Name of the stage that produced this source
    pub stage: String,
    pub feed: String,
    pub symbols_feed: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(skip_serializing)]
    pub symbols_api_key: Option<String>,
    pub prerelease_prefix: String,
    pub prerelease_postfix: String,
    pub prerelease_format: Option<String>,
    /// Feeds of higher-priority stages that may also be searched
    pub fallback_feeds: Vec<String>,
    pub is_release: bool,
    pub is_local_fallback: bool,
    pub is_publish_enabled: bool,
}

impl SelectedSource {
    /// A source pointing at the local feed
    pub fn local(
        feed: &str,
        prefix: &str,
        is_release: bool,
        is_local_fallback: bool,
        is_publish_enabled: bool,
    ) -> Self {
        Self {
            stage: "local".to_string(),
            feed: feed.to_string(),
            symbols_feed: None,
            api_key: None,
            symbols_api_key: None,
            prerelease_prefix: prefix.to_string(),
            prerelease_postfix: String::new(),
            prerelease_format: None,
            fallback_feeds: Vec::new(),
            is_release,
            is_local_fallback,
            is_publish_enabled,
        }
    }

    /// All feeds to search when reading packages of this stage, own feed first
    pub fn search_feeds(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.feed.as_str()).chain(self.fallback_feeds.iter().map(String::as_str))
    }
}

/// Inputs for a source selection
#[derive(Debug, Clone, Default)]
pub struct SelectionRequest {
    pub stage: Option<String>,
    pub production: Option<String>,
    pub integration: Option<String>,
    pub development: Option<String>,
    pub local_source: String,
    pub fallback_prerelease_format: Option<String>,
    pub fallback_api_key: Option<String>,
    pub fallback_symbols_api_key: Option<String>,
    /// Prerelease prefix for local and `default` pushes
    pub local_stage: String,
    pub prerelease_prefix: Option<String>,
    pub prerelease_postfix: Option<String>,
    /// Directory the default push source is looked up from
    pub root_directory: PathBuf,
    pub allow_local_source: bool,
    pub is_publish_enabled: bool,
}

pub struct SourceSelector {
    settings: Arc<dyn SettingsProvider>,
}

impl SourceSelector {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self { settings }
    }

    pub fn select(&self, request: &SelectionRequest) -> Result<SelectedSource, SourceError> {
        let stage = request
            .stage
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let Some(stage) = stage else {
            debug!("No stage requested, using local source");
            return local_fallback(request, true);
        };

        let lower = stage.to_ascii_lowercase();
        if lower.starts_with(DEFAULT_STAGE) {
            return self.default_push(request, lower == DEFAULT_STABLE_STAGE);
        }

        if lower == LOCAL_STABLE_STAGE {
            return non_empty(SelectedSource::local(
                &request.local_source,
                "",
                true,
                false,
                request.is_publish_enabled,
            ));
        }

        for definition in parse_stages(request)? {
            if let Some(stage_match) = definition.matches(stage) {
                info!("Stage '{}' matched {}", stage, definition.kind.as_str());
                return from_stage(definition, stage_match, request);
            }
        }

        debug!("Stage '{}' matched no configured stage", stage);
        local_fallback(request, request.allow_local_source)
    }

    fn default_push(
        &self,
        request: &SelectionRequest,
        is_release: bool,
    ) -> Result<SelectedSource, SourceError> {
        let feed = self
            .settings
            .default_push_source(&request.root_directory)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SourceError::Configuration(format!(
                    "No default push source is configured for {:?}",
                    request.root_directory
                ))
            })?;

        let prefix = if is_release { "" } else { request.local_stage.as_str() };

        Ok(SelectedSource {
            stage: DEFAULT_STAGE.to_string(),
            api_key: request.fallback_api_key.clone(),
            symbols_api_key: request.fallback_symbols_api_key.clone(),
            prerelease_format: request.fallback_prerelease_format.clone(),
            ..SelectedSource::local(&feed, prefix, is_release, false, request.is_publish_enabled)
        })
    }
}

/// Parse the configured stages in priority order, accumulating fallback feeds
fn parse_stages(request: &SelectionRequest) -> Result<Vec<StageDefinition>, SourceError> {
    let fallbacks = StageFallbacks {
        api_key: request.fallback_api_key.as_deref(),
        symbols_api_key: request.fallback_symbols_api_key.as_deref(),
        prerelease_format: request.fallback_prerelease_format.as_deref(),
        is_publish_enabled: request.is_publish_enabled,
    };

    let configured = [
        (StageKind::Production, request.production.as_deref()),
        (StageKind::Integration, request.integration.as_deref()),
        (StageKind::Development, request.development.as_deref()),
    ];

    let mut definitions = Vec::new();
    let mut fallback_feeds: Vec<String> = Vec::new();

    for (kind, config) in configured {
        let Some(config) = config.filter(|c| !c.trim().is_empty()) else {
            continue;
        };

        let definition = StageDefinition::parse(kind, config, fallback_feeds.clone(), &fallbacks)?;
        if !definition.feed.is_empty() {
            fallback_feeds.push(definition.feed.clone());
        }
        definitions.push(definition);
    }

    Ok(definitions)
}

fn from_stage(
    definition: StageDefinition,
    stage_match: StageMatch,
    request: &SelectionRequest,
) -> Result<SelectedSource, SourceError> {
    let prerelease_prefix = stage_match
        .prefix
        .or_else(|| request.prerelease_prefix.clone())
        .unwrap_or(definition.default_prefix);
    let prerelease_postfix = stage_match
        .postfix
        .or_else(|| request.prerelease_postfix.clone())
        .unwrap_or(definition.default_postfix);

    non_empty(SelectedSource {
        stage: definition.kind.as_str().to_string(),
        feed: definition.feed,
        symbols_feed: definition.symbols_feed,
        api_key: definition.api_key,
        symbols_api_key: definition.symbols_api_key,
        prerelease_prefix,
        prerelease_postfix,
        prerelease_format: definition.prerelease_format,
        fallback_feeds: definition.fallback_feeds,
        is_release: definition.is_release,
        is_local_fallback: false,
        is_publish_enabled: definition.is_publish_enabled,
    })
}

fn local_fallback(
    request: &SelectionRequest,
    is_local_fallback: bool,
) -> Result<SelectedSource, SourceError> {
    let source = SelectedSource {
        prerelease_format: request.fallback_prerelease_format.clone(),
        ..SelectedSource::local(
            &request.local_source,
            &request.local_stage,
            false,
            is_local_fallback,
            request.allow_local_source && request.is_publish_enabled,
        )
    };
    non_empty(source)
}

fn non_empty(source: SelectedSource) -> Result<SelectedSource, SourceError> {
    if source.feed.trim().is_empty() {
        return Err(SourceError::Configuration(format!(
            "Stage '{}' resolved to no package source",
            source.stage
        )));
    }
    Ok(source)
}
