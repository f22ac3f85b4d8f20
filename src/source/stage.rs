//! Per-stage source configuration
//!
//! Format: `<stageRegex>|[<apiKey>@]<feedUri>[{<prereleaseFormat>}][|[<symbolsApiKey>@]<symbolsFeedUri>]`
//!
//! - `||` inside the stage regex is a literal `|` (regex alternation)
//! - without any separator the whole string is the feed and the stage can
//!   only be reached as a fallback, never by name
//! - the stage regex may capture `Prefix` and `Postfix` named groups that
//!   override the prerelease prefix and postfix
//!
//! Examples:
//! - `^(?:prod|release)$` is written `^(?:prod||release)$|https://api.nuget.org/v3/index.json`
//! - `^ci-(?<Prefix>\w+)$|key@https://feed/index.json{{Prefix}.{DateTime}}|https://symbols`

use regex::{Regex, RegexBuilder};

use crate::source::error::SourceError;

/// The configurable stages, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Production,
    Integration,
    Development,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Production => "production",
            StageKind::Integration => "integration",
            StageKind::Development => "development",
        }
    }

    /// Packages pushed to production carry release versions
    pub fn is_release(&self) -> bool {
        matches!(self, StageKind::Production)
    }

    /// Prerelease prefix used when neither the stage match nor the caller provides one
    pub fn default_prefix(&self) -> &'static str {
        match self {
            StageKind::Production => "",
            StageKind::Integration => "ci",
            StageKind::Development => "dev",
        }
    }
}

/// Result of matching a stage name against a stage expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageMatch {
    pub prefix: Option<String>,
    pub postfix: Option<String>,
}

/// Case-insensitive stage expression with optional `Prefix`/`Postfix` groups.
///
/// Groups that did not participate or captured nothing are reported as absent.
#[derive(Debug, Clone)]
pub struct StageMatcher {
    regex: Regex,
}

impl StageMatcher {
    pub fn new(expression: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(expression)
            .case_insensitive(true)
            .build()?;
        Ok(Self { regex })
    }

    pub fn matches(&self, stage: &str) -> Option<StageMatch> {
        let captures = self.regex.captures(stage)?;
        let group = |name: &str| {
            captures
                .name(name)
                .map(|m| m.as_str())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        Some(StageMatch {
            prefix: group("Prefix"),
            postfix: group("Postfix"),
        })
    }
}

/// Values used when a stage configuration omits them
#[derive(Debug, Clone, Copy, Default)]
pub struct StageFallbacks<'a> {
    pub api_key: Option<&'a str>,
    pub symbols_api_key: Option<&'a str>,
    pub prerelease_format: Option<&'a str>,
    pub is_publish_enabled: bool,
}

/// A parsed stage configuration
#[derive(Debug, Clone)]
pub struct StageDefinition {
    pub kind: StageKind,
    /// The raw configuration string
    pub config: String,
    pub matcher: Option<StageMatcher>,
    pub feed: String,
    pub symbols_feed: Option<String>,
    pub api_key: Option<String>,
    pub symbols_api_key: Option<String>,
    pub prerelease_format: Option<String>,
    pub default_prefix: String,
    pub default_postfix: String,
    pub is_release: bool,
    /// Feeds of higher-priority stages that consumers of this stage may also search
    pub fallback_feeds: Vec<String>,
    pub is_publish_enabled: bool,
}

impl StageDefinition {
    pub fn parse(
        kind: StageKind,
        config: &str,
        fallback_feeds: Vec<String>,
        fallbacks: &StageFallbacks<'_>,
    ) -> Result<Self, SourceError> {
        let (expression, remainder) = split_stage_expression(config.trim());
        let matcher = expression
            .filter(|e| !e.is_empty())
            .map(|e| StageMatcher::new(&e))
            .transpose()
            .map_err(|source| SourceError::InvalidStageExpression {
                stage: kind.as_str(),
                source,
            })?;

        let (feed_part, symbols_part) = match remainder.split_once('|') {
            Some((feed, symbols)) => (feed, Some(symbols)),
            None => (remainder, None),
        };

        let (feed_part, prerelease_format) = split_prerelease_format(feed_part);
        let (api_key, feed) = split_api_key(feed_part);
        let (symbols_api_key, symbols_feed) = match symbols_part {
            Some(part) => split_api_key(part),
            None => (None, ""),
        };

        Ok(Self {
            kind,
            config: config.to_string(),
            matcher,
            feed: feed.trim().to_string(),
            symbols_feed: Some(symbols_feed.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            api_key: api_key.or(fallbacks.api_key).map(str::to_string),
            symbols_api_key: symbols_api_key
                .or(fallbacks.symbols_api_key)
                .map(str::to_string),
            prerelease_format: prerelease_format
                .or(fallbacks.prerelease_format)
                .map(str::to_string),
            default_prefix: kind.default_prefix().to_string(),
            default_postfix: String::new(),
            is_release: kind.is_release(),
            fallback_feeds,
            is_publish_enabled: fallbacks.is_publish_enabled,
        })
    }

    /// Match `stage` against this definition's expression
    pub fn matches(&self, stage: &str) -> Option<StageMatch> {
        self.matcher.as_ref()?.matches(stage)
    }
}

/// Split off the stage expression at the first single `|`, unescaping `||`.
fn split_stage_expression(config: &str) -> (Option<String>, &str) {
    let mut expression = String::new();
    let mut chars = config.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c != '|' {
            expression.push(c);
            continue;
        }

        if matches!(chars.peek(), Some((_, '|'))) {
            chars.next();
            expression.push('|');
            continue;
        }

        return (Some(expression), &config[index + 1..]);
    }

    (None, config)
}

/// Split `feed{format}` into the feed and the prerelease format.
fn split_prerelease_format(part: &str) -> (&str, Option<&str>) {
    let part = part.trim();
    match part.find('{') {
        Some(start) if part.ends_with('}') => (&part[..start], Some(&part[start + 1..part.len() - 1])),
        _ => (part, None),
    }
}

/// Split `apiKey@uri` into the key and the uri; `user@host` inside a URI is not a key.
fn split_api_key(part: &str) -> (Option<&str>, &str) {
    let part = part.trim();
    match part.split_once('@') {
        Some((key, uri)) if !key.is_empty() && !key.contains([':', '/', '\\']) => (Some(key), uri),
        _ => (None, part),
    }
}
