//! Prerelease version formatting
//!
//! A prerelease label is rendered from the selected source's format, where
//! `{Prefix}`, `{DateTime}` and `{Postfix}` are substituted. The timestamp is
//! UTC in the `yyyyMMdd-HHmmss` shape, e.g. `20240131-154500`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use semver::{Prerelease, Version};

use crate::source::SelectedSource;
use crate::version::error::VersionError;
use crate::version::semver::with_patch;

pub const DEFAULT_PRERELEASE_FORMAT: &str = "{Prefix}{DateTime}{Postfix}";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// How the patch component of a prerelease is derived from the base version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrereleaseVersioningMode {
    AutomaticLatestPatch,
    AutomaticLatestRevision,
    IncrementPatch,
    NoChange,
}

impl PrereleaseVersioningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrereleaseVersioningMode::AutomaticLatestPatch => "AutomaticLatestPatch",
            PrereleaseVersioningMode::AutomaticLatestRevision => "AutomaticLatestRevision",
            PrereleaseVersioningMode::IncrementPatch => "IncrementPatch",
            PrereleaseVersioningMode::NoChange => "NoChange",
        }
    }
}

impl fmt::Display for PrereleaseVersioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrereleaseVersioningMode {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            PrereleaseVersioningMode::AutomaticLatestPatch,
            PrereleaseVersioningMode::AutomaticLatestRevision,
            PrereleaseVersioningMode::IncrementPatch,
            PrereleaseVersioningMode::NoChange,
        ]
        .into_iter()
        .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| VersionError::UnsupportedMode(s.to_string()))
    }
}

pub struct PrereleaseVersioner {
    clock: Arc<dyn Clock>,
}

impl PrereleaseVersioner {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Format a prerelease of `base` for the given source
    pub fn format(
        &self,
        base: &Version,
        mode: PrereleaseVersioningMode,
        source: &SelectedSource,
    ) -> Result<Version, VersionError> {
        let patch = match mode {
            PrereleaseVersioningMode::IncrementPatch => base.patch + 1,
            PrereleaseVersioningMode::NoChange => base.patch,
            unsupported => {
                return Err(VersionError::UnsupportedMode(unsupported.to_string()));
            }
        };

        let label = render_label(
            source
                .prerelease_format
                .as_deref()
                .unwrap_or(DEFAULT_PRERELEASE_FORMAT),
            &source.prerelease_prefix,
            &self.clock.now().format(TIMESTAMP_FORMAT).to_string(),
            &source.prerelease_postfix,
        );

        let mut version = with_patch(base, patch);
        version.pre = Prerelease::new(&label).map_err(|_| {
            VersionError::InvalidVersion(format!("{}-{}", version, label))
        })?;

        Ok(version)
    }
}

fn render_label(format: &str, prefix: &str, timestamp: &str, postfix: &str) -> String {
    format
        .replace("{Prefix}", prefix)
        .replace("{DateTime}", timestamp)
        .replace("{Postfix}", postfix)
}
