//! NuGet configuration lookups
//!
//! Reads `NuGet.Config` files from the root directory upwards, followed by
//! the user-level configuration. For `defaultPushSource` the nearest file
//! wins; package sources are merged from the farthest file to the nearest,
//! and a `<clear />` inside `<packageSources>` drops everything inherited.

#[cfg(test)]
use mockall::automock;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::version::feed::is_local_source;

/// Source used when no configuration file names any package source
pub const NUGET_ORG_SOURCE: &str = "https://api.nuget.org/v3/index.json";

const CONFIG_FILE_NAMES: &[&str] = &["NuGet.Config", "nuget.config", "NuGet.config"];
const DEFAULT_PUSH_SOURCE_KEY: &str = "defaultPushSource";

/// Trait for looking up package settings for a directory
#[cfg_attr(test, automock)]
pub trait SettingsProvider: Send + Sync {
    /// The configured default push source, if any
    fn default_push_source(&self, root: &Path) -> std::io::Result<Option<String>>;

    /// All configured package sources (name -> uri) in configuration order
    fn package_sources(&self, root: &Path) -> std::io::Result<IndexMap<String, String>>;
}

/// Settings read from a single configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConfigFile {
    directory: PathBuf,
    clears_sources: bool,
    sources: Vec<(String, String)>,
    config: Vec<(String, String)>,
}

/// [`SettingsProvider`] backed by NuGet.Config files
pub struct NuGetConfigSettings {
    user_config: Option<PathBuf>,
    package_sources_re: Regex,
    config_re: Regex,
    add_re: Regex,
    clear_re: Regex,
}

impl NuGetConfigSettings {
    /// Creates settings that also consult the user-level `~/.nuget/NuGet/NuGet.Config`
    pub fn new() -> Self {
        Self::with_user_config(dirs::home_dir().map(|home| home.join(".nuget/NuGet/NuGet.Config")))
    }

    pub fn with_user_config(user_config: Option<PathBuf>) -> Self {
        Self {
            user_config,
            package_sources_re: Regex::new(r"(?is)<packageSources\s*>(.*?)</packageSources\s*>")
                .unwrap(),
            config_re: Regex::new(r"(?is)<config\s*>(.*?)</config\s*>").unwrap(),
            add_re: Regex::new(r#"(?i)<add\s+key\s*=\s*"([^"]*)"\s+value\s*=\s*"([^"]*)"[^>]*>"#)
                .unwrap(),
            clear_re: Regex::new(r"(?i)<clear\s*/>").unwrap(),
        }
    }

    fn parse(&self, directory: &Path, content: &str) -> ConfigFile {
        let mut file = ConfigFile {
            directory: directory.to_path_buf(),
            ..ConfigFile::default()
        };

        for section in self.package_sources_re.captures_iter(content) {
            let body = &section[1];
            if self.clear_re.is_match(body) {
                file.clears_sources = true;
            }
            file.sources.extend(self.entries(body));
        }

        for section in self.config_re.captures_iter(content) {
            file.config.extend(self.entries(&section[1]));
        }

        file
    }

    fn entries(&self, body: &str) -> Vec<(String, String)> {
        self.add_re
            .captures_iter(body)
            .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()))
            .collect()
    }

    /// Configuration files, nearest first
    fn load(&self, root: &Path) -> std::io::Result<Vec<ConfigFile>> {
        let mut files = Vec::new();

        // A relative root such as "." has no ancestors above the current directory
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        for directory in root.ancestors() {
            for name in CONFIG_FILE_NAMES {
                if let Some(content) = read_optional(&directory.join(name))? {
                    files.push(self.parse(directory, &content));
                    break;
                }
            }
        }

        if let Some(user_config) = &self.user_config
            && let Some(content) = read_optional(user_config)?
        {
            let directory = user_config.parent().unwrap_or(Path::new("."));
            files.push(self.parse(directory, &content));
        }

        debug!("Loaded {} NuGet configuration files for {:?}", files.len(), root);
        Ok(files)
    }
}

impl Default for NuGetConfigSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsProvider for NuGetConfigSettings {
    fn default_push_source(&self, root: &Path) -> std::io::Result<Option<String>> {
        let files = self.load(root)?;

        Ok(files.iter().find_map(|file| {
            file.config
                .iter()
                .find(|(key, value)| key.eq_ignore_ascii_case(DEFAULT_PUSH_SOURCE_KEY) && !value.is_empty())
                .map(|(_, value)| resolve_relative(&file.directory, value))
        }))
    }

    fn package_sources(&self, root: &Path) -> std::io::Result<IndexMap<String, String>> {
        let files = self.load(root)?;
        let mut sources = IndexMap::new();
        let mut cleared = false;

        for file in files.iter().rev() {
            if file.clears_sources {
                sources.clear();
                cleared = true;
            }
            for (name, value) in &file.sources {
                sources.insert(name.clone(), resolve_relative(&file.directory, value));
            }
        }

        if sources.is_empty() && !cleared {
            sources.insert("nuget.org".to_string(), NUGET_ORG_SOURCE.to_string());
        }

        Ok(sources)
    }
}

fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Local relative paths are relative to the configuration file's directory
fn resolve_relative(directory: &Path, value: &str) -> String {
    if is_local_source(value) && !value.starts_with("file://") && Path::new(value).is_relative() {
        directory.join(value).to_string_lossy().to_string()
    } else {
        value.to_string()
    }
}
