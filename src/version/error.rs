use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid package source: {0}")]
    InvalidSource(String),
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error(
        "No version of {package_id} matches '{pattern}'. Available versions: {}",
        format_candidates(.candidates)
    )]
    NotFound {
        package_id: String,
        pattern: String,
        candidates: Vec<semver::Version>,
    },

    #[error("Prerelease versioning mode is not supported: {0}")]
    UnsupportedMode(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid version pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn format_candidates(candidates: &[semver::Version]) -> String {
    if candidates.is_empty() {
        return "none".to_string();
    }

    candidates
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
