use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid stage expression for {stage}: {source}")]
    InvalidStageExpression {
        stage: &'static str,
        source: regex::Error,
    },

    #[error("Failed to read package settings: {0}")]
    Settings(#[from] std::io::Error),
}
