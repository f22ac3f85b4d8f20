//! Parser trait definition

use crate::parser::types::PackageReference;

/// Trait for parsing project files
pub trait Parser {
    /// Check if this parser can handle the given path
    fn can_parse(&self, path: &str) -> bool;

    /// Parse the content and extract package references
    fn parse(&self, content: &str) -> Result<Vec<PackageReference>, ParseError>;
}

/// Error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The package id filter is not a valid glob
    #[error("Invalid package id pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A project file or directory could not be read
    #[error("Failed to read project files: {0}")]
    Io(#[from] std::io::Error),
}
