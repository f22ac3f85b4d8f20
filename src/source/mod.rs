//! Stage based package source selection
//!
//! # Modules
//!
//! - [`stage`]: Parsing of per-stage source configuration strings
//! - [`selector`]: Resolves a stage name to a single [`SelectedSource`]
//! - [`settings`]: NuGet configuration lookups (default push source, package sources)
//! - [`error`]: Error types for source selection

pub mod error;
pub mod selector;
pub mod settings;
pub mod stage;

pub use error::SourceError;
pub use selector::{SelectedSource, SelectionRequest, SourceSelector};
pub use settings::{NuGetConfigSettings, SettingsProvider};
pub use stage::{StageDefinition, StageKind, StageMatch, StageMatcher};
