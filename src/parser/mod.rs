//! Parser layer
//! - traits.rs: Parser trait definition
//! - types.rs: Common types (PackageReference, project file detection)
//! - project.rs: MSBuild project and central package file parser

pub mod project;
pub mod traits;
pub mod types;

pub use project::ProjectParser;
pub use traits::{ParseError, Parser};
pub use types::PackageReference;
