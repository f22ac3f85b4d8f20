//! Version negotiation against package feeds
//!
//! This module finds the versions a package may take: the next free patch on a
//! destination feed, a timestamped prerelease for a staged source, or the
//! newest published version matching a glob.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Feeds    │────▶│    Cache    │◀────│  Selector   │
//! │(local,nuget)│     │ (per call)  │     │  (globs)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Automatic  │     │ Prerelease  │
//! │(patch bump) │     │(label fmt)  │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`feed`]: Capability traits for existence checks and version listings
//! - [`feeds`]: Local directory and NuGet v3 feed implementations
//! - [`automatic`]: Next free patch version on a destination feed
//! - [`prerelease`]: Prerelease labels from a source's format template
//! - [`cache`]: In-flight-aware version cache for a single selection run
//! - [`selector`]: Newest acceptable version per package reference
//! - [`publish`]: Waiting for a pushed package to appear
//! - [`error`]: Error types for feed and version operations
//! - [`semver`]: Shared semver utilities
//! - [`types`]: Update suggestions and results

pub mod automatic;
pub mod cache;
pub mod error;
pub mod feed;
pub mod feeds;
pub mod prerelease;
pub mod publish;
pub mod selector;
pub mod semver;
pub mod types;
