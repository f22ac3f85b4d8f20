//! Collision avoidance for versions about to be pushed

use std::sync::Arc;

use semver::Version;
use tracing::info;

use crate::version::error::VersionError;
use crate::version::feed::{ExistenceChecker, is_local_source};
use crate::version::semver::with_patch;

/// Bumps the patch of a version when it is already present at the destination.
///
/// Performs exactly one existence probe. If `patch + 1` is taken as well the
/// result still collides; callers treat it as best-effort.
pub struct AutomaticPackageVersioner {
    local: Arc<dyn ExistenceChecker>,
    remote: Arc<dyn ExistenceChecker>,
}

impl AutomaticPackageVersioner {
    pub fn new(local: Arc<dyn ExistenceChecker>, remote: Arc<dyn ExistenceChecker>) -> Self {
        Self { local, remote }
    }

    pub async fn resolve(
        &self,
        package_id: &str,
        base: &Version,
        destination: &str,
    ) -> Result<Version, VersionError> {
        let checker = if is_local_source(destination) {
            &self.local
        } else {
            &self.remote
        };

        let exists = checker.exists(package_id, base, destination).await?;
        let patch = if exists { base.patch + 1 } else { base.patch };
        let resolved = with_patch(base, patch);

        info!(
            "Resolved {} {} for {} (already published: {})",
            package_id, resolved, destination, exists
        );

        Ok(resolved)
    }
}
