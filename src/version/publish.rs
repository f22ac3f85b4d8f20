//! Waiting for a pushed package to become visible on its source

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::version::error::RegistryError;
use crate::version::feed::{ExistenceChecker, PackageIdentity};

/// Poll `checker` until `identity` exists or `wait` elapses.
///
/// # Returns
/// * `Ok(true)` - The package was found
/// * `Ok(false)` - The package did not show up before the timeout
/// * `Err(RegistryError)` - The source could not be queried
pub async fn await_publish(
    checker: &dyn ExistenceChecker,
    identity: &PackageIdentity,
    wait: Duration,
    poll_interval: Duration,
) -> Result<bool, RegistryError> {
    let poll = async {
        let mut attempt = 1;
        loop {
            if checker
                .exists(&identity.id, &identity.version, &identity.source)
                .await?
            {
                return Ok::<_, RegistryError>(attempt);
            }
            debug!(
                "{} {} not yet on {} (attempt {})",
                identity.id, identity.version, identity.source, attempt
            );
            attempt += 1;
            sleep(poll_interval).await;
        }
    };

    match timeout(wait, poll).await {
        Ok(result) => {
            let attempts = result?;
            info!(
                "{} {} found on {} after {} attempt(s)",
                identity.id, identity.version, identity.source, attempts
            );
            Ok(true)
        }
        Err(_) => {
            info!(
                "Gave up waiting for {} {} on {} after {:?}",
                identity.id, identity.version, identity.source, wait
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::feed::MockExistenceChecker;
    use semver::Version;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn identity() -> PackageIdentity {
        PackageIdentity::new(
            "Sundew.Base",
            Version::new(1, 2, 3),
            "https://api.nuget.org/v3/index.json",
        )
    }

    #[tokio::test]
    async fn await_publish_returns_true_once_package_appears() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut checker = MockExistenceChecker::new();
        checker
            .expect_exists()
            .returning(move |_, _, _| Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2));

        let result = await_publish(
            &checker,
            &identity(),
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn await_publish_returns_false_on_timeout() {
        let mut checker = MockExistenceChecker::new();
        checker.expect_exists().returning(|_, _, _| Ok(false));

        let result = await_publish(
            &checker,
            &identity(),
            Duration::from_millis(30),
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        assert!(!result);
    }

    #[tokio::test]
    async fn await_publish_propagates_checker_errors() {
        let mut checker = MockExistenceChecker::new();
        checker
            .expect_exists()
            .times(1)
            .returning(|_, _, _| Err(RegistryError::InvalidResponse("boom".to_string())));

        let result = await_publish(
            &checker,
            &identity(),
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }
}
