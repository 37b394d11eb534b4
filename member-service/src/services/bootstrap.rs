//! Identity bootstrap: turn a session into a profile without ever blocking
//! the caller indefinitely.
//!
//! Without a session the answer is immediate and touches no store. With one,
//! the profile fetch (and auto-provisioning when the row does not exist yet)
//! runs as a spawned task raced against a safety-net timeout. A fetch that
//! loses the race keeps running and hands its result over on a side channel.

use service_core::retry::{retry_with_backoff, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::store::ProfileStore;
use super::ServiceError;
use crate::models::{Identity, ProfileRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    Resolved(ProfileRecord),
    Unauthenticated,
    /// Timed out or failed; retry on the next identity change or refresh.
    Unresolved,
}

impl BootstrapOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            BootstrapOutcome::Resolved(_) => "resolved",
            BootstrapOutcome::Unauthenticated => "unauthenticated",
            BootstrapOutcome::Unresolved => "unresolved",
        }
    }

    pub fn profile(&self) -> Option<&ProfileRecord> {
        match self {
            BootstrapOutcome::Resolved(profile) => Some(profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Safety-net bound on the whole fetch-or-provision operation.
    pub timeout: Duration,
    /// Retry policy for transient fetch failures, spent inside `timeout`.
    pub retry: RetryConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry: RetryConfig::quick(2),
        }
    }
}

/// Outcome plus, when the timeout won, the channel the still-running fetch
/// will deliver to.
#[derive(Debug)]
pub struct BootstrapAttempt {
    pub outcome: BootstrapOutcome,
    pub late: Option<oneshot::Receiver<ProfileRecord>>,
}

#[derive(Clone)]
pub struct IdentityBootstrapper {
    store: Arc<dyn ProfileStore>,
    config: BootstrapConfig,
}

impl IdentityBootstrapper {
    pub fn new(store: Arc<dyn ProfileStore>, config: BootstrapConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub async fn bootstrap(&self, identity: Option<&Identity>) -> BootstrapOutcome {
        self.start(identity).await.outcome
    }

    pub async fn start(&self, identity: Option<&Identity>) -> BootstrapAttempt {
        let attempt = match identity {
            None => BootstrapAttempt {
                outcome: BootstrapOutcome::Unauthenticated,
                late: None,
            },
            Some(identity) => self.resolve_with_deadline(identity.subject_id).await,
        };

        metrics::counter!("member_bootstrap_total", "outcome" => attempt.outcome.label())
            .increment(1);
        attempt
    }

    async fn resolve_with_deadline(&self, subject_id: Uuid) -> BootstrapAttempt {
        let store = Arc::clone(&self.store);
        let retry = self.config.retry.clone();
        let mut task = tokio::spawn(resolve_profile(store, retry, subject_id));

        match tokio::time::timeout(self.config.timeout, &mut task).await {
            Ok(Ok(Ok(profile))) => BootstrapAttempt {
                outcome: BootstrapOutcome::Resolved(profile),
                late: None,
            },
            Ok(Ok(Err(e))) => {
                tracing::warn!(subject_id = %subject_id, error = %e, "Profile bootstrap failed");
                BootstrapAttempt {
                    outcome: BootstrapOutcome::Unresolved,
                    late: None,
                }
            }
            Ok(Err(join_error)) => {
                tracing::error!(subject_id = %subject_id, error = %join_error, "Profile bootstrap task aborted");
                BootstrapAttempt {
                    outcome: BootstrapOutcome::Unresolved,
                    late: None,
                }
            }
            Err(_) => {
                tracing::warn!(
                    subject_id = %subject_id,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "Profile bootstrap timed out; continuing in background"
                );
                let (late_tx, late_rx) = oneshot::channel();
                tokio::spawn(async move {
                    if let Ok(Ok(profile)) = task.await {
                        // Receiver may already be gone; nothing to do then.
                        let _ = late_tx.send(profile);
                    }
                });
                BootstrapAttempt {
                    outcome: BootstrapOutcome::Unresolved,
                    late: Some(late_rx),
                }
            }
        }
    }
}

/// Fetch the profile, provisioning a minimal one if the identity has none.
async fn resolve_profile(
    store: Arc<dyn ProfileStore>,
    retry: RetryConfig,
    subject_id: Uuid,
) -> Result<ProfileRecord, ServiceError> {
    let existing = retry_with_backoff(&retry, "fetch_profile", ServiceError::is_transient, || {
        store.find_profile(subject_id)
    })
    .await?;

    match existing {
        Some(profile) => Ok(profile),
        None => {
            tracing::info!(subject_id = %subject_id, "No profile for identity; provisioning");
            store
                .insert_profile_if_absent(&ProfileRecord::provisional(subject_id))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SessionToken};
    use crate::services::MemoryStore;

    fn identity(subject_id: Uuid) -> Identity {
        Identity::new(SessionToken::new("token").unwrap(), subject_id)
    }

    fn bootstrapper(store: Arc<MemoryStore>, timeout: Duration) -> IdentityBootstrapper {
        IdentityBootstrapper::new(
            store,
            BootstrapConfig {
                timeout,
                retry: RetryConfig::quick(2),
            },
        )
    }

    #[tokio::test]
    async fn no_session_resolves_without_store_calls() {
        let store = Arc::new(MemoryStore::new());
        let bootstrapper = bootstrapper(store.clone(), Duration::from_secs(5));

        let outcome = bootstrapper.bootstrap(None).await;

        assert_eq!(outcome, BootstrapOutcome::Unauthenticated);
        assert_eq!(store.store_calls(), 0);
    }

    #[tokio::test]
    async fn existing_profile_is_returned() {
        let store = Arc::new(MemoryStore::new());
        let mut profile = ProfileRecord::provisional(Uuid::new_v4());
        profile.role = Role::Member;
        store.seed(profile.clone()).await;

        let outcome = bootstrapper(store, Duration::from_secs(5))
            .bootstrap(Some(&identity(profile.id)))
            .await;

        assert_eq!(outcome, BootstrapOutcome::Resolved(profile));
    }

    #[tokio::test]
    async fn missing_profile_is_provisioned_exactly_once() {
        let store = Arc::new(MemoryStore::new());
        let bootstrapper = bootstrapper(store.clone(), Duration::from_secs(5));
        let subject = Uuid::new_v4();

        let first = bootstrapper.bootstrap(Some(&identity(subject))).await;
        let second = bootstrapper.bootstrap(Some(&identity(subject))).await;

        let first = first.profile().cloned().unwrap();
        assert_eq!(first.role, Role::AwaitingApproval);
        assert_eq!(second.profile().unwrap().created_utc, first.created_utc);
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let store = Arc::new(MemoryStore::new());
        let profile = ProfileRecord::provisional(Uuid::new_v4());
        store.seed(profile.clone()).await;
        store.fail_next_fetches(2);

        let outcome = bootstrapper(store, Duration::from_secs(5))
            .bootstrap(Some(&identity(profile.id)))
            .await;

        assert_eq!(outcome, BootstrapOutcome::Resolved(profile));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_outage_is_unresolved() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_fetches(10);

        let outcome = bootstrapper(store, Duration::from_secs(5))
            .bootstrap(Some(&identity(Uuid::new_v4())))
            .await;

        assert_eq!(outcome, BootstrapOutcome::Unresolved);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out_and_delivers_late() {
        let store = Arc::new(MemoryStore::new());
        let profile = ProfileRecord::provisional(Uuid::new_v4());
        store.seed(profile.clone()).await;
        store.delay_fetch(profile.id, Duration::from_secs(30)).await;

        let attempt = bootstrapper(store, Duration::from_secs(1))
            .start(Some(&identity(profile.id)))
            .await;

        assert_eq!(attempt.outcome, BootstrapOutcome::Unresolved);
        let late = attempt.late.expect("late channel").await.unwrap();
        assert_eq!(late, profile);
    }
}
