//! Observable session state for one client.
//!
//! Every identity change starts a new generation. A bootstrap result is only
//! applied while its generation is still current, so a slow lookup for an
//! earlier identity can never overwrite the state of a later one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use super::bootstrap::{BootstrapOutcome, IdentityBootstrapper};
use crate::models::{Identity, ProfileRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    /// Session present but the profile could not be loaded in time.
    Unresolved { subject_id: Uuid },
    Resolved(ProfileRecord),
}

impl SessionState {
    pub fn profile(&self) -> Option<&ProfileRecord> {
        match self {
            SessionState::Resolved(profile) => Some(profile),
            _ => None,
        }
    }

    fn from_outcome(outcome: BootstrapOutcome, subject_id: Option<Uuid>) -> Self {
        match (outcome, subject_id) {
            (BootstrapOutcome::Resolved(profile), _) => SessionState::Resolved(profile),
            (BootstrapOutcome::Unresolved, Some(subject_id)) => {
                SessionState::Unresolved { subject_id }
            }
            _ => SessionState::Unauthenticated,
        }
    }
}

pub struct SessionContext {
    bootstrapper: IdentityBootstrapper,
    generation: AtomicU64,
    state: watch::Sender<SessionState>,
}

impl SessionContext {
    pub fn new(bootstrapper: IdentityBootstrapper) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Arc::new(Self {
            bootstrapper,
            generation: AtomicU64::new(0),
            state,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Re-bootstrap for a new identity (or none) and publish the result,
    /// unless a newer identity change has happened in the meantime.
    pub async fn on_identity_change(self: &Arc<Self>, identity: Option<Identity>) -> SessionState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let subject_id = identity.as_ref().map(|i| i.subject_id);

        let attempt = self.bootstrapper.start(identity.as_ref()).await;
        let next = SessionState::from_outcome(attempt.outcome, subject_id);

        let applied = self.publish(generation, next.clone(), true);
        if !applied {
            tracing::debug!(generation, "Discarding stale bootstrap result");
        }

        if let Some(late) = attempt.late {
            self.watch_late_result(generation, late);
        }

        if applied {
            next
        } else {
            self.current()
        }
    }

    /// Clear all profile state immediately.
    pub fn sign_out(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SessionState::Unauthenticated);
    }

    fn watch_late_result(self: &Arc<Self>, generation: u64, late: oneshot::Receiver<ProfileRecord>) {
        let context = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(profile) = late.await {
                // Silent: the loading phase is already over for observers.
                if context.publish(generation, SessionState::Resolved(profile), false) {
                    tracing::info!(generation, "Applied late bootstrap result");
                }
            }
        });
    }

    /// Store `next` if `generation` is current. Returns whether it was stored.
    fn publish(&self, generation: u64, next: SessionState, notify: bool) -> bool {
        let mut stored = false;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next;
            stored = true;
            notify
        });
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SessionToken};
    use crate::services::bootstrap::BootstrapConfig;
    use crate::services::MemoryStore;
    use service_core::retry::RetryConfig;
    use std::time::Duration;

    fn identity(subject_id: Uuid) -> Identity {
        Identity::new(SessionToken::new("token").unwrap(), subject_id)
    }

    fn context(store: Arc<MemoryStore>, timeout: Duration) -> Arc<SessionContext> {
        SessionContext::new(IdentityBootstrapper::new(
            store,
            BootstrapConfig {
                timeout,
                retry: RetryConfig::no_retry(),
            },
        ))
    }

    async fn seeded(store: &MemoryStore, role: Role) -> ProfileRecord {
        let mut profile = ProfileRecord::provisional(Uuid::new_v4());
        profile.role = role;
        store.seed(profile.clone()).await;
        profile
    }

    #[tokio::test]
    async fn starts_unauthenticated() {
        let ctx = context(Arc::new(MemoryStore::new()), Duration::from_secs(5));
        assert_eq!(ctx.current(), SessionState::Unauthenticated);
        assert_eq!(ctx.generation(), 0);
    }

    #[tokio::test]
    async fn identity_change_resolves_profile() {
        let store = Arc::new(MemoryStore::new());
        let profile = seeded(&store, Role::Member).await;
        let ctx = context(store, Duration::from_secs(5));

        let state = ctx.on_identity_change(Some(identity(profile.id))).await;

        assert_eq!(state, SessionState::Resolved(profile.clone()));
        assert_eq!(ctx.current(), SessionState::Resolved(profile));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_never_overwrites_newer_identity() {
        let store = Arc::new(MemoryStore::new());
        let slow = seeded(&store, Role::Member).await;
        let fast = seeded(&store, Role::Founder).await;
        store.delay_fetch(slow.id, Duration::from_millis(500)).await;
        let ctx = context(store, Duration::from_secs(5));

        let first = {
            let ctx = Arc::clone(&ctx);
            let id = identity(slow.id);
            tokio::spawn(async move { ctx.on_identity_change(Some(id)).await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = ctx.on_identity_change(Some(identity(fast.id))).await;
        assert_eq!(second, SessionState::Resolved(fast.clone()));

        first.await.unwrap();
        assert_eq!(ctx.current(), SessionState::Resolved(fast));
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_updates_quietly() {
        let store = Arc::new(MemoryStore::new());
        let profile = seeded(&store, Role::Member).await;
        store.delay_fetch(profile.id, Duration::from_secs(30)).await;
        let ctx = context(store, Duration::from_secs(1));
        let mut rx = ctx.subscribe();

        let state = ctx.on_identity_change(Some(identity(profile.id))).await;
        assert_eq!(
            state,
            SessionState::Unresolved {
                subject_id: profile.id
            }
        );
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(ctx.current(), SessionState::Resolved(profile));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_is_dropped_after_sign_out() {
        let store = Arc::new(MemoryStore::new());
        let profile = seeded(&store, Role::Member).await;
        store.delay_fetch(profile.id, Duration::from_secs(30)).await;
        let ctx = context(store, Duration::from_secs(1));

        ctx.on_identity_change(Some(identity(profile.id))).await;
        ctx.sign_out();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(ctx.current(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn sign_out_clears_state_and_notifies() {
        let store = Arc::new(MemoryStore::new());
        let profile = seeded(&store, Role::Moderator).await;
        let ctx = context(store, Duration::from_secs(5));
        ctx.on_identity_change(Some(identity(profile.id))).await;
        let mut rx = ctx.subscribe();

        ctx.sign_out();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn clearing_identity_needs_no_store() {
        let store = Arc::new(MemoryStore::new());
        let ctx = context(store.clone(), Duration::from_secs(5));

        let state = ctx.on_identity_change(None).await;

        assert_eq!(state, SessionState::Unauthenticated);
        assert_eq!(store.store_calls(), 0);
    }
}
