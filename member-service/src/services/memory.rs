//! In-process store for tests and local runs.
//!
//! All profile mutations go through one mutex, which makes the conditional
//! seat update atomic. Knobs simulate slow fetches, transient outages, and a
//! permission layer that acknowledges writes without applying them.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{AuditTrail, ConditionalRoleUpdate, ProfileStore};
use super::ServiceError;
use crate::models::{AuditLogEntry, OperatorIncident, ProfileRecord, Role, SeatCohort};

#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<Uuid, ProfileRecord>>,
    audit: Mutex<Vec<AuditLogEntry>>,
    incidents: Mutex<Vec<OperatorIncident>>,
    fetch_delays: Mutex<HashMap<Uuid, Duration>>,
    calls: AtomicU64,
    transient_failures: AtomicU32,
    reject_role_writes: AtomicBool,
    fail_audit_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, profile: ProfileRecord) {
        self.profiles.lock().await.insert(profile.id, profile);
    }

    /// Seed `count` seat holders with fresh ids.
    pub async fn seed_members(&self, count: u32) {
        let mut profiles = self.profiles.lock().await;
        for _ in 0..count {
            let mut profile = ProfileRecord::provisional(Uuid::new_v4());
            profile.role = Role::Member;
            profile.access_released = true;
            profiles.insert(profile.id, profile);
        }
    }

    /// Direct read that bypasses call counting and simulated latency.
    pub async fn profile(&self, id: Uuid) -> Option<ProfileRecord> {
        self.profiles.lock().await.get(&id).cloned()
    }

    pub async fn profile_count(&self) -> usize {
        self.profiles.lock().await.len()
    }

    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit.lock().await.clone()
    }

    pub async fn incidents(&self) -> Vec<OperatorIncident> {
        self.incidents.lock().await.clone()
    }

    /// Number of store operations issued so far.
    pub fn store_calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn delay_fetch(&self, id: Uuid, delay: Duration) {
        self.fetch_delays.lock().await.insert(id, delay);
    }

    /// Make the next `n` profile fetches fail with a transient error.
    pub fn fail_next_fetches(&self, n: u32) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    /// Acknowledge role writes without applying them.
    pub fn reject_role_writes(&self, reject: bool) {
        self.reject_role_writes.store(reject, Ordering::SeqCst);
    }

    pub fn fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn writes_rejected(&self) -> bool {
        self.reject_role_writes.load(Ordering::SeqCst)
    }

    fn apply_role(profile: &mut ProfileRecord, role: Role) {
        profile.role = role;
        profile.access_released = role.consumes_seat();
        profile.updated_utc = Utc::now();
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, id: Uuid) -> Result<Option<ProfileRecord>, ServiceError> {
        self.record_call();

        let delay = self.fetch_delays.lock().await.get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ServiceError::Unavailable("simulated outage".to_string()));
        }

        Ok(self.profiles.lock().await.get(&id).cloned())
    }

    async fn insert_profile_if_absent(
        &self,
        profile: &ProfileRecord,
    ) -> Result<ProfileRecord, ServiceError> {
        self.record_call();
        let mut profiles = self.profiles.lock().await;
        Ok(profiles
            .entry(profile.id)
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn count_seat_holders(&self) -> Result<u32, ServiceError> {
        self.record_call();
        let profiles = self.profiles.lock().await;
        Ok(profiles.values().filter(|p| p.role.consumes_seat()).count() as u32)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<u64, ServiceError> {
        self.record_call();
        let mut profiles = self.profiles.lock().await;
        let Some(profile) = profiles.get_mut(&id) else {
            return Ok(0);
        };
        if !self.writes_rejected() {
            Self::apply_role(profile, role);
        }
        Ok(1)
    }

    async fn set_role_within_capacity(
        &self,
        id: Uuid,
        role: Role,
        total: u32,
    ) -> Result<ConditionalRoleUpdate, ServiceError> {
        self.record_call();
        let mut profiles = self.profiles.lock().await;

        let Some(previous) = profiles.get(&id).map(|p| p.role) else {
            return Ok(ConditionalRoleUpdate::TargetNotFound);
        };

        if role.consumes_seat() && !previous.consumes_seat() {
            let used = profiles.values().filter(|p| p.role.consumes_seat()).count() as u32;
            if used >= total {
                return Ok(ConditionalRoleUpdate::CapacityExhausted(SeatCohort::new(
                    total, used,
                )));
            }
        }

        if !self.writes_rejected() {
            if let Some(profile) = profiles.get_mut(&id) {
                Self::apply_role(profile, role);
            }
        }
        Ok(ConditionalRoleUpdate::Applied { previous })
    }

    async fn save_profile(&self, profile: &ProfileRecord) -> Result<u64, ServiceError> {
        self.record_call();
        let mut profiles = self.profiles.lock().await;
        let Some(stored) = profiles.get_mut(&profile.id) else {
            return Ok(0);
        };
        let role = stored.role;
        let access_released = stored.access_released;
        *stored = profile.clone();
        stored.role = role;
        stored.access_released = access_released;
        Ok(1)
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait]
impl AuditTrail for MemoryStore {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), ServiceError> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(
                "simulated audit outage".to_string(),
            ));
        }
        self.audit.lock().await.push(entry.clone());
        Ok(())
    }

    async fn escalate(&self, incident: &OperatorIncident) -> Result<(), ServiceError> {
        self.incidents.lock().await.push(incident.clone());
        Ok(())
    }
}
