//! Storage seams for the access engine.
//!
//! The engine depends only on these traits; [`super::Database`] backs them
//! with PostgreSQL and [`super::MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use uuid::Uuid;

use super::ServiceError;
use crate::models::{AuditLogEntry, OperatorIncident, ProfileRecord, Role, SeatCohort};

/// Result of an atomic "change role only if a seat is free" update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalRoleUpdate {
    Applied { previous: Role },
    CapacityExhausted(SeatCohort),
    TargetNotFound,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> Result<Option<ProfileRecord>, ServiceError>;

    /// Insert `profile` unless a record with its id exists, then return the
    /// stored record. Never creates a second record for one id.
    async fn insert_profile_if_absent(
        &self,
        profile: &ProfileRecord,
    ) -> Result<ProfileRecord, ServiceError>;

    /// Server-side count of profiles holding a seat-consuming role.
    async fn count_seat_holders(&self) -> Result<u32, ServiceError>;

    /// Write `role` unconditionally. Returns the number of rows the store
    /// reports as affected, which may be wrong under a permission layer.
    async fn set_role(&self, id: Uuid, role: Role) -> Result<u64, ServiceError>;

    /// Write `role` as one atomic step with the capacity check: when the
    /// target does not already hold a seat and `role` consumes one, the
    /// write happens only if fewer than `total` seats are taken.
    async fn set_role_within_capacity(
        &self,
        id: Uuid,
        role: Role,
        total: u32,
    ) -> Result<ConditionalRoleUpdate, ServiceError>;

    /// Persist every non-role field of `profile`.
    async fn save_profile(&self, profile: &ProfileRecord) -> Result<u64, ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait AuditTrail: Send + Sync {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), ServiceError>;

    /// Queue a silent write rejection for operator follow-up.
    async fn escalate(&self, incident: &OperatorIncident) -> Result<(), ServiceError>;
}
