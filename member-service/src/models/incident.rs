//! Operator incidents - writes the store accepted but did not apply.
//!
//! Retrying a permission-layer rejection cannot succeed, so these are queued
//! for a human instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorIncident {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub target_id: Uuid,
    /// Operation that was attempted, e.g. `promote`.
    pub operation: String,
    pub intended_role: Role,
    pub observed_role: Role,
    pub created_utc: DateTime<Utc>,
    pub resolved_utc: Option<DateTime<Utc>>,
}

impl OperatorIncident {
    pub fn silent_write_rejection(
        actor_id: Uuid,
        target_id: Uuid,
        operation: impl Into<String>,
        intended_role: Role,
        observed_role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            target_id,
            operation: operation.into(),
            intended_role,
            observed_role,
            created_utc: Utc::now(),
            resolved_utc: None,
        }
    }
}
