use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Kind of privileged action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Promote,
    Demote,
    RemoveAccess,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Promote => "PROMOTE",
            AuditAction::Demote => "DEMOTE",
            AuditAction::RemoveAccess => "REMOVE_ACCESS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDetails {
    pub previous_role: Role,
    pub new_role: Role,
    pub timestamp: DateTime<Utc>,
    pub context: Option<String>,
}

/// Immutable record of a role change. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub target_id: Uuid,
    pub details: AuditDetails,
    pub created_utc: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        actor_id: Uuid,
        action: AuditAction,
        target_id: Uuid,
        previous_role: Role,
        new_role: Role,
        context: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            target_id,
            details: AuditDetails {
                previous_role,
                new_role,
                timestamp: now,
                context,
            },
            created_utc: now,
        }
    }
}
