//! Admin role changes: promote, demote and remove access.
//!
//! Every change follows the same contract: authorize the caller before any
//! I/O, write, read the stored role back, and only then append the audit
//! entry. A write the store acknowledged but did not apply is escalated to the
//! operator queue and never retried.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use super::access_policy::AccessPolicy;
use super::seat_allocator::{report_overbooking, SeatAllocator};
use super::store::{AuditTrail, ConditionalRoleUpdate, ProfileStore};
use super::ServiceError;
use crate::models::{AuditAction, AuditLogEntry, OperatorIncident, ProfileRecord, Role};

/// Result of an admin action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleChange {
    pub target_id: Uuid,
    pub previous_role: Role,
    pub new_role: Role,
    /// False when the target already had the resulting role.
    pub changed: bool,
    /// False when the change committed but the audit append failed.
    pub audit_recorded: bool,
}

impl RoleChange {
    fn unchanged(target_id: Uuid, role: Role) -> Self {
        Self {
            target_id,
            previous_role: role,
            new_role: role,
            changed: false,
            audit_recorded: false,
        }
    }
}

/// Next role down. `None` means demoting is a no-op.
pub fn demotion_target(role: Role) -> Option<Role> {
    match role {
        Role::SuperAdmin | Role::Founder | Role::Moderator => Some(Role::Member),
        Role::Member => Some(Role::AwaitingApproval),
        Role::AwaitingApproval | Role::Banned | Role::Visitor => None,
    }
}

#[derive(Clone)]
pub struct AdminPromotionWorkflow {
    store: Arc<dyn ProfileStore>,
    audit: Arc<dyn AuditTrail>,
    seats: SeatAllocator,
}

impl AdminPromotionWorkflow {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditTrail>,
        seats: SeatAllocator,
    ) -> Self {
        Self {
            store,
            audit,
            seats,
        }
    }

    pub async fn promote(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        new_role: Role,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        let result = self.try_promote(actor, target_id, new_role, context).await;
        record_action(AuditAction::Promote, &result);
        result
    }

    pub async fn demote(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        let result = self.try_demote(actor, target_id, context).await;
        record_action(AuditAction::Demote, &result);
        result
    }

    pub async fn remove_access(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        let result = self.try_remove_access(actor, target_id, context).await;
        record_action(AuditAction::RemoveAccess, &result);
        result
    }

    async fn try_promote(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        new_role: Role,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        authorize(actor)?;
        if !new_role.consumes_seat() {
            return Err(ServiceError::InvalidTransition(format!(
                "cannot promote to {}",
                new_role
            )));
        }

        let target = self.load_target(target_id).await?;
        if target.role == new_role {
            return Ok(RoleChange::unchanged(target_id, new_role));
        }
        if new_role.power() < target.role.power() {
            return Err(ServiceError::InvalidTransition(format!(
                "{} is below the current role {}; use demote",
                new_role, target.role
            )));
        }

        let previous = match self
            .store
            .set_role_within_capacity(target_id, new_role, self.seats.total())
            .await?
        {
            ConditionalRoleUpdate::Applied { previous } => previous,
            ConditionalRoleUpdate::TargetNotFound => {
                return Err(ServiceError::TargetNotFound(target_id))
            }
            ConditionalRoleUpdate::CapacityExhausted(cohort) => {
                report_overbooking(&cohort);
                tracing::info!(
                    target_id = %target_id,
                    used = cohort.used,
                    total = cohort.total,
                    "Promotion refused: founding cohort is full"
                );
                return Err(ServiceError::CapacityExhausted {
                    used: cohort.used,
                    total: cohort.total,
                });
            }
        };

        self.verify_write(actor, target_id, "promote", new_role)
            .await?;
        let audit_recorded = self
            .record_audit(actor, AuditAction::Promote, target_id, previous, new_role, context)
            .await;

        Ok(RoleChange {
            target_id,
            previous_role: previous,
            new_role,
            changed: true,
            audit_recorded,
        })
    }

    async fn try_demote(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        authorize(actor)?;
        if actor.id == target_id {
            return Err(ServiceError::InvalidTransition(
                "administrators cannot demote themselves".to_string(),
            ));
        }

        let target = self.load_target(target_id).await?;
        let Some(new_role) = demotion_target(target.role) else {
            return Ok(RoleChange::unchanged(target_id, target.role));
        };

        self.write_and_audit(actor, &target, new_role, AuditAction::Demote, "demote", context)
            .await
    }

    async fn try_remove_access(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        authorize(actor)?;
        if actor.id == target_id {
            return Err(ServiceError::InvalidTransition(
                "administrators cannot remove their own access".to_string(),
            ));
        }

        let target = self.load_target(target_id).await?;
        if target.role == Role::Banned {
            return Ok(RoleChange::unchanged(target_id, Role::Banned));
        }

        self.write_and_audit(
            actor,
            &target,
            Role::Banned,
            AuditAction::RemoveAccess,
            "remove_access",
            context,
        )
        .await
    }

    /// Unconditional write for transitions that never take a new seat.
    async fn write_and_audit(
        &self,
        actor: &ProfileRecord,
        target: &ProfileRecord,
        new_role: Role,
        action: AuditAction,
        operation: &str,
        context: Option<String>,
    ) -> Result<RoleChange, ServiceError> {
        let rows = self.store.set_role(target.id, new_role).await?;
        if rows == 0 {
            return Err(ServiceError::TargetNotFound(target.id));
        }

        self.verify_write(actor, target.id, operation, new_role)
            .await?;
        let audit_recorded = self
            .record_audit(actor, action, target.id, target.role, new_role, context)
            .await;

        Ok(RoleChange {
            target_id: target.id,
            previous_role: target.role,
            new_role,
            changed: true,
            audit_recorded,
        })
    }

    async fn load_target(&self, target_id: Uuid) -> Result<ProfileRecord, ServiceError> {
        self.store
            .find_profile(target_id)
            .await?
            .ok_or(ServiceError::TargetNotFound(target_id))
    }

    /// Read the role back; an acknowledged write with no effect is escalated.
    async fn verify_write(
        &self,
        actor: &ProfileRecord,
        target_id: Uuid,
        operation: &str,
        intended: Role,
    ) -> Result<(), ServiceError> {
        let observed = self.load_target(target_id).await?.role;
        if observed == intended {
            return Ok(());
        }

        tracing::error!(
            actor_id = %actor.id,
            target_id = %target_id,
            operation,
            intended = %intended,
            observed = %observed,
            "Role write acknowledged but not applied"
        );

        let incident = OperatorIncident::silent_write_rejection(
            actor.id, target_id, operation, intended, observed,
        );
        if let Err(e) = self.audit.escalate(&incident).await {
            tracing::error!(
                incident_id = %incident.id,
                error = %e,
                "Failed to queue operator incident"
            );
        }

        Err(ServiceError::WriteRejected {
            target_id,
            intended,
            observed,
        })
    }

    async fn record_audit(
        &self,
        actor: &ProfileRecord,
        action: AuditAction,
        target_id: Uuid,
        previous_role: Role,
        new_role: Role,
        context: Option<String>,
    ) -> bool {
        let entry =
            AuditLogEntry::new(actor.id, action, target_id, previous_role, new_role, context);
        match self.audit.append(&entry).await {
            Ok(()) => {
                tracing::info!(
                    actor_id = %actor.id,
                    target_id = %target_id,
                    action = action.as_str(),
                    previous_role = %previous_role,
                    new_role = %new_role,
                    "Role change recorded"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    actor_id = %actor.id,
                    target_id = %target_id,
                    action = action.as_str(),
                    error = %e,
                    "Role change committed but audit append failed"
                );
                false
            }
        }
    }
}

fn authorize(actor: &ProfileRecord) -> Result<(), ServiceError> {
    if AccessPolicy::is_top_admin(actor.role) {
        Ok(())
    } else {
        tracing::warn!(actor_id = %actor.id, role = %actor.role, "Unauthorized admin action");
        Err(ServiceError::Unauthorized)
    }
}

fn record_action(action: AuditAction, result: &Result<RoleChange, ServiceError>) {
    let outcome = match result {
        Ok(change) if change.changed => "changed",
        Ok(_) => "unchanged",
        Err(ServiceError::Unauthorized) => "unauthorized",
        Err(ServiceError::CapacityExhausted { .. }) => "capacity_exhausted",
        Err(ServiceError::TargetNotFound(_)) => "not_found",
        Err(ServiceError::WriteRejected { .. }) => "write_rejected",
        Err(ServiceError::InvalidTransition(_)) => "invalid_transition",
        Err(_) => "error",
    };
    metrics::counter!(
        "member_admin_actions_total",
        "action" => action.as_str(),
        "result" => outcome
    )
    .increment(1);
}
