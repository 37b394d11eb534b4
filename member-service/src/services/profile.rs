//! Member self-service: profile edits, onboarding and account closure.

use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use uuid::Uuid;

use super::access_policy::AccessPolicy;
use super::store::{AuditTrail, ProfileStore};
use super::ServiceError;
use crate::models::{
    AuditAction, AuditLogEntry, OnboardingStep, OperatorIncident, ProfileRecord, ProfileUpdate,
    Role,
};

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    audit: Arc<dyn AuditTrail>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, audit: Arc<dyn AuditTrail>) -> Self {
        Self { store, audit }
    }

    pub async fn update_profile(
        &self,
        profile: &ProfileRecord,
        update: ProfileUpdate,
    ) -> Result<ProfileRecord, ServiceError> {
        update.validate()?;

        let mut updated = profile.clone();
        update.apply(&mut updated);
        self.save(&updated).await?;

        tracing::info!(member_id = %profile.id, "Profile updated");
        Ok(updated)
    }

    pub async fn complete_onboarding(
        &self,
        profile: &ProfileRecord,
        step: OnboardingStep,
    ) -> Result<ProfileRecord, ServiceError> {
        let mut updated = profile.clone();
        match step {
            OnboardingStep::General => updated.onboarding_done = true,
            OnboardingStep::Leadership => updated.leadership_onboarding_done = true,
        }
        if updated == *profile {
            return Ok(updated);
        }

        updated.updated_utc = Utc::now();
        self.save(&updated).await?;

        tracing::info!(member_id = %profile.id, step = ?step, "Onboarding step completed");
        Ok(updated)
    }

    /// Close the member's own account.
    ///
    /// The role drops to awaiting approval first, releasing the seat, then
    /// personal fields are cleared. A banned member stays banned. The record
    /// stays so the identity keeps exactly one profile; signing in again
    /// requires a fresh approval. Top admins cannot close their own account.
    pub async fn close_account(&self, profile: &ProfileRecord) -> Result<ProfileRecord, ServiceError> {
        if AccessPolicy::is_top_admin(profile.role) {
            return Err(ServiceError::InvalidTransition(
                "top administrators cannot close their own account".to_string(),
            ));
        }

        let closed_role = if AccessPolicy::is_banned(profile.role) {
            Role::Banned
        } else {
            Role::AwaitingApproval
        };

        if profile.role != closed_role {
            self.store.set_role(profile.id, closed_role).await?;
            self.verify_role(profile, closed_role).await?;
        }

        let mut closed = profile.clone();
        closed.anonymize(Utc::now());
        self.save(&closed).await?;

        let stored = self.load(profile.id).await?;
        if !stored.is_deactivated() {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "account {} was not deactivated",
                profile.id
            )));
        }

        let entry = AuditLogEntry::new(
            profile.id,
            AuditAction::RemoveAccess,
            profile.id,
            profile.role,
            closed_role,
            Some("account closed by member".to_string()),
        );
        if let Err(e) = self.audit.append(&entry).await {
            tracing::warn!(member_id = %profile.id, error = %e, "Account closed but audit append failed");
        }

        tracing::info!(member_id = %profile.id, previous_role = %profile.role, "Account closed");
        Ok(stored)
    }

    async fn load(&self, id: Uuid) -> Result<ProfileRecord, ServiceError> {
        self.store
            .find_profile(id)
            .await?
            .ok_or(ServiceError::TargetNotFound(id))
    }

    /// Read the role back; an acknowledged write with no effect is escalated.
    async fn verify_role(&self, profile: &ProfileRecord, intended: Role) -> Result<(), ServiceError> {
        let observed = self.load(profile.id).await?.role;
        if observed == intended {
            return Ok(());
        }

        tracing::error!(
            member_id = %profile.id,
            intended = %intended,
            observed = %observed,
            "Account closure role write acknowledged but not applied"
        );

        let incident = OperatorIncident::silent_write_rejection(
            profile.id,
            profile.id,
            "close_account",
            intended,
            observed,
        );
        if let Err(e) = self.audit.escalate(&incident).await {
            tracing::error!(
                incident_id = %incident.id,
                error = %e,
                "Failed to queue operator incident"
            );
        }

        Err(ServiceError::WriteRejected {
            target_id: profile.id,
            intended,
            observed,
        })
    }

    async fn save(&self, profile: &ProfileRecord) -> Result<(), ServiceError> {
        match self.store.save_profile(profile).await? {
            0 => Err(ServiceError::TargetNotFound(profile.id)),
            _ => Ok(()),
        }
    }
}
