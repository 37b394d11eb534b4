//! PostgreSQL store for member profiles, the audit log and operator incidents.
//!
//! Seat admission is serialized with a transaction-scoped advisory lock so the
//! capacity count and the role write commit together.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::store::{AuditTrail, ConditionalRoleUpdate, ProfileStore};
use super::ServiceError;
use crate::models::{AuditLogEntry, OperatorIncident, ProfileRecord, ProfileRow, Role, SeatCohort};

/// Advisory lock key guarding founding-cohort admission.
const SEAT_ADMISSION_LOCK: i64 = 0x5345_4154_4144_4d54;

const COUNT_SEAT_HOLDERS: &str =
    "SELECT COUNT(*) FROM member_profiles WHERE LOWER(TRIM(role)) = ANY($1)";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn seat_labels() -> Vec<String> {
        Role::seat_labels().into_iter().map(str::to_string).collect()
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn find_profile(&self, id: Uuid) -> Result<Option<ProfileRecord>, ServiceError> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM member_profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ProfileRecord::from))
    }

    async fn insert_profile_if_absent(
        &self,
        profile: &ProfileRecord,
    ) -> Result<ProfileRecord, ServiceError> {
        let result = sqlx::query(
            r#"
            INSERT INTO member_profiles (
                id, role, access_released, onboarding_done, leadership_onboarding_done,
                show_email, show_phone, created_utc, updated_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(profile.id)
        .bind(profile.role.as_str())
        .bind(profile.access_released)
        .bind(profile.onboarding_done)
        .bind(profile.leadership_onboarding_done)
        .bind(profile.show_email)
        .bind(profile.show_phone)
        .bind(profile.created_utc)
        .bind(profile.updated_utc)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            tracing::info!(member_id = %profile.id, "Provisioned member profile");
        }

        self.find_profile(profile.id).await?.ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "Profile {} missing immediately after insert",
                profile.id
            ))
        })
    }

    async fn count_seat_holders(&self) -> Result<u32, ServiceError> {
        let count: i64 = sqlx::query_scalar(COUNT_SEAT_HOLDERS)
            .bind(Self::seat_labels())
            .fetch_one(&self.pool)
            .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            "UPDATE member_profiles SET role = $2, access_released = $3, updated_utc = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(role.as_str())
        .bind(role.consumes_seat())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn set_role_within_capacity(
        &self,
        id: Uuid,
        role: Role,
        total: u32,
    ) -> Result<ConditionalRoleUpdate, ServiceError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SEAT_ADMISSION_LOCK)
            .execute(&mut *tx)
            .await?;

        let current: Option<Option<String>> =
            sqlx::query_scalar("SELECT role FROM member_profiles WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(ConditionalRoleUpdate::TargetNotFound);
        };
        let previous = Role::normalize(current.as_deref());

        if role.consumes_seat() && !previous.consumes_seat() {
            let used: i64 = sqlx::query_scalar(COUNT_SEAT_HOLDERS)
                .bind(Self::seat_labels())
                .fetch_one(&mut *tx)
                .await?;
            let used = u32::try_from(used).unwrap_or(u32::MAX);
            if used >= total {
                tx.rollback().await?;
                return Ok(ConditionalRoleUpdate::CapacityExhausted(SeatCohort::new(
                    total, used,
                )));
            }
        }

        sqlx::query(
            "UPDATE member_profiles SET role = $2, access_released = $3, updated_utc = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(role.as_str())
        .bind(role.consumes_seat())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ConditionalRoleUpdate::Applied { previous })
    }

    async fn save_profile(&self, profile: &ProfileRecord) -> Result<u64, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE member_profiles SET
                onboarding_done = $2,
                leadership_onboarding_done = $3,
                show_email = $4,
                show_phone = $5,
                display_name = $6,
                bio = $7,
                photo_url = $8,
                legal_name = $9,
                contact_email = $10,
                phone = $11,
                updated_utc = $12,
                deactivated_utc = $13
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(profile.onboarding_done)
        .bind(profile.leadership_onboarding_done)
        .bind(profile.show_email)
        .bind(profile.show_phone)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(&profile.photo_url)
        .bind(&profile.legal_name)
        .bind(&profile.contact_email)
        .bind(&profile.phone)
        .bind(profile.updated_utc)
        .bind(profile.deactivated_utc)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                ServiceError::Database(e)
            })?;
        Ok(())
    }
}

#[async_trait]
impl AuditTrail for Database {
    async fn append(&self, entry: &AuditLogEntry) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO member_audit_log (id, actor_id, action, target_id, details, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.target_id)
        .bind(Json(&entry.details))
        .bind(entry.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn escalate(&self, incident: &OperatorIncident) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO operator_incidents (
                id, actor_id, target_id, operation, intended_role, observed_role, created_utc
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(incident.id)
        .bind(incident.actor_id)
        .bind(incident.target_id)
        .bind(&incident.operation)
        .bind(incident.intended_role.as_str())
        .bind(incident.observed_role.as_str())
        .bind(incident.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
