use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Storage temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("Caller is not authorized for this operation")]
    Unauthorized,

    #[error("No seats left in the founding cohort ({used}/{total} used)")]
    CapacityExhausted { used: u32, total: u32 },

    #[error("Member {0} not found")]
    TargetNotFound(Uuid),

    #[error(
        "Write for member {target_id} reported success but stored role is {observed}, expected {intended}"
    )]
    WriteRejected {
        target_id: Uuid,
        intended: Role,
        observed: Role,
    },

    #[error("Invalid role transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl ServiceError {
    /// Errors worth retrying: connectivity and pool exhaustion, never
    /// business-rule or permission failures.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Unavailable(_) => true,
            ServiceError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Unavailable(e) => AppError::ServiceUnavailable(e),
            ServiceError::Unauthorized => AppError::Forbidden(anyhow::anyhow!(
                "Caller is not authorized for this operation"
            )),
            e @ ServiceError::CapacityExhausted { .. } => AppError::BusinessRule {
                code: "capacity_exhausted",
                message: e.to_string(),
            },
            e @ ServiceError::TargetNotFound(_) => AppError::NotFound(anyhow::anyhow!(e)),
            e @ ServiceError::WriteRejected { .. } => AppError::StorageRejected(anyhow::anyhow!(e)),
            ServiceError::InvalidTransition(e) => AppError::UnprocessableEntity(anyhow::anyhow!(e)),
            ServiceError::Validation(e) => AppError::ValidationError(e),
        }
    }
}
