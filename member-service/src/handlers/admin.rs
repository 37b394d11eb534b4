use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::ResolvedMember;
use crate::models::Role;
use crate::services::RoleChange;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct PromoteRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
    #[validate(length(max = 500, message = "Context must be at most 500 characters"))]
    pub context: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AdminActionRequest {
    #[validate(length(max = 500, message = "Context must be at most 500 characters"))]
    pub context: Option<String>,
}

pub async fn promote(
    State(state): State<AppState>,
    ResolvedMember(actor): ResolvedMember,
    Path(target_id): Path<Uuid>,
    Json(req): Json<PromoteRequest>,
) -> Result<Json<RoleChange>, AppError> {
    req.validate()?;

    // Unknown labels are rejected here instead of falling back to awaiting approval.
    let role: Role = req
        .role
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    let change = state
        .promotions
        .promote(&actor, target_id, role, req.context)
        .await?;
    Ok(Json(change))
}

pub async fn demote(
    State(state): State<AppState>,
    ResolvedMember(actor): ResolvedMember,
    Path(target_id): Path<Uuid>,
    body: Option<Json<AdminActionRequest>>,
) -> Result<Json<RoleChange>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;

    let change = state.promotions.demote(&actor, target_id, req.context).await?;
    Ok(Json(change))
}

pub async fn remove_access(
    State(state): State<AppState>,
    ResolvedMember(actor): ResolvedMember,
    Path(target_id): Path<Uuid>,
    body: Option<Json<AdminActionRequest>>,
) -> Result<Json<RoleChange>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;

    let change = state
        .promotions
        .remove_access(&actor, target_id, req.context)
        .await?;
    Ok(Json(change))
}
