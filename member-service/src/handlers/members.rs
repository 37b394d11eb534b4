use axum::{extract::State, Json};
use serde::Deserialize;
use service_core::error::AppError;

use crate::middleware::ResolvedMember;
use crate::models::{OnboardingStep, ProfileRecord, ProfileUpdate};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub step: OnboardingStep,
}

pub async fn update_me(
    State(state): State<AppState>,
    ResolvedMember(profile): ResolvedMember,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileRecord>, AppError> {
    let updated = state.profiles.update_profile(&profile, update).await?;
    Ok(Json(updated))
}

pub async fn complete_onboarding(
    State(state): State<AppState>,
    ResolvedMember(profile): ResolvedMember,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<ProfileRecord>, AppError> {
    let updated = state
        .profiles
        .complete_onboarding(&profile, req.step)
        .await?;
    Ok(Json(updated))
}

pub async fn close_account(
    State(state): State<AppState>,
    ResolvedMember(profile): ResolvedMember,
) -> Result<Json<ProfileRecord>, AppError> {
    let closed = state.profiles.close_account(&profile).await?;
    Ok(Json(closed))
}
