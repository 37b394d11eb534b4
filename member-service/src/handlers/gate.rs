use axum::{extract::State, Json};
use serde::Deserialize;
use service_core::error::AppError;
use validator::Validate;

use crate::middleware::SessionIdentity;
use crate::services::{BootstrapOutcome, GateOutcome, SessionState};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ClassifyRequest {
    #[validate(length(min = 1, max = 2048, message = "Path must be 1-2048 characters"))]
    pub path: String,
}

pub async fn classify(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<GateOutcome>, AppError> {
    req.validate()?;

    let subject_id = identity.as_ref().map(|i| i.subject_id);
    let session = match (state.bootstrapper.bootstrap(identity.as_ref()).await, subject_id) {
        (BootstrapOutcome::Resolved(profile), _) => SessionState::Resolved(profile),
        (BootstrapOutcome::Unresolved, Some(subject_id)) => SessionState::Unresolved { subject_id },
        _ => SessionState::Unauthenticated,
    };

    let outcome = state.gate.classify_session(&session, &req.path);
    tracing::debug!(path = %req.path, outcome = outcome.label(), "Gate decision");
    Ok(Json(outcome))
}
