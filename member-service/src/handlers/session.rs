use axum::{extract::State, Json};
use serde::Serialize;

use crate::middleware::SessionIdentity;
use crate::models::ProfileRecord;
use crate::services::{AccessSummary, BootstrapOutcome};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessSummary>,
}

/// Bootstrap the caller's session. Never fails on a slow or unavailable
/// store; the status reports `unresolved` instead.
pub async fn get_session(
    State(state): State<AppState>,
    SessionIdentity(identity): SessionIdentity,
) -> Json<SessionResponse> {
    let outcome = state.bootstrapper.bootstrap(identity.as_ref()).await;
    let status = outcome.label();

    let response = match outcome {
        BootstrapOutcome::Resolved(profile) => SessionResponse {
            status,
            access: Some(AccessSummary::for_profile(&profile)),
            profile: Some(profile),
        },
        BootstrapOutcome::Unauthenticated | BootstrapOutcome::Unresolved => SessionResponse {
            status,
            profile: None,
            access: None,
        },
    };

    Json(response)
}
