use axum::{extract::State, Json};
use serde::Serialize;
use service_core::error::AppError;

use crate::services::seat_allocator::{overbooked, remaining};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SeatsResponse {
    pub total: u32,
    pub used: u32,
    pub remaining: u32,
    pub overbooked: u32,
}

pub async fn get_seats(State(state): State<AppState>) -> Result<Json<SeatsResponse>, AppError> {
    let cohort = state.seats.snapshot().await?;

    Ok(Json(SeatsResponse {
        total: cohort.total,
        used: cohort.used,
        remaining: remaining(&cohort),
        overbooked: overbooked(&cohort),
    }))
}
