use serde::{Deserialize, Serialize};

/// Founding-cohort occupancy. `used` is always a fresh server-side count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCohort {
    pub total: u32,
    pub used: u32,
}

impl SeatCohort {
    pub fn new(total: u32, used: u32) -> Self {
        Self { total, used }
    }
}
