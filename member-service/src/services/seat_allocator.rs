//! Founding-cohort seat arithmetic and the read-through seat view.
//!
//! The allocator keeps no state of its own: `used` is re-counted by the store
//! every time. Admission itself happens inside
//! [`ProfileStore::set_role_within_capacity`], never as check-then-write here.

use std::sync::Arc;

use super::store::ProfileStore;
use super::ServiceError;
use crate::models::SeatCohort;

/// Seats still free. Zero when the cohort is full or overbooked.
pub fn remaining(cohort: &SeatCohort) -> u32 {
    cohort.total.saturating_sub(cohort.used)
}

pub fn has_capacity(cohort: &SeatCohort) -> bool {
    cohort.used < cohort.total
}

/// Whether admitting `n` more members would exceed capacity.
pub fn would_exceed(cohort: &SeatCohort, n: u32) -> bool {
    cohort.used.saturating_add(n) > cohort.total
}

/// Seats taken beyond capacity.
pub fn overbooked(cohort: &SeatCohort) -> u32 {
    cohort.used.saturating_sub(cohort.total)
}

#[derive(Clone)]
pub struct SeatAllocator {
    store: Arc<dyn ProfileStore>,
    total: u32,
}

impl SeatAllocator {
    pub fn new(store: Arc<dyn ProfileStore>, total: u32) -> Self {
        Self { store, total }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Fresh cohort view from the server-side count.
    pub async fn snapshot(&self) -> Result<SeatCohort, ServiceError> {
        let used = self.store.count_seat_holders().await?;
        let cohort = SeatCohort::new(self.total, used);
        report_overbooking(&cohort);
        Ok(cohort)
    }
}

/// Overbooking is never silent: it is logged every time it is observed.
/// The gauge tracks the latest observation, so it returns to zero on recovery.
/// Returns the excess that was reported.
pub(crate) fn report_overbooking(cohort: &SeatCohort) -> u32 {
    let excess = overbooked(cohort);
    metrics::gauge!("member_seats_overbooked").set(excess as f64);
    if excess > 0 {
        tracing::warn!(
            total = cohort.total,
            used = cohort.used,
            excess,
            "Founding cohort is overbooked"
        );
    }
    excess
}
