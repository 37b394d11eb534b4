pub mod audit_log;
pub mod identity;
pub mod incident;
pub mod profile;
pub mod role;
pub mod seat;

pub use audit_log::{AuditAction, AuditDetails, AuditLogEntry};
pub use identity::{Identity, SessionToken};
pub use incident::OperatorIncident;
pub use profile::{OnboardingStep, ProfileRecord, ProfileRow, ProfileUpdate};
pub use role::{normalize, Role};
pub use seat::SeatCohort;
