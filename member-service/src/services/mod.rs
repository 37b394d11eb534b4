//! Services layer for member-service.
//!
//! The access engine (bootstrap, session, gate, seats, promotions) plus the
//! stores it runs against.

pub mod access_policy;
pub mod bootstrap;
mod database;
pub mod error;
pub mod gate;
mod memory;
pub mod metrics;
pub mod profile;
pub mod promotion;
pub mod seat_allocator;
pub mod session;
pub mod store;

pub use access_policy::{AccessPolicy, AccessSummary};
pub use bootstrap::{BootstrapAttempt, BootstrapConfig, BootstrapOutcome, IdentityBootstrapper};
pub use database::Database;
pub use error::ServiceError;
pub use gate::{AccessGate, GateOutcome, GatePaths, GateState, RouteTable, Surface};
pub use memory::MemoryStore;
pub use profile::ProfileService;
pub use promotion::{AdminPromotionWorkflow, RoleChange};
pub use seat_allocator::SeatAllocator;
pub use session::{SessionContext, SessionState};
pub use store::{AuditTrail, ConditionalRoleUpdate, ProfileStore};
