//! HTTP handlers for member-service.

pub mod admin;
pub mod gate;
pub mod members;
pub mod metrics;
pub mod seats;
pub mod session;
