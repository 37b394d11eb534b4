pub mod identity;

pub use identity::{identity_from_headers, ResolvedMember, SessionIdentity, SUBJECT_HEADER};
