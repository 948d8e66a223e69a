//! Relationship and resource authorization.

pub mod relationship;

pub use relationship::{AuthzOutcome, RelationshipAuthorizer};
