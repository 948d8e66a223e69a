//! Family linkage entities.

pub mod model;

pub use model::FamilyLink;
