//! Savings goal (piggybank) entities.

pub mod model;

pub use model::SavingsGoal;
