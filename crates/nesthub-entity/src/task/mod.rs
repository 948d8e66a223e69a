//! Task entities.

pub mod model;

pub use model::{Task, TaskStatus};
