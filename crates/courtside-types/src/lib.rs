//! Shared domain types for the Courtside project.

pub mod config;
pub mod events;
pub mod metrics;
pub mod roster;

mod errors;

pub use errors::{CourtsideError, Result};
