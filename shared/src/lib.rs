//! Shared types and models for the Warehouse Operations Backend
//!
//! This crate contains the domain types and the pure counting/stage logic
//! shared between the backend server and its test suites.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
