//! Database models for the Warehouse Operations Backend
//!
//! Re-exports models from the shared crate and adds backend-specific models

pub use shared::models::*;
