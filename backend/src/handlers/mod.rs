//! HTTP handlers for the Warehouse Operations Backend

pub mod admin;
pub mod counting;
pub mod health;
pub mod master;
pub mod stage;
pub mod stats;

pub use admin::*;
pub use counting::*;
pub use health::*;
pub use master::*;
pub use stage::*;
pub use stats::*;
