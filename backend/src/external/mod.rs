//! External read-only inputs
//!
//! The item master flat file is owned and refreshed by the surrounding
//! system; the core only ever reads it through this capability.

pub mod item_master;

pub use item_master::{ItemMaster, SharedItemMaster};
