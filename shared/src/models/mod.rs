//! Domain models for the Warehouse Operations Backend

mod counting;
mod master;
mod stage;
mod stats;

pub use counting::*;
pub use master::*;
pub use stage::*;
pub use stats::*;
