//! Business logic services for the Warehouse Operations Backend

pub mod counting;
pub mod stage;
pub mod stats;

pub use counting::CountingService;
pub use stage::StageService;
pub use stats::StatsService;
