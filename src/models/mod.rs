//! Domain models shared across the gapscope service.

pub mod gap;
pub mod price;
pub mod report;

pub use gap::{Direction, GapSignal, Magnitude};
pub use price::{PriceObservation, PriceView};
pub use report::{
    GapBreakdown, GapCheckResult, GapHistoryEntry, GapListResponse, GapSignalView, GapStatisticsDetail,
    GapStats,
};
