//! Gap query engine and price reconciliation.

pub mod clock;
pub mod gaps;
pub mod price;

#[cfg(test)]
pub(crate) mod testing;

pub use gaps::{GapEngine, GapFilter};
