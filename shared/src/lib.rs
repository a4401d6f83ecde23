//! Shared building blocks for the StockLedger platform
//!
//! This crate contains the pieces that must stay identical wherever they are
//! used: the moving-average costing arithmetic, the primitive input
//! validators, and common list/pagination types.

pub mod costing;
pub mod types;
pub mod validation;

pub use types::*;
