//! Per-series naming and value history.

pub mod identity;
pub mod sparkline;
