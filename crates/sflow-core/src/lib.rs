//! Core SignalFlow console library (sessions, renderers, config).

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod logging;
pub mod render;
pub mod series;
pub mod timeexpr;
