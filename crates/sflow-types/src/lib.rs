//! Shared SignalFlow types: computation messages, series ids and values.

pub mod message;
pub mod value;

pub use message::{ComputationMessage, Metadata, SeriesId};
pub use value::Value;
