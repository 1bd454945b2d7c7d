//! Core module: computation lifecycle.
//!
//! This module contains:
//! - `computation`: Computation/executor traits and the release guard
//! - `interrupt`: Signal handling for graceful interruption
//! - `replay`: Executor that replays recorded transcripts
//! - `session`: The consume loop dispatching messages to a sink

pub mod computation;
pub mod interrupt;
pub mod replay;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
