//! Output sinks for a computation's message stream.
//!
//! - `live`: self-redrawing terminal dashboard with sparklines
//! - `csv`: header + one row per data batch
//! - `text`: column helpers shared by the terminal output

pub mod csv;
pub mod live;
pub mod text;

use std::io;

use sflow_types::ComputationMessage;

use crate::core::computation::Computation;
use crate::error::ExecutionError;

pub use self::csv::{CsvOutput, CsvSerializer, CsvSink};
pub use self::live::TerminalRenderer;

/// Consumes a computation's messages and turns them into output.
pub trait Sink {
    /// Called once before the computation is requested.
    fn announce(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Called instead of any message handling when the request is rejected.
    fn request_failed(&mut self, _error: &ExecutionError) -> io::Result<()> {
        Ok(())
    }

    /// Handles one message. `computation` gives access to metadata and
    /// timing of the running computation.
    fn handle(
        &mut self,
        message: &ComputationMessage,
        computation: &dyn Computation,
    ) -> io::Result<()>;

    /// Called exactly once when the stream ends, however it ends.
    fn finish(&mut self) -> io::Result<()>;

    /// Problems that did not stop the session (unresolvable series names).
    fn diagnostics(&self) -> Vec<String> {
        Vec::new()
    }
}
