//! Runs one computation from request to release.
//!
//! A session pulls messages one at a time and hands each to a [`Sink`]. It
//! ends when the stream ends, the interrupt flag is raised or a fault
//! occurs; in every case the sink is finished first and the computation is
//! released exactly once afterwards.

use sflow_types::ComputationMessage;
use tracing::{debug, info, warn};

use crate::core::computation::{Computation, ComputationGuard, ExecParams, Executor};
use crate::error::SessionError;
use crate::render::Sink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stream ended on its own.
    Completed,
    /// The user interrupted the stream.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    /// Messages pulled from the computation, including ignored ones.
    pub messages: usize,
    /// Non-fatal problems reported by the sink.
    pub diagnostics: Vec<String>,
}

/// Requests a computation and streams it into `sink`.
///
/// # Errors
/// Returns [`SessionError::ExecutionRequestFailed`] if the executor rejects
/// the program (the sink has been told via [`Sink::request_failed`]), or
/// any error from [`run`].
pub fn execute_and_stream<E: Executor>(
    executor: &E,
    program: &str,
    params: &ExecParams,
    sink: &mut dyn Sink,
    interrupted: &dyn Fn() -> bool,
) -> Result<SessionReport, SessionError> {
    sink.announce()?;
    let computation = match executor.execute(program, params) {
        Ok(computation) => computation,
        Err(err) => {
            warn!(error = %err, "computation request failed");
            sink.request_failed(&err)?;
            return Err(err.into());
        }
    };
    run(computation, sink, interrupted)
}

/// Streams an already started computation into `sink`.
///
/// `interrupted` is polled before every pull.
///
/// # Errors
/// Returns the first stream or output fault. The sink is finished and the
/// computation released before the error is returned.
pub fn run<C: Computation>(
    computation: C,
    sink: &mut dyn Sink,
    interrupted: &dyn Fn() -> bool,
) -> Result<SessionReport, SessionError> {
    let mut guard = ComputationGuard::new(computation);
    let mut messages = 0;

    let pumped = pump(&mut guard, sink, interrupted, &mut messages);
    let finished = sink.finish();
    guard.release();

    let outcome = pumped?;
    finished?;
    info!(?outcome, messages, "session ended");
    Ok(SessionReport {
        outcome,
        messages,
        diagnostics: sink.diagnostics(),
    })
}

fn pump<C: Computation>(
    computation: &mut ComputationGuard<C>,
    sink: &mut dyn Sink,
    interrupted: &dyn Fn() -> bool,
    messages: &mut usize,
) -> Result<SessionOutcome, SessionError> {
    loop {
        if interrupted() {
            debug!("session interrupted");
            return Ok(SessionOutcome::Interrupted);
        }
        let Some(message) = computation.next_message()? else {
            return Ok(SessionOutcome::Completed);
        };
        *messages += 1;
        if matches!(message, ComputationMessage::Unknown) {
            debug!("unknown message kind");
        }
        sink.handle(&message, &**computation)?;
    }
}
