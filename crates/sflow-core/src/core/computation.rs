//! Computation handles and the executors that start them.
//!
//! The wire protocol to the analytics backend lives outside this crate; a
//! backend client plugs in by implementing [`Executor`] and [`Computation`].

use std::ops::{Deref, DerefMut};

use sflow_types::{ComputationMessage, Metadata, SeriesId};
use tracing::debug;

use crate::error::{ExecutionError, SessionError};
use crate::timeexpr::{self, TimeExprError};

/// Execution parameters, already resolved to epoch or duration milliseconds.
///
/// They are handed to the executor unmodified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecParams {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub resolution: Option<i64>,
    pub max_delay: Option<i64>,
}

impl ExecParams {
    /// Parses time expressions relative to `now_ms`.
    ///
    /// # Errors
    /// Returns the first expression that fails to parse.
    pub fn parse(
        start: Option<&str>,
        stop: Option<&str>,
        resolution: Option<&str>,
        max_delay: Option<&str>,
        now_ms: i64,
    ) -> Result<Self, TimeExprError> {
        let timestamp = |expr: Option<&str>| {
            expr.filter(|e| !e.trim().is_empty())
                .map(|e| timeexpr::parse_timestamp(e, now_ms))
                .transpose()
        };
        let duration = |expr: Option<&str>| {
            expr.filter(|e| !e.trim().is_empty())
                .map(timeexpr::parse_duration)
                .transpose()
        };

        Ok(Self {
            start: timestamp(start)?,
            stop: timestamp(stop)?,
            resolution: duration(resolution)?,
            max_delay: duration(max_delay)?,
        })
    }
}

/// A running computation.
pub trait Computation {
    /// Pulls the next message, blocking until one is available.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    ///
    /// # Errors
    /// Returns [`SessionError::StreamFault`] if the computation fails mid-stream.
    fn next_message(&mut self) -> Result<Option<ComputationMessage>, SessionError>;

    /// Metadata of a series, if the computation has received it.
    fn metadata(&self, id: &SeriesId) -> Option<&Metadata>;

    /// Series with metadata so far, in the order they became known.
    fn known_series(&self) -> Vec<SeriesId>;

    /// Logical timestamp of the most recent data batch.
    fn last_logical_timestamp(&self) -> Option<i64>;

    /// Compute resolution in milliseconds, once known.
    fn resolution(&self) -> Option<i64>;

    /// Releases the computation's resources.
    fn close(&mut self);
}

/// Starts computations.
pub trait Executor {
    type Computation: Computation;

    /// Submits `program` for execution.
    ///
    /// # Errors
    /// Returns an [`ExecutionError`] when the request is rejected.
    fn execute(
        &self,
        program: &str,
        params: &ExecParams,
    ) -> Result<Self::Computation, ExecutionError>;
}

/// Owns a computation for the length of a session and closes it exactly once,
/// whichever way the session ends.
pub struct ComputationGuard<C: Computation> {
    inner: C,
    released: bool,
}

impl<C: Computation> ComputationGuard<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            released: false,
        }
    }

    /// Closes the computation; later calls are no-ops.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!("closing computation");
            self.inner.close();
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<C: Computation> Deref for ComputationGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: Computation> DerefMut for ComputationGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.inner
    }
}

impl<C: Computation> Drop for ComputationGuard<C> {
    fn drop(&mut self) {
        self.release();
    }
}
