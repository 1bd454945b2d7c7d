//! Runtime output modes.
//!
//! - `live`: Self-redrawing dashboard on stdout
//! - `csv`: CSV rows on stdout, status notes on stderr
//! - `graph`: CSV rows piped into the configured plotting command

mod graph;

use std::{fmt, io};

use anyhow::{Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use sflow_core::config::{Config, OutputFormat};
use sflow_core::core::computation::Executor;
use sflow_core::core::interrupt;
use sflow_core::core::session::{self, SessionOutcome, SessionReport};
use sflow_core::error::SessionError;
use sflow_core::render::live::{self, CursorDebt};
use sflow_core::render::{CsvSink, TerminalRenderer};
use tracing::info;

use crate::params::Params;

/// A failure the output has already shown to the user.
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "computation request failed")
    }
}

impl std::error::Error for AlreadyReported {}

/// Everything needed to run programs: where computations come from and how
/// results are shown.
pub struct Console<E: Executor> {
    pub executor: E,
    pub config: Config,
    pub tz: Tz,
    /// Lines the live dashboard still owes below the cursor.
    pub cursor: CursorDebt,
}

impl<E: Executor> Console<E> {
    /// Executes `program` and streams its output until it ends or the user
    /// interrupts it.
    ///
    /// # Errors
    /// Returns an error if a parameter does not parse, the request is
    /// rejected or the stream fails.
    pub fn stream(&self, program: &str, params: &Params) -> Result<SessionOutcome> {
        let exec_params = params.resolve(Utc::now().timestamp_millis())?;
        info!(output = %params.output, ?exec_params, "executing program");

        interrupt::reset();
        let interrupted = interrupt::is_interrupted;
        let result: Result<SessionReport> = match params.output {
            OutputFormat::Live => {
                let mut sink =
                    TerminalRenderer::new(io::stdout().lock(), self.tz, &self.config.display)
                        .context("configure live output")?
                        .with_width(live::terminal_width())
                        .with_cursor_debt(self.cursor.clone());
                session::execute_and_stream(
                    &self.executor,
                    program,
                    &exec_params,
                    &mut sink,
                    &interrupted,
                )
                .map_err(Into::into)
            }
            OutputFormat::Csv => {
                let mut sink = CsvSink::new(io::stdout().lock(), io::stderr());
                session::execute_and_stream(
                    &self.executor,
                    program,
                    &exec_params,
                    &mut sink,
                    &interrupted,
                )
                .map_err(Into::into)
            }
            OutputFormat::Graph => graph::stream(
                &self.executor,
                self.config.graph_command.as_deref(),
                program,
                &exec_params,
                &interrupted,
            ),
        };
        interrupt::reset();

        let report = match result {
            Ok(report) => report,
            // The sink printed the rejection in place of the status line.
            Err(err) if is_request_failure(&err) => return Err(AlreadyReported.into()),
            Err(err) => return Err(err.context("stream computation")),
        };
        for diagnostic in &report.diagnostics {
            eprintln!("warning: {diagnostic}");
        }
        Ok(report.outcome)
    }
}

fn is_request_failure(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::ExecutionRequestFailed(_))
    )
}
