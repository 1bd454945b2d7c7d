//! Graph mode: CSV rows piped into an external plotting command.

use std::io::{self, BufWriter};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use sflow_core::core::computation::{ExecParams, Executor};
use sflow_core::core::session::{self, SessionReport};
use sflow_core::render::CsvSink;
use tracing::debug;

pub fn stream<E: Executor>(
    executor: &E,
    command: Option<&str>,
    program: &str,
    params: &ExecParams,
    interrupted: &dyn Fn() -> bool,
) -> Result<SessionReport> {
    let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        anyhow::bail!("graph output needs `graph_command` in config.toml");
    };

    debug!(command, "spawning graph command");
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn graph command '{command}'"))?;
    let stdin = child
        .stdin
        .take()
        .context("graph command has no stdin")?;

    let mut sink = CsvSink::new(BufWriter::new(stdin), io::stderr());
    let result = session::execute_and_stream(executor, program, params, &mut sink, interrupted);
    // Closing the pipe tells the command the data is complete.
    drop(sink);

    let status = child.wait().context("wait for graph command")?;
    let report = result?;
    if !status.success() {
        anyhow::bail!("graph command '{command}' exited with {status}");
    }
    Ok(report)
}
