//! Exec command handler: run one program and exit.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sflow_core::core::computation::Executor;
use sflow_core::core::interrupt::InterruptedError;
use sflow_core::core::session::SessionOutcome;

use crate::modes::Console;
use crate::params::Params;

/// Reads the program from `program_file` (or stdin when absent or `-`) and
/// streams it.
pub fn run<E: Executor>(
    console: &Console<E>,
    params: &Params,
    program_file: Option<&Path>,
) -> Result<()> {
    let program = match program_file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("read program from {}", path.display()))?,
        _ => {
            let mut program = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut program)
                .context("read program from stdin")?;
            program
        }
    };
    if program.trim().is_empty() {
        anyhow::bail!("No program provided");
    }

    match console.stream(&program, params)? {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::Interrupted => Err(InterruptedError.into()),
    }
}
