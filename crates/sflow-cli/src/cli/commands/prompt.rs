//! Interactive prompt.
//!
//! Program lines accumulate until an empty line, then run. Lines starting
//! with `.` show or set parameters and `!<file>` runs a program from a file.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::style::Stylize;
use sflow_core::config::paths;
use sflow_core::core::computation::Executor;
use sflow_core::core::interrupt;
use tracing::warn;

use crate::modes::{AlreadyReported, Console};
use crate::params::Params;

const PROMPT: &str = "-> ";
const CONTINUATION: &str = ">> ";

/// One unit of prompt input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    ShowParams,
    SetParam { name: String, value: Option<String> },
    RunFile(String),
    Program(String),
}

impl Input {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(rest) = text.strip_prefix('.') {
            let rest = rest.trim();
            if rest.is_empty() {
                return Some(Input::ShowParams);
            }
            let (name, value) = match rest.split_once(char::is_whitespace) {
                Some((name, value)) => (name, Some(value.trim().to_string())),
                None => (rest, None),
            };
            return Some(Input::SetParam {
                name: name.to_string(),
                value,
            });
        }
        if let Some(file) = text.strip_prefix('!') {
            return Some(Input::RunFile(file.trim().to_string()));
        }
        Some(Input::Program(text.to_string()))
    }
}

pub fn run<E: Executor>(console: &Console<E>, mut params: Params) -> Result<()> {
    print_banner();
    let history = paths::history_path();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    interrupt::reset();
    loop {
        interrupt::set_exit_on_interrupt(true);
        let text = read_program(&mut input, &mut out, interrupt::is_interrupted);
        interrupt::set_exit_on_interrupt(false);
        let Some(text) = text? else {
            break;
        };
        let Some(command) = Input::parse(&text) else {
            continue;
        };
        let program = match command {
            Input::ShowParams => {
                println!("{params}");
                continue;
            }
            Input::SetParam { name, value } => {
                match params.set(&name, value.as_deref()) {
                    Ok(()) => println!("{params}"),
                    Err(err) => eprintln!("{err:#}"),
                }
                continue;
            }
            Input::RunFile(file) => match fs::read_to_string(&file) {
                Ok(program) => {
                    println!("Executing program from {file}:");
                    println!("{program}");
                    program
                }
                Err(err) => {
                    eprintln!("Cannot read program from {file}: {err}");
                    continue;
                }
            },
            Input::Program(program) => program,
        };

        if let Err(err) = append_history(&history, &program) {
            warn!(error = %err, "cannot write prompt history");
        }
        // Errors end the program, not the prompt.
        if let Err(err) = console.stream(&program, &params)
            && err.downcast_ref::<AlreadyReported>().is_none()
        {
            eprintln!("{err:#}");
        }
    }

    println!();
    Ok(())
}

fn print_banner() {
    println!(
        "{} {} {}",
        "-*-".red().bold(),
        "SignalFlow Analytics Console".white().bold(),
        "-*-".red().bold()
    );
    println!();
    println!("{}", "Enter your program, then an empty line to execute.".bold());
    println!("SignalFlow programs may span multiple lines.");
    println!("Set parameters with \".<param> <value>\"; see current settings with \".\"");
    println!("Run a program from a file with \"!<file>\".");
    println!("To stop streaming press ^C; to exit press ^D.");
    println!();
}

/// Reads lines until an empty line ends the program.
///
/// Parameter and file commands end at their own line. Returns `None` at end
/// of input with nothing read, or once `interrupted` reports Ctrl+C.
fn read_program<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    interrupted: fn() -> bool,
) -> Result<Option<String>> {
    let mut program = String::new();
    loop {
        write!(out, "{}", if program.is_empty() { PROMPT } else { CONTINUATION })?;
        out.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line);
        if interrupted() {
            return Ok(None);
        }
        if read.context("read prompt input")? == 0 {
            return Ok(if program.is_empty() { None } else { Some(program) });
        }
        let line = line.trim_end_matches(['\n', '\r']);

        if program.is_empty() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('.') || trimmed.starts_with('!') {
                return Ok(Some(trimmed.to_string()));
            }
        } else if line.trim().is_empty() {
            return Ok(Some(program));
        }

        program.push_str(line);
        program.push('\n');
    }
}

/// Appends `program` to the history file, one `+`-prefixed line per program
/// line under a timestamp comment.
fn append_history(path: &Path, program: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create history directory {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open history file {}", path.display()))?;

    let mut entry = format!("\n# {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S%.6f"));
    for line in program.trim_end().lines() {
        entry.push('+');
        entry.push_str(line);
        entry.push('\n');
    }
    file.write_all(entry.as_bytes())
        .with_context(|| format!("write history file {}", path.display()))
}
