//! CLI entry and dispatch.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sflow_core::core::interrupt;
use sflow_core::core::replay::ReplayExecutor;
use sflow_core::render::live::CursorDebt;
use sflow_core::{config, logging};

use crate::modes::Console;
use crate::params::Params;

mod commands;

#[derive(Parser)]
#[command(name = "signalflow")]
#[command(version)]
#[command(about = "SignalFlow analytics console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Recorded computation transcript (JSON lines) to execute programs against
    #[arg(long, value_name = "TRANSCRIPT", env = "SIGNALFLOW_REPLAY")]
    replay: Option<PathBuf>,

    /// Pace replayed data by the compute resolution
    #[arg(long)]
    realtime: bool,

    /// Force non-interactive mode
    #[arg(short = 'x', long)]
    execute: bool,

    /// Start timestamp or delta (default from config: -1m)
    #[arg(short = 'a', long, value_name = "START")]
    start: Option<String>,

    /// Stop timestamp or delta (default: stream forever)
    #[arg(short = 'o', long, value_name = "STOP")]
    stop: Option<String>,

    /// Compute resolution (default: auto)
    #[arg(short = 'r', long, value_name = "RESOLUTION")]
    resolution: Option<String>,

    /// Maximum data wait (default: auto)
    #[arg(short = 'd', long = "max-delay", value_name = "MAX-DELAY")]
    max_delay: Option<String>,

    /// Output format (live, csv, graph)
    #[arg(long, value_name = "FORMAT")]
    output: Option<String>,

    /// Display timezone, e.g. UTC or Europe/Paris
    #[arg(long, value_name = "TZ")]
    timezone: Option<String>,

    /// File to read the program from (default: stdin)
    #[arg(value_name = "PROGRAM")]
    program: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::init() {
        eprintln!("warning: logging disabled: {err:#}");
    }
    interrupt::init()?;
    let cursor = CursorDebt::new();
    interrupt::set_restore_hook({
        let cursor = cursor.clone();
        move || cursor.settle()
    });

    dispatch(cli, cursor)
}

fn dispatch(cli: Cli, cursor: CursorDebt) -> Result<()> {
    let Cli {
        command,
        replay,
        realtime,
        execute,
        start,
        stop,
        resolution,
        max_delay,
        output,
        timezone,
        program,
    } = cli;

    if let Some(Commands::Config { command }) = command {
        return match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        };
    }

    let mut config = config::Config::load().context("load config")?;
    if let Some(tz) = timezone {
        config.timezone = tz;
    }
    let tz = config.tz()?;

    let mut params = Params::from_config(&config);
    for (name, value) in [
        ("start", start),
        ("stop", stop),
        ("resolution", resolution),
        ("max_delay", max_delay),
        ("output", output),
    ] {
        if let Some(value) = value {
            params.set(name, Some(value.as_str()))?;
        }
    }

    let Some(transcript) = replay else {
        anyhow::bail!(
            "No computation source. Pass --replay <TRANSCRIPT> or set SIGNALFLOW_REPLAY."
        );
    };
    let console = Console {
        executor: ReplayExecutor::new(transcript).realtime(realtime),
        config,
        tz,
        cursor,
    };

    if std::io::stdin().is_terminal() && !execute && program.is_none() {
        commands::prompt::run(&console, params)
    } else {
        commands::exec::run(&console, &params, program.as_deref())
    }
}
