//! Diagnostic logging.
//!
//! stdout and stderr belong to the renderers (the dashboard redraws in place,
//! CSV rows must stay parseable), so log records go to
//! `$SIGNALFLOW_HOME/signalflow.log` instead.
//!
//! The filter is read from `SIGNALFLOW_LOG` (`RUST_LOG` syntax) and defaults
//! to `warn`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::paths;

const FILTER_ENV: &str = "SIGNALFLOW_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Initializes file logging under the SignalFlow home directory.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init() -> Result<()> {
    init_at(&paths::log_path())
}

/// Initializes file logging to the given file.
///
/// Calling this more than once is harmless; only the first subscriber wins.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init_at(path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map_or_else(|| "signalflow.log".into(), |n| n.to_string_lossy().into_owned());

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let filter =
        EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let appender = tracing_appender::rolling::never(dir, file_name);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_target(true);

    // A subscriber may already be installed (tests, repeated init).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    Ok(())
}
