//! Execution parameters as the user typed them.

use std::fmt;

use anyhow::{Context, Result};
use sflow_core::config::{Config, OutputFormat};
use sflow_core::core::computation::ExecParams;

/// Parameter names accepted by `.<param> <value>` in the prompt.
pub const NAMES: [&str; 5] = ["start", "stop", "resolution", "max_delay", "output"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    pub start: Option<String>,
    pub stop: Option<String>,
    pub resolution: Option<String>,
    pub max_delay: Option<String>,
    pub output: OutputFormat,
}

impl Params {
    pub fn from_config(config: &Config) -> Self {
        Self {
            start: Some(config.start.clone()).filter(|s| !s.trim().is_empty()),
            stop: config.stop.clone(),
            resolution: config.resolution.clone(),
            max_delay: config.max_delay.clone(),
            output: config.output,
        }
    }

    /// Sets one parameter; an empty or missing value clears it.
    ///
    /// The value is checked when the program runs, not here, so relative
    /// times keep their meaning.
    pub fn set(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        match name {
            "start" => self.start = value,
            "stop" => self.stop = value,
            "resolution" => self.resolution = value,
            "max_delay" => self.max_delay = value,
            "output" => {
                self.output = match value {
                    Some(v) => v.parse()?,
                    None => OutputFormat::default(),
                };
            }
            _ => anyhow::bail!(
                "Unknown parameter '{name}'. Valid options: {}",
                NAMES.join(", ")
            ),
        }
        Ok(())
    }

    /// Resolves time expressions against `now_ms`.
    pub fn resolve(&self, now_ms: i64) -> Result<ExecParams> {
        ExecParams::parse(
            self.start.as_deref(),
            self.stop.as_deref(),
            self.resolution.as_deref(),
            self.max_delay.as_deref(),
            now_ms,
        )
        .context("invalid execution parameter")
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        writeln!(f, "start      = {}", show(&self.start))?;
        writeln!(f, "stop       = {}", show(&self.stop))?;
        writeln!(f, "resolution = {}", show(&self.resolution))?;
        writeln!(f, "max_delay  = {}", show(&self.max_delay))?;
        write!(f, "output     = {}", self.output)
    }
}
