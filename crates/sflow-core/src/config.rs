//! Configuration management for the SignalFlow console.
//!
//! Loads configuration from ${SIGNALFLOW_HOME}/config.toml with sensible defaults.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// How computation results are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Self-redrawing terminal dashboard with sparklines.
    #[default]
    Live,
    /// CSV rows on stdout.
    Csv,
    /// CSV rows piped into an external plotting command.
    Graph,
}

impl OutputFormat {
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Live, OutputFormat::Csv, OutputFormat::Graph]
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputFormat::Live => "live",
            OutputFormat::Csv => "csv",
            OutputFormat::Graph => "graph",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(OutputFormat::Live),
            "csv" => Ok(OutputFormat::Csv),
            "graph" => Ok(OutputFormat::Graph),
            _ => anyhow::bail!("Unknown output format '{s}'. Valid options: live, csv, graph"),
        }
    }
}

/// Dashboard rendering knobs.
///
/// Older releases disagreed on several of these (glyph used for flat
/// windows, number of events kept), so they are all configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Number of ticks kept per sparkline.
    pub sparkline_width: usize,
    /// Number of recent events shown under the dashboard.
    pub event_capacity: usize,
    /// Glyph ramp; index 0 renders missing values.
    pub ticks: String,
    /// Index into `ticks` used for windows whose values are all equal.
    pub flat_tick: usize,
    /// Column width of the series name.
    pub identity_width: usize,
}

impl DisplayConfig {
    const DEFAULT_SPARKLINE_WIDTH: usize = 10;
    const DEFAULT_EVENT_CAPACITY: usize = 5;
    const DEFAULT_TICKS: &str = " ▁▂▃▅▆▇";
    const DEFAULT_FLAT_TICK: usize = 3;
    const DEFAULT_IDENTITY_WIDTH: usize = 60;

    /// Returns the glyph ramp as individual characters.
    pub fn tick_glyphs(&self) -> Vec<char> {
        self.ticks.chars().collect()
    }

    /// Checks the values can drive a sparkline and an event list.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        let ramp = self.ticks.chars().count();
        if self.sparkline_width == 0 {
            anyhow::bail!("display.sparkline_width must be at least 1");
        }
        if self.event_capacity == 0 {
            anyhow::bail!("display.event_capacity must be at least 1");
        }
        if ramp < 3 {
            anyhow::bail!("display.ticks needs at least 3 glyphs (blank, minimum, maximum), got {ramp}");
        }
        if self.flat_tick >= ramp {
            anyhow::bail!(
                "display.flat_tick ({}) is out of range for {} glyphs",
                self.flat_tick,
                ramp
            );
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sparkline_width: Self::DEFAULT_SPARKLINE_WIDTH,
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
            ticks: Self::DEFAULT_TICKS.to_string(),
            flat_tick: Self::DEFAULT_FLAT_TICK,
            identity_width: Self::DEFAULT_IDENTITY_WIDTH,
        }
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for configuration and data files.
    //!
    //! SIGNALFLOW_HOME resolution order:
    //! 1. SIGNALFLOW_HOME environment variable (if set)
    //! 2. ~/.config/signalflow (default)

    use std::path::PathBuf;

    /// Returns the SignalFlow home directory.
    pub fn signalflow_home() -> PathBuf {
        if let Ok(home) = std::env::var("SIGNALFLOW_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".signalflow"),
            |h| h.join(".config").join("signalflow"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        signalflow_home().join("config.toml")
    }

    /// Returns the path to the prompt history file.
    pub fn history_path() -> PathBuf {
        signalflow_home().join("history")
    }

    /// Returns the path to the log file.
    pub fn log_path() -> PathBuf {
        signalflow_home().join("signalflow.log")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display timezone (IANA name)
    pub timezone: String,

    /// Default output format
    pub output: OutputFormat,

    /// Start timestamp or relative offset
    pub start: String,

    /// Stop timestamp or relative offset
    pub stop: Option<String>,

    /// Compute resolution
    pub resolution: Option<String>,

    /// Maximum data wait
    pub max_delay: Option<String>,

    /// Command receiving CSV rows for graph output
    pub graph_command: Option<String>,

    /// Dashboard rendering settings
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    const DEFAULT_TIMEZONE: &str = "US/Pacific";
    const DEFAULT_START: &str = "-1m";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };
        config
            .display
            .validate()
            .with_context(|| format!("Invalid display settings in {}", path.display()))?;
        Ok(config)
    }

    /// Resolves the configured display timezone.
    pub fn tz(&self) -> Result<Tz> {
        parse_timezone(&self.timezone)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: Self::DEFAULT_TIMEZONE.to_string(),
            output: OutputFormat::default(),
            start: Self::DEFAULT_START.to_string(),
            stop: None,
            resolution: None,
            max_delay: None,
            graph_command: None,
            display: DisplayConfig::default(),
        }
    }
}

/// Parses an IANA timezone name such as `UTC` or `Europe/Paris`.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("Unknown timezone '{name}': {e}"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.timezone, "US/Pacific");
        assert_eq!(config.output, OutputFormat::Live);
        assert_eq!(config.display.sparkline_width, 10);
        assert_eq!(config.display.event_capacity, 5);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "output = \"csv\"\n[display]\nevent_capacity = 3\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.output, OutputFormat::Csv);
        assert_eq!(config.display.event_capacity, 3);
        assert_eq!(config.display.sparkline_width, 10);
        assert_eq!(config.start, "-1m");
    }

    #[test]
    fn test_load_rejects_out_of_range_flat_tick() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "[display]\nticks = \" ▁█\"\nflat_tick = 5\n").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("flat_tick"));
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("timezone = \"US/Pacific\""));
        assert!(contents.contains("# resolution ="));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_template_matches_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.timezone, defaults.timezone);
        assert_eq!(parsed.start, defaults.start);
        assert_eq!(parsed.display, defaults.display);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("UTC").unwrap(), Tz::UTC);
        assert!(parse_timezone("Mars/Olympus").is_err());
    }
}
