//! # Logging Utilities
//!
//! Logging setup for Dwarview using `tracing`.
//!
//! Headless commands (`tree`, `attrs`, `search`, `info`) write their results to
//! stdout, so console logs go to stderr. The terminal browser owns the whole
//! screen and logs to a file only.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=debug`, `RUST_LOG=dwarview_core=debug`)
//! - `DWARVIEW_LOG_FORMAT`: `pretty` (default) or `json`
//! - `DWARVIEW_LOG_FILE`: also write logs to this file, rotated daily
//!
//! ## Example
//!
//! ```rust,no_run
//! use dwarview_utils::init_logging;
//!
//! // keep the guard alive so buffered file output is flushed on exit
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::info!("Application started");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "DWARVIEW_LOG_FORMAT";
const FILE_VAR: &str = "DWARVIEW_LOG_FILE";
const FILTER_VAR: &str = "RUST_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}. Use 'pretty' or 'json'")),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    Info,
    Debug,
    /// Most verbose
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Logging settings resolved from flags and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    pub format: LogFormat,
    /// Explicit level; overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    /// Filter directives from `RUST_LOG`
    pub directives: Option<String>,
    /// Additional log file
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration through a variable lookup function.
    ///
    /// An unparsable `DWARVIEW_LOG_FORMAT` falls back to pretty output.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        Self {
            format: lookup(FORMAT_VAR)
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            level: None,
            directives: lookup(FILTER_VAR).filter(|value| !value.trim().is_empty()),
            file: lookup(FILE_VAR).filter(|value| !value.is_empty()).map(PathBuf::from),
        }
    }

    /// Override the level from the command line.
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    /// Filter: explicit level, then `RUST_LOG` directives, then `info`.
    #[must_use]
    pub fn filter(&self) -> EnvFilter
    {
        if let Some(level) = self.level {
            return EnvFilter::new(Level::from(level).to_string());
        }
        self.directives
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(Level::INFO.to_string()))
    }
}

/// Keeps background log writers alive; drop it on exit to flush them.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init_with_config(&LogConfig::from_env())
}

/// Initialize logging with an explicit level and format.
///
/// `DWARVIEW_LOG_FILE` is still honoured.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    let mut config = LogConfig::from_env().with_level(Some(level));
    config.format = format;
    init_with_config(&config)
}

/// Initialize console (stderr) logging plus the optional log file.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_with_config(config: &LogConfig) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![layer(config.format, io::stderr, true, config.filter())];
    let mut file_worker = None;

    if let Some(path) = &config.file {
        let (directory, file_name) = split_log_path(path);
        let appender = tracing_appender::rolling::daily(directory, file_name);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(layer(config.format, writer, false, config.filter()));
        file_worker = Some(worker);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(LoggingGuard { _file: file_worker })
}

/// Initialize file-only logging for the terminal browser.
///
/// Logs go to `~/.dwarview/YYYY-MM-DD-dwarview-tui.log`, or the system temp
/// directory when `HOME` is not set. Returns the log path and the guard.
///
/// ## Errors
///
/// Returns an error if the log directory cannot be created or a subscriber is
/// already installed.
pub fn init_logging_for_tui(level: Option<LogLevel>) -> Result<(PathBuf, LoggingGuard), LoggingError>
{
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let home = env::var_os("HOME").map(PathBuf::from);
    let log_file = tui_log_path(home.as_deref(), &today);
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = LogConfig::from_env().with_level(level);
    let (directory, file_name) = split_log_path(&log_file);
    // the date is already part of the file name
    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    Registry::default()
        .with(layer(config.format, writer, false, config.filter()))
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok((log_file, LoggingGuard { _file: Some(worker) }))
}

/// Path of the browser's log file for a given day.
#[must_use]
pub fn tui_log_path(home: Option<&Path>, day: &str) -> PathBuf
{
    let file_name = format!("{day}-dwarview-tui.log");
    match home {
        Some(home) => home.join(".dwarview").join(file_name),
        None => env::temp_dir().join(file_name),
    }
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf)
{
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .map_or_else(|| PathBuf::from("dwarview.log"), PathBuf::from);
    (directory, file_name)
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        LogFormat::Pretty => base.with_ansi(ansi).with_filter(filter).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
    {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(LogFormat::from_str("yaml").is_err());
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert_eq!(LogLevel::from_str("Warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_level_to_tracing_level()
    {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
    }

    #[test]
    fn test_config_from_lookup()
    {
        let config = LogConfig::from_lookup(lookup(&[
            ("DWARVIEW_LOG_FORMAT", "json"),
            ("DWARVIEW_LOG_FILE", "/var/log/dwarview.log"),
            ("RUST_LOG", "dwarview_core=debug"),
        ]));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/var/log/dwarview.log")));
        assert_eq!(config.directives.as_deref(), Some("dwarview_core=debug"));
        assert_eq!(config.level, None);
    }

    #[test]
    fn test_config_defaults()
    {
        let config = LogConfig::from_lookup(lookup(&[("DWARVIEW_LOG_FORMAT", "xml"), ("DWARVIEW_LOG_FILE", "")]));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_explicit_level_wins()
    {
        let config = LogConfig::from_lookup(lookup(&[("RUST_LOG", "trace")])).with_level(Some(LogLevel::Warn));
        assert_eq!(config.level, Some(LogLevel::Warn));
        assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::WARN));

        let kept = config.clone().with_level(None);
        assert_eq!(kept.level, Some(LogLevel::Warn));
    }

    #[test]
    fn test_tui_log_path()
    {
        assert_eq!(
            tui_log_path(Some(Path::new("/home/dev")), "2026-10-18"),
            PathBuf::from("/home/dev/.dwarview/2026-10-18-dwarview-tui.log")
        );
        assert!(tui_log_path(None, "2026-10-18").ends_with("2026-10-18-dwarview-tui.log"));
    }

    #[test]
    fn test_split_log_path()
    {
        assert_eq!(
            split_log_path(Path::new("/tmp/logs/run.log")),
            (PathBuf::from("/tmp/logs"), PathBuf::from("run.log"))
        );
        assert_eq!(
            split_log_path(Path::new("run.log")),
            (PathBuf::from("."), PathBuf::from("run.log"))
        );
    }
}
