//! # Logging Utilities
//!
//! Logging infrastructure for symvar using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Pretty (development) and JSON (machine-readable) output
//! - Environment variable configuration
//! - An optional log file next to the console output
//!
//! Console output goes to **stderr**: stdout is reserved for the values the
//! `symvar` CLI prints, so they can be piped into other tools.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use symvar_utils::init_logging;
//!
//! // Keep the guard alive until the program exits, or buffered file output is lost
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=symvar_core=trace`)
//! - `SYMVAR_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `SYMVAR_LOG_FILE`: Optional path to a log file (rotated daily)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use chrono::Local;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "SYMVAR_LOG_FORMAT";
/// Environment variable naming an extra log file
pub const LOG_FILE_ENV: &str = "SYMVAR_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
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
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
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
    /// Every byte moved in or out of memory
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
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!(
                "Unknown log level: {s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            )),
        }
    }
}

/// Keeps the background file writer alive
///
/// Dropping the guard flushes and stops file logging.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// - `RUST_LOG`: level filter, defaults to `warn`
/// - `SYMVAR_LOG_FORMAT`: `json` or `pretty`
/// - `SYMVAR_LOG_FILE`: optional log file
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `SYMVAR_LOG_FORMAT` holds an unknown format
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = match env::var(LOG_FORMAT_ENV) {
        Ok(value) => LogFormat::from_str(&value).map_err(LoggingError::InvalidFormat)?,
        Err(_) => LogFormat::Pretty,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()));
    init_console(format, filter)
}

/// Initialize logging with an explicit level and format
///
/// The level overrides `RUST_LOG`; `SYMVAR_LOG_FILE` is still honoured.
///
/// ## Example
///
/// ```rust,no_run
/// use symvar_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_console(format, EnvFilter::new(Level::from(level).to_string()))
}

/// Initialize file-only logging into a dated file under `dir`
///
/// The file is named `YYYY-MM-DD-symvar.log` and appended to by every run of
/// that day. Nothing is written to the console.
///
/// ## Errors
///
/// Returns an error if `dir` cannot be created or logging is already initialized.
pub fn init_logging_to_dir(dir: &Path, level: LogLevel) -> Result<(PathBuf, LoggingGuard), LoggingError>
{
    fs::create_dir_all(dir)?;
    let file_name = format!("{}-symvar.log", Local::now().format("%Y-%m-%d"));
    let path = dir.join(&file_name);

    let (layer, guard) = file_layer(
        tracing_appender::rolling::never(dir, file_name),
        LogFormat::Pretty,
        EnvFilter::new(Level::from(level).to_string()),
    );
    try_init(vec![layer])?;
    Ok((path, LoggingGuard { _file: Some(guard) }))
}

fn init_console(format: LogFormat, filter: EnvFilter) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![console_layer(format, filter.clone())];
    let mut guard = LoggingGuard::default();

    if let Some(file_path) = env::var(LOG_FILE_ENV).ok().map(PathBuf::from) {
        let dir = file_path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let file_name = file_path
            .file_name()
            .ok_or_else(|| LoggingError::InitializationFailed(format!("{LOG_FILE_ENV} has no file name")))?;
        let (layer, file_guard) = file_layer(tracing_appender::rolling::daily(dir, file_name), format, filter);
        layers.push(layer);
        guard._file = Some(file_guard);
    }

    try_init(layers)?;
    Ok(guard)
}

fn try_init(layers: Vec<BoxedLayer>) -> Result<(), LoggingError>
{
    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(
    appender: tracing_appender::rolling::RollingFileAppender,
    format: LogFormat,
    filter: EnvFilter,
) -> (BoxedLayer, WorkerGuard)
{
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    (layer, guard)
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
