//! # Logging Utilities
//!
//! Logging infrastructure for refinery using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Pretty (development) and JSON (machine-readable) output
//! - Environment variable configuration
//! - An optional daily-rolling log file next to console output
//!
//! Console output goes to stderr so it never mixes with command output on
//! stdout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use refinery_utils::init_logging;
//!
//! // Initialize with default settings (reads from RUST_LOG env var)
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Log filter (e.g., `RUST_LOG=debug`, `RUST_LOG=refinery_core=trace`)
//! - `REFINERY_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `REFINERY_LOG_FILE`: Optional path to a log file (if not set, logs only to console)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fs, io};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const FORMAT_VAR: &str = "REFINERY_LOG_FORMAT";
const FILE_VAR: &str = "REFINERY_LOG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    Pretty,
    /// JSON format, one object per line
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default
    Info,
    Debug,
    /// Most verbose; logs every symbol the crawler creates
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
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Keeps the background log file writer alive.
///
/// Dropping the guard flushes and closes the log file; hold it until the
/// program exits.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log filter (default `info`)
/// - `REFINERY_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `REFINERY_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `REFINERY_LOG_FORMAT` holds an unknown format
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    let format = format_from_env()?.unwrap_or(LogFormat::Pretty);
    init_logging_internal(format, None, log_file_from_env())
}

/// Initialize logging with an explicit level and format
///
/// The level overrides `RUST_LOG`; `REFINERY_LOG_FILE` is still honored.
///
/// ## Example
///
/// ```rust,no_run
/// use refinery_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty).expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init_logging_internal(format, Some(level.into()), log_file_from_env())
}

/// Initialize logging from command line overrides, falling back to the
/// environment for anything not given.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or the environment
/// holds an unknown format.
pub fn init_logging_with_overrides(level: Option<LogLevel>, format: Option<LogFormat>) -> Result<LoggingGuard, LoggingError>
{
    let format = match format {
        Some(format) => format,
        None => format_from_env()?.unwrap_or(LogFormat::Pretty),
    };
    init_logging_internal(format, level.map(Into::into), log_file_from_env())
}

fn format_from_env() -> Result<Option<LogFormat>, LoggingError>
{
    env::var(FORMAT_VAR).ok().map(|value| value.parse()).transpose()
}

fn log_file_from_env() -> Option<PathBuf>
{
    env::var_os(FILE_VAR).map(PathBuf::from)
}

/// Build the filter. Priority:
/// 1. An explicit level (from a CLI flag)
/// 2. `RUST_LOG`, which may hold module-specific directives
/// 3. INFO
fn build_filter(explicit_level: Option<Level>) -> EnvFilter
{
    match explicit_level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
    }
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

fn file_layer(format: LogFormat, filter: EnvFilter, path: &Path) -> Result<(BoxedLayer, WorkerGuard), LoggingError>
{
    let directory = path.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    // The appender panics if it cannot create the directory itself.
    fs::create_dir_all(directory)?;
    let file_appender = tracing_appender::rolling::daily(directory, path.file_name().unwrap_or_default());
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    };
    Ok((layer, guard))
}

fn init_logging_internal(
    format: LogFormat,
    explicit_level: Option<Level>,
    log_file: Option<PathBuf>,
) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![console_layer(format, build_filter(explicit_level))];

    let mut file_guard = None;
    if let Some(path) = log_file {
        let (layer, guard) = file_layer(format, build_filter(explicit_level), &path)?;
        layers.push(layer);
        file_guard = Some(guard);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard { _file: file_guard })
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// The log file's directory could not be created
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
