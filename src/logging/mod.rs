//! Logging setup on top of `tracing`
//!
//! Lane programs emit `trace!` per tile and `debug!` per slot; the host emits
//! `info!` for launches and `warn!` for validation mismatches. Nothing is
//! printed until a subscriber is installed with one of the `init_*` functions.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: full filter directive, wins over everything else
//!   (e.g. `"info,pim_mha::kernel=trace"`)
//! - `PIM_MHA_LOG_LEVEL`: plain level (error, warn, info, debug, trace)
//! - `PIM_MHA_LOG_FORMAT`: `human` or `json`
//! - `PIM_MHA_LOG_FILE`: also append JSON lines to this file

use once_cell::sync::OnceCell;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();

const LOG_LEVEL_ENV: &str = "PIM_MHA_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "PIM_MHA_LOG_FORMAT";
const LOG_FILE_ENV: &str = "PIM_MHA_LOG_FILE";

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("failed to create log directory: {0}")]
    DirectoryCreationFailed(String),

    #[error("failed to open log file: {0}")]
    FileOpenFailed(String),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse a level name, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" | "console" => Some(LogFormat::Human),
            "json" | "structured" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include file and line of the call site
    pub with_file_info: bool,
    /// Emit span close events (shows per-lane and per-slot durations)
    pub with_span_events: bool,
    /// Also append JSON lines to this file
    pub log_file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_info(mut self, with_file_info: bool) -> Self {
        self.with_file_info = with_file_info;
        self
    }

    pub fn with_span_events(mut self, with_span_events: bool) -> Self {
        self.with_span_events = with_span_events;
        self
    }

    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_file = Some(path);
        self
    }

    /// Configuration described by the `PIM_MHA_LOG_*` variables
    pub fn from_env() -> Self {
        let mut config = LoggingConfig::new();
        if let Some(level) = std::env::var(LOG_LEVEL_ENV)
            .ok()
            .and_then(|s| LogLevel::parse(&s))
        {
            config.level = level;
        }
        if let Some(format) = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| LogFormat::parse(&s))
        {
            config.format = format;
        }
        if let Ok(path) = std::env::var(LOG_FILE_ENV) {
            config.log_file = Some(PathBuf::from(path));
        }
        config
    }
}

/// Install a subscriber configured from the environment. Idempotent; errors
/// are swallowed so a broken log file never stops a run.
pub fn init_logging_default() {
    init_with_config(&LoggingConfig::from_env());
}

/// Install a subscriber with `config`. Only the first call has an effect.
pub fn init_with_config(config: &LoggingConfig) {
    SUBSCRIBER_INSTALLED.get_or_init(|| {
        if let Err(e) = install(config) {
            eprintln!("pim-mha: logging disabled: {}", e);
        }
    });
}

/// Whether a subscriber has been installed through this module
pub fn is_initialized() -> bool {
    SUBSCRIBER_INSTALLED.get().is_some()
}

fn install(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config.level)?;
    let spans = if config.with_span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let human = (config.format == LogFormat::Human).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .with_span_events(spans.clone())
    });
    let json = (config.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(false)
            .with_file(config.with_file_info)
            .with_line_number(config.with_file_info)
            .with_span_events(spans.clone())
    });
    let file_layer = match &config.log_file {
        Some(path) => Some(
            fmt::layer()
                .json()
                .with_writer(open_log_file(path)?)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(spans),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(human)
        .with(json)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}

fn open_log_file(path: &Path) -> Result<std::fs::File, LoggingError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LoggingError::DirectoryCreationFailed(e.to_string()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LoggingError::FileOpenFailed(e.to_string()))
}

/// `RUST_LOG` first, then the configured level
fn env_filter(level: LogLevel) -> Result<EnvFilter, LoggingError> {
    match std::env::var("RUST_LOG") {
        Ok(directives) => {
            EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter(e.to_string()))
        }
        Err(_) => Ok(EnvFilter::new(level.directive())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_logging_default_idempotent() {
        init_logging_default();
        init_logging_default();
        assert!(is_initialized());
    }

    #[test]
    #[serial]
    fn test_init_with_config_after_default_is_noop() {
        init_logging_default();
        init_with_config(&LoggingConfig::new().with_level(LogLevel::Trace));
        assert!(is_initialized());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("error"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" info "), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("human"), Some(LogFormat::Human));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Human));
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_file_info(true)
            .with_span_events(true)
            .with_log_file(PathBuf::from("/tmp/pim_mha_test.log"));

        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.with_file_info);
        assert!(config.with_span_events);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/pim_mha_test.log")));
    }

    #[test]
    fn test_log_level_as_tracing_level() {
        assert_eq!(LogLevel::Error.as_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Trace.as_tracing_level(), tracing::Level::TRACE);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");
        let file = open_log_file(&path);
        assert!(file.is_ok());
        assert!(path.exists());
    }
}
