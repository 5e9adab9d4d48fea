//! Tracing setup: env-filtered subscriber writing to a rolling log file
//! through a non-blocking `tracing-appender` worker.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, filter::Directive, fmt, fmt::time::ChronoUtc, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::BackPressError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub log_dir: PathBuf,
    pub file_prefix: CompactString,
    pub level: CompactString,
    pub rotation: LogRotation,
    pub max_log_files: usize,
    /// One JSON object per line instead of plain text
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            file_prefix: CompactString::const_new("backpress"),
            level: CompactString::const_new("info"),
            rotation: LogRotation::Daily,
            max_log_files: 10,
            json: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log directory: {0}")]
    InvalidLogDirectory(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Failed to create file appender: {0}")]
    Appender(String),
}

impl From<LoggingError> for BackPressError {
    fn from(err: LoggingError) -> Self {
        Self::Logging(CompactString::from(err.to_string()))
    }
}

pub struct LoggerBuilder {
    config: LoggerConfig,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.config.level = CompactString::new(level);
        self
    }

    /// Install the global subscriber. Keep the guard alive until shutdown so
    /// buffered lines are flushed.
    pub fn build(self) -> Result<WorkerGuard, LoggingError> {
        let config = self.config;
        validate_config(&config)?;
        std::fs::create_dir_all(&config.log_dir)?;

        let rotation = match config.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };

        let file_appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(config.file_prefix.as_str())
            .filename_suffix(if config.json { "jsonl" } else { "log" })
            .max_log_files(config.max_log_files)
            .build(&config.log_dir)
            .map_err(|e| LoggingError::Appender(e.to_string()))?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter = EnvFilter::from_default_env().add_directive(parse_level(&config.level)?);

        let json_layer = config.json.then(|| {
            fmt::layer()
                .json()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(non_blocking.clone())
        });

        let plain_layer = (!config.json).then(|| {
            fmt::layer()
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(non_blocking.clone())
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .with(plain_layer)
            .try_init()
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        Ok(guard)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_logging_with_config(config: LoggerConfig) -> Result<WorkerGuard, LoggingError> {
    LoggerBuilder::new().with_config(config).build()
}

fn parse_level(level: &str) -> Result<Directive, LoggingError> {
    Directive::from_str(level).map_err(|e| LoggingError::InvalidLevel(format!("{level}: {e}")))
}

fn validate_config(config: &LoggerConfig) -> Result<(), LoggingError> {
    if config.file_prefix.is_empty() {
        return Err(LoggingError::InvalidLogDirectory(
            "File prefix must not be empty".to_string(),
        ));
    }

    parse_level(&config.level)?;
    validate_log_directory(&config.log_dir)
}

fn validate_log_directory(path: &Path) -> Result<(), LoggingError> {
    if path.components().count() == 0 {
        return Err(LoggingError::InvalidLogDirectory("Empty path".to_string()));
    }

    if path.components().any(|c| c == Component::ParentDir) {
        return Err(LoggingError::InvalidLogDirectory(
            "Path contains parent directory references".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_names() {
        let config: LoggerConfig = toml::from_str(r#"rotation = "hourly""#).unwrap();
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.file_prefix, "backpress");

        assert!(toml::from_str::<LoggerConfig>(r#"rotation = "weekly""#).is_err());
    }

    #[test]
    fn test_validate_log_directory() {
        assert!(validate_log_directory(Path::new("")).is_err());
        assert!(validate_log_directory(Path::new("logs/../etc")).is_err());
        assert!(validate_log_directory(Path::new("logs/backpress")).is_ok());
    }

    #[test]
    fn test_validate_level() {
        let config = LoggerConfig {
            level: CompactString::new("backpress_core=debug"),
            ..LoggerConfig::default()
        };
        assert!(validate_config(&config).is_ok());

        let config = LoggerConfig {
            level: CompactString::new("backpress=loud"),
            ..LoggerConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(LoggingError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_logging_error_converts() {
        let err: BackPressError = LoggingError::AlreadyInitialized.into();
        assert_eq!(err.to_string(), "Logging error: Logger already initialized");
    }

    #[test]
    fn test_build_installs_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggerConfig {
            log_dir: dir.path().join("logs"),
            rotation: LogRotation::Never,
            ..LoggerConfig::default()
        };

        let guard = init_logging_with_config(config.clone()).unwrap();
        assert!(dir.path().join("logs").is_dir());
        assert!(matches!(
            init_logging_with_config(config),
            Err(LoggingError::AlreadyInitialized)
        ));
        drop(guard);
    }
}
