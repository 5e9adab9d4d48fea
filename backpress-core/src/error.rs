//! src/error.rs
//! ============================================================================
//! # `BackPressError`: unified error type for the dispatcher
//!
//! Registration misuse is reported as an explicit error value instead of a
//! panic. Every variant is cheap to build (`CompactString` payloads) and can
//! be flattened into a single structured `tracing` event with [`BackPressError::trace`].

use std::{io, path::PathBuf};

use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};
use thiserror::Error;
use tracing::{Level, event};

use crate::category::BackPressCategory;

/// Convenient alias carrying our unified error type
pub type BackPressResult<T> = Result<T, BackPressError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackPressError {
    // ────────────────────────────────────────────────────────────
    // Registration misuse
    // ────────────────────────────────────────────────────────────
    #[error("A handler is already registered for category {category}")]
    AlreadyRegistered { category: BackPressCategory },

    #[error("No handler is registered for category {category}")]
    NotRegistered { category: BackPressCategory },

    #[error("Handler is not registered with this manager")]
    HandlerNotFound,

    // ────────────────────────────────────────────────────────────
    // Configuration
    // ────────────────────────────────────────────────────────────
    #[error("Unknown back-press category: {0}")]
    UnknownCategory(CompactString),

    #[error("Invalid metric id {id} for category {category}")]
    InvalidMetricId {
        category: CompactString,
        id: i32,
    },

    #[error("Config error: {0}")]
    Config(CompactString),

    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Logging error: {0}")]
    Logging(CompactString),
}

impl BackPressError {
    /// Misuse of the registration API by the embedding code.
    #[inline]
    #[must_use]
    pub const fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRegistered { .. } | Self::NotRegistered { .. } | Self::HandlerNotFound
        )
    }

    #[inline]
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered { .. }
            | Self::NotRegistered { .. }
            | Self::HandlerNotFound => "registration",

            Self::UnknownCategory(_)
            | Self::InvalidMetricId { .. }
            | Self::Config(_)
            | Self::ConfigIo { .. } => "configuration",

            Self::Logging(_) => "logging",
        }
    }

    #[inline]
    #[must_use]
    const fn error_marker(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered { .. } => "ERROR_ALREADY_REGISTERED",
            Self::NotRegistered { .. } => "ERROR_NOT_REGISTERED",
            Self::HandlerNotFound => "ERROR_HANDLER_NOT_FOUND",
            Self::UnknownCategory(_) => "ERROR_UNKNOWN_CATEGORY",
            Self::InvalidMetricId { .. } => "ERROR_INVALID_METRIC_ID",
            Self::Config(_) => "ERROR_CONFIG",
            Self::ConfigIo { .. } => "ERROR_CONFIG_IO",
            Self::Logging(_) => "ERROR_LOGGING",
        }
    }

    #[must_use]
    pub fn extract_trace_fields(&self) -> SmallVec<[(&'static str, CompactString); 2]> {
        match self {
            Self::AlreadyRegistered { category } | Self::NotRegistered { category } => {
                smallvec![("category", CompactString::new(category.name()))]
            }

            Self::InvalidMetricId { category, id } => smallvec![
                ("category", category.clone()),
                ("id", CompactString::from(id.to_string())),
            ],

            Self::UnknownCategory(name) => smallvec![("name", name.clone())],

            _ => smallvec![],
        }
    }

    /// Emit one structured error event and hand the error back to the caller.
    #[must_use]
    pub fn trace(self) -> Self {
        let extra = self.extract_trace_fields();

        event!(
            Level::ERROR,
            marker = self.error_marker(),
            op_type = self.operation_type(),
            error = %self,
            programming_error = self.is_programming_error(),
            extra = ?extra,
        );

        self
    }

    #[inline]
    #[must_use]
    pub fn config(message: impl Into<CompactString>) -> Self {
        Self::Config(message.into())
    }

    #[inline]
    #[must_use]
    pub fn config_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for BackPressError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(CompactString::from(err.to_string()))
    }
}

impl From<toml::ser::Error> for BackPressError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(CompactString::from(err.to_string()))
    }
}
