//! src/config.rs
//! ============================================================================
//! # BackPressConfig: dispatcher configuration loader and saver
//!
//! Settings are stored as TOML in the platform config directory resolved by
//! [`directories`](https://docs.rs/directories). A missing file yields the
//! defaults; missing keys fall back to their defaults as well.
//!
//! ```toml
//! histogram_name = "Android.BackPress.Intercept"
//! predictive_back = true
//!
//! [metric_ids]
//! find-toolbar = 13
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatcher::DispatchOptions;
use crate::error::{BackPressError, BackPressResult};
use crate::logging::LoggerConfig;
use crate::metrics::{CategoryMetricIds, DEFAULT_ESCAPE_HISTOGRAM, DEFAULT_HISTOGRAM};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackPressConfig {
    /// Histogram receiving one sample per consumed back press
    pub histogram_name: String,

    /// Histogram receiving one sample per handled escape key
    pub escape_histogram_name: String,

    /// Forward predictive back gesture progress to handlers
    pub predictive_back: bool,

    /// Offer escape key presses to handlers
    pub escape_routing: bool,

    /// Per-category histogram sample overrides, keyed by category name
    pub metric_ids: BTreeMap<String, i32>,

    pub logging: LoggerConfig,
}

impl Default for BackPressConfig {
    fn default() -> Self {
        Self {
            histogram_name: DEFAULT_HISTOGRAM.to_string(),
            escape_histogram_name: DEFAULT_ESCAPE_HISTOGRAM.to_string(),
            predictive_back: true,
            escape_routing: true,
            metric_ids: BTreeMap::new(),
            logging: LoggerConfig::default(),
        }
    }
}

impl BackPressConfig {
    /// Load from the platform config path, or defaults if there is no file.
    pub fn load() -> BackPressResult<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            info!(
                "No config file found at {}, using default configuration",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> BackPressResult<Self> {
        info!("Loading config from {}", path.display());

        let text =
            std::fs::read_to_string(path).map_err(|e| BackPressError::config_io(path, e))?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> BackPressResult<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BackPressError::config_io(parent, e))?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str).map_err(|e| BackPressError::config_io(path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> BackPressResult<()> {
        if self.histogram_name.trim().is_empty() {
            return Err(BackPressError::config("histogram_name must not be empty"));
        }

        if self.escape_histogram_name.trim().is_empty() {
            return Err(BackPressError::config("escape_histogram_name must not be empty"));
        }

        self.metric_ids().map(|_| ())
    }

    pub fn metric_ids(&self) -> BackPressResult<CategoryMetricIds> {
        CategoryMetricIds::with_overrides(&self.metric_ids)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            histogram: self.histogram_name.clone(),
            escape_histogram: self.escape_histogram_name.clone(),
            predictive_back: self.predictive_back,
            escape_routing: self.escape_routing,
        }
    }

    pub fn config_path() -> BackPressResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> BackPressResult<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "backpress", "BackPress")
            .ok_or_else(|| BackPressError::config("Could not determine config directory"))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }
}
