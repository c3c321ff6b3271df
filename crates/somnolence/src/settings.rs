//! Application configuration
//!
//! Layered from an optional TOML file and `SOMNOLENCE__*` environment
//! variables (double underscore separates nested keys, e.g.
//! `SOMNOLENCE__DETECTOR__CLOSED_EYES_FRAMES=30`).

use std::path::{Path, PathBuf};

use camera_capture::SourceConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};

use crate::AppError;

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "somnolence.toml";

/// Environment variable overriding the config file path
pub const CONFIG_PATH_ENV: &str = "SOMNOLENCE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// trace, debug, info, warn or error
    pub log_level: String,

    /// Where frames come from
    pub source: SourceConfig,

    /// Annotated frames are written here as PNG when set
    pub output_dir: Option<PathBuf>,

    pub detector: DmsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            source: SourceConfig::default(),
            output_dir: None,
            detector: DmsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path` (optional file) and the environment
    pub fn load(path: &Path) -> Result<Self, AppError> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("SOMNOLENCE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<AppConfig>()
            .map_err(AppError::from)
    }

    /// Load from `$SOMNOLENCE_CONFIG`, or `somnolence.toml` if unset
    pub fn from_env() -> Result<Self, AppError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(&path)
    }
}
