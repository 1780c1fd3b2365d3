//! Loading and validation of [`ServiceConfig`].
//!
//! ```rust,ignore
//! use ivi_wm_core::config::ConfigLoader;
//!
//! let config = ConfigLoader::load()?;
//! ivi_wm_core::logging::init_logging(&config.logging, false)?;
//! ```
//!
//! The file is looked up at `$IVI_WM_CONFIG`, falling back to `config.toml`
//! in the per-user configuration directory. A missing file is not an error:
//! the defaults are used. The result is always passed through
//! [`ConfigLoader::validate_config`].

use std::path::Path;

use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{ConfigError, CoreError};
use crate::utils::fs as wm_fs;
use crate::utils::paths::{get_app_state_dir, get_config_file_path};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Locates, parses and validates the service configuration.
    pub fn load() -> Result<ServiceConfig, CoreError> {
        let path = get_config_file_path()?;
        Self::load_from_path(&path)
    }

    /// Loads the configuration at `path`; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<ServiceConfig, CoreError> {
        let content = std::fs::read_to_string(path);
        let mut config = match content {
            Ok(text) => {
                info!(path = %path.display(), "Loading service configuration");
                Self::parse(&text)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No configuration file, using defaults");
                ServiceConfig::default()
            }
            Err(e) => {
                return Err(CoreError::Config(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }))
            }
        };
        config.paths = config.paths.with_install_dir_fallback();
        Self::validate_config(&mut config)?;
        Ok(config)
    }

    /// Parses and validates an in-memory TOML document.
    pub fn load_from_str(text: &str) -> Result<ServiceConfig, CoreError> {
        let mut config = Self::parse(text)?;
        Self::validate_config(&mut config)?;
        Ok(config)
    }

    fn parse(text: &str) -> Result<ServiceConfig, CoreError> {
        if text.trim().is_empty() {
            return Ok(ServiceConfig::default());
        }
        toml::from_str(text).map_err(|e| CoreError::Config(ConfigError::ParseError(e)))
    }

    /// Normalizes and checks a parsed configuration.
    ///
    /// - log level and format are lower-cased and must be known values;
    /// - a relative log file path is anchored in the app state directory;
    /// - `timeout_ms` and `event_capacity` must be positive;
    /// - `fullscreen_area` must not be empty when fullscreen roles are configured.
    pub fn validate_config(config: &mut ServiceConfig) -> Result<(), CoreError> {
        let level = config.logging.level.to_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => config.logging.level = level,
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                    config.logging.level
                ))
                .into())
            }
        }

        let format = config.logging.format.to_lowercase();
        match format.as_str() {
            "text" | "json" => config.logging.format = format,
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: '{}'. Must be one of text, json.",
                    config.logging.format
                ))
                .into())
            }
        }

        if let Some(file_path) = &config.logging.file_path {
            let absolute = if file_path.is_absolute() {
                file_path.clone()
            } else {
                get_app_state_dir()?.join(file_path)
            };
            if let Some(parent) = absolute.parent() {
                if !parent.as_os_str().is_empty() {
                    wm_fs::ensure_dir_exists(parent)?;
                }
            }
            config.logging.file_path = Some(absolute);
        }

        if config.transition.timeout_ms == 0 {
            return Err(ConfigError::ValidationError("transition.timeout_ms must be greater than 0".into()).into());
        }
        if config.transition.event_capacity == 0 {
            return Err(ConfigError::ValidationError("transition.event_capacity must be greater than 0".into()).into());
        }
        if !config.policy.fullscreen_roles.is_empty() && config.policy.fullscreen_area.trim().is_empty() {
            return Err(ConfigError::ValidationError("policy.fullscreen_area must not be empty".into()).into());
        }
        Ok(())
    }
}
