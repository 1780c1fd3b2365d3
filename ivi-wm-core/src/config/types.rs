//! Configuration data structures for the window manager service.
//!
//! [`ServiceConfig`] is the root, deserialized from TOML. Every section and
//! field has a default so an empty file (or no file) is a valid configuration.
//! Unknown fields are rejected.

use serde::Deserialize;
use std::path::PathBuf;

use super::defaults;
use crate::types::ScalingMode;
use crate::utils::paths::installed_document_path;

/// Configuration settings for the logging subsystem.
///
/// ```
/// use ivi_wm_core::config::LoggingConfig;
///
/// let cfg: LoggingConfig = toml::from_str("level = \"debug\"\nformat = \"json\"").unwrap();
/// assert_eq!(cfg.level, "debug");
/// assert_eq!(cfg.file_path, None);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of "trace", "debug", "info", "warn", "error" (case-insensitive).
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional log file. Relative paths are resolved against the app state directory.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::default_log_level(),
            file_path: defaults::default_log_file_path(),
            format: defaults::default_log_format(),
        }
    }
}

/// Locations of the JSON layout documents.
///
/// A `None` path means "use the built-in default document".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentPaths {
    #[serde(default)]
    pub layers: Option<PathBuf>,
    #[serde(default)]
    pub areas: Option<PathBuf>,
    #[serde(default)]
    pub old_roles: Option<PathBuf>,
}

impl DocumentPaths {
    /// Fills unset paths from `$AFM_APP_INSTALL_DIR/etc` when that variable is set.
    pub fn with_install_dir_fallback(mut self) -> Self {
        if self.layers.is_none() {
            self.layers = installed_document_path("layers.json");
        }
        if self.areas.is_none() {
            self.areas = installed_document_path("areas.db");
        }
        if self.old_roles.is_none() {
            self.old_roles = installed_document_path("old_roles.db");
        }
        self
    }
}

/// Tuning for the transition state machine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionConfig {
    /// Deadline for all draw acknowledgements of one request, in milliseconds.
    #[serde(default = "defaults::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Capacity of the lifecycle event broadcast channel.
    #[serde(default = "defaults::default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: defaults::default_timeout_ms(),
            event_capacity: defaults::default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayConfig {
    #[serde(default = "defaults::default_scaling")]
    pub scaling: ScalingMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { scaling: defaults::default_scaling() }
    }
}

/// Parameters of the reference layout policy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Roles that always get `fullscreen_area` and never evict other surfaces.
    #[serde(default = "defaults::default_fullscreen_roles")]
    pub fullscreen_roles: Vec<String>,
    #[serde(default = "defaults::default_fullscreen_area")]
    pub fullscreen_area: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            fullscreen_roles: defaults::default_fullscreen_roles(),
            fullscreen_area: defaults::default_fullscreen_area(),
        }
    }
}

/// Root configuration of the window manager service.
///
/// ```
/// use ivi_wm_core::config::ServiceConfig;
///
/// let cfg: ServiceConfig = toml::from_str("[transition]\ntimeout_ms = 500").unwrap();
/// assert_eq!(cfg.transition.timeout_ms, 500);
/// assert_eq!(cfg.policy.fullscreen_area, "fullscreen");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: DocumentPaths,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.transition.timeout_ms, 3000);
        assert_eq!(cfg.display.scaling, ScalingMode::AspectFit);
        assert_eq!(cfg.policy.fullscreen_roles, vec!["homescreen".to_string()]);
    }

    #[test]
    fn full_document_parses() {
        let cfg: ServiceConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"
            file_path = "wm.log"
            format = "json"

            [paths]
            layers = "/opt/wm/etc/layers.json"

            [transition]
            timeout_ms = 1500
            event_capacity = 16

            [display]
            scaling = "display_fit"

            [policy]
            fullscreen_roles = ["homescreen", "restriction"]
            fullscreen_area = "restriction.normal"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.logging.file_path, Some(PathBuf::from("wm.log")));
        assert_eq!(cfg.paths.layers, Some(PathBuf::from("/opt/wm/etc/layers.json")));
        assert_eq!(cfg.paths.areas, None);
        assert_eq!(cfg.transition.event_capacity, 16);
        assert_eq!(cfg.display.scaling, ScalingMode::DisplayFit);
        assert_eq!(cfg.policy.fullscreen_roles.len(), 2);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(toml::from_str::<ServiceConfig>("[transition]\ntimeout = 3").is_err());
    }
}
