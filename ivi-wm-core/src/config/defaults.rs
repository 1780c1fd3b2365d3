//! Default configuration values, referenced from `#[serde(default = ...)]`.

use std::path::PathBuf;

use crate::types::ScalingMode;

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_log_file_path() -> Option<PathBuf> {
    None
}

pub(super) fn default_log_format() -> String {
    "text".to_string()
}

/// Three seconds, the draw acknowledgement deadline clients have always had.
pub(super) fn default_timeout_ms() -> u64 {
    3000
}

pub(super) fn default_event_capacity() -> usize {
    64
}

pub(super) fn default_scaling() -> ScalingMode {
    ScalingMode::AspectFit
}

pub(super) fn default_fullscreen_roles() -> Vec<String> {
    vec!["homescreen".to_string()]
}

pub(super) fn default_fullscreen_area() -> String {
    "fullscreen".to_string()
}
