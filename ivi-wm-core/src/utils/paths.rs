//! Path resolution for the service configuration and layout documents.
//!
//! The per-user configuration directory comes from `directories-next`.
//! Layout documents shipped with an installed application live under
//! `$AFM_APP_INSTALL_DIR/etc`.

use std::env;
use std::path::PathBuf;

use directories_next::ProjectDirs;

use crate::error::{ConfigError, CoreError};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "AGL";
const APPLICATION: &str = "ivi-wm";

/// Environment variable that overrides the service configuration file path.
pub const CONFIG_PATH_ENV: &str = "IVI_WM_CONFIG";
/// Environment variable holding the application install directory.
pub const INSTALL_DIR_ENV: &str = "AFM_APP_INSTALL_DIR";

/// Returns the per-user configuration directory, e.g. `~/.config/ivi-wm`.
pub fn get_app_config_dir() -> Result<PathBuf, CoreError> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            CoreError::Config(ConfigError::DirectoryUnavailable {
                dir_type: "App Config".to_string(),
            })
        })
}

/// Returns the per-user directory used for relative log file paths.
pub fn get_app_state_dir() -> Result<PathBuf, CoreError> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .ok_or_else(|| {
            CoreError::Config(ConfigError::DirectoryUnavailable {
                dir_type: "App State".to_string(),
            })
        })
}

/// Location of the service configuration file.
///
/// `IVI_WM_CONFIG` wins when set, otherwise `config.toml` in the app config dir.
pub fn get_config_file_path() -> Result<PathBuf, CoreError> {
    match env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(get_app_config_dir()?.join("config.toml")),
    }
}

/// Path of a document shipped in the application's `etc` directory, if the
/// install directory is known.
pub fn installed_document_path(file_name: &str) -> Option<PathBuf> {
    env::var_os(INSTALL_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join("etc").join(file_name))
}
