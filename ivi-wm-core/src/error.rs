//! Error handling for the window manager core layer.
//!
//! [`CoreError`] is the umbrella type returned by configuration loading,
//! logging setup and the filesystem helpers. More specific failures are
//! described by [`ConfigError`] and [`LoggingError`] and converted with `?`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for the infrastructure layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Errors related to configuration loading, parsing, or validation.
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while setting up the logging subsystem.
    #[error("Logging Error: {0}")]
    Logging(#[from] LoggingError),

    /// Filesystem operations that failed on a known path.
    #[error("Filesystem Error: {message} (Path: {path:?})")]
    Filesystem {
        message: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// General I/O errors not covered by other variants.
    #[error("I/O Error: {0}")]
    Io(#[from] io::Error),

    /// Invalid input provided to a function or method.
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Error type for configuration-related operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An error occurred while reading a configuration file.
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The TOML service configuration could not be parsed.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A JSON layout document could not be parsed.
    #[error("Failed to parse JSON document: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Values parsed fine but are not acceptable.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    /// A required base directory (e.g. XDG config home) could not be determined.
    #[error("Could not determine base directory for {dir_type}")]
    DirectoryUnavailable { dir_type: String },
}

/// Error type for logging-related operations.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationFailure(String),

    /// An I/O error occurred while preparing a log destination.
    #[error("Logging I/O error: {0}")]
    IoError(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::ErrorKind;

    #[test]
    fn config_error_wraps_into_core_error() {
        let core_err: CoreError = ConfigError::ValidationError("timeout_ms must be > 0".to_string()).into();
        assert_eq!(
            core_err.to_string(),
            "Configuration Error: Configuration validation failed: timeout_ms must be > 0"
        );
        assert!(core_err.source().is_some());
    }

    #[test]
    fn read_error_keeps_io_source() {
        let err = ConfigError::ReadError {
            path: PathBuf::from("/etc/ivi-wm/config.toml"),
            source: io::Error::new(ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/etc/ivi-wm/config.toml"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("denied".to_string()));
    }

    #[test]
    fn json_error_converts() {
        let bad = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let err: ConfigError = bad.into();
        assert!(matches!(err, ConfigError::JsonError(_)));
    }

    #[test]
    fn logging_error_display() {
        let err = CoreError::Logging(LoggingError::InitializationFailure("already set".into()));
        assert_eq!(err.to_string(), "Logging Error: Failed to initialize logging: already set");
    }
}
