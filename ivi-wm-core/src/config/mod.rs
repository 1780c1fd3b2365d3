//! Service configuration.
//!
//! - [`types`]: the TOML schema rooted at [`ServiceConfig`].
//! - [`defaults`]: default values used by `serde`.
//! - [`loader`]: [`ConfigLoader`], which finds, parses and validates the file.

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{DisplayConfig, DocumentPaths, LoggingConfig, PolicyConfig, ServiceConfig, TransitionConfig};
