//! # IVI Window Manager Core (`ivi-wm-core`)
//!
//! Infrastructure shared by the window manager crates:
//!
//! - **Error handling**: [`CoreError`] with the more specific [`ConfigError`] and [`LoggingError`].
//! - **Geometry**: [`Rect`], [`Size`] and the output scaling helpers.
//! - **Configuration**: the TOML [`ServiceConfig`] and its [`ConfigLoader`].
//! - **Logging**: `tracing` based initialisation, console and rolling file output.
//! - **Utilities**: filesystem and path helpers.
//!
//! ```rust,ignore
//! use ivi_wm_core::{init_logging, ConfigLoader, CoreError};
//!
//! fn main() -> Result<(), CoreError> {
//!     let config = ConfigLoader::load()?;
//!     init_logging(&config.logging, false)?;
//!     tracing::info!("window manager starting");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, LoggingConfig, PolicyConfig, ServiceConfig};
pub use error::{ConfigError, CoreError, LoggingError};
pub use logging::{init_logging, init_logging_to, init_minimal_logging, LogTarget};
pub use types::{scale_dest_rect, Rect, ScalingMode, Size};
