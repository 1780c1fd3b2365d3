//! The compositor driver boundary.
//!
//! The state machine never touches the display protocol itself; it issues
//! the calls below and treats any [`DriverError`] as a failed request.

pub mod headless;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ivi_wm_core::Rect;

use crate::types::{LayerId, SurfaceId};
pub use headless::{DriverCall, HeadlessDriver};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("Unknown layer {0}")]
    UnknownLayer(LayerId),
    #[error("Unknown surface {0}")]
    UnknownSurface(SurfaceId),
    #[error("No output available")]
    NoOutput,
    #[error("Compositor protocol error: {0}")]
    Protocol(String),
}

/// Physical and logical size of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    #[serde(rename = "width_pixel")]
    pub width_px: u32,
    #[serde(rename = "height_pixel")]
    pub height_px: u32,
    pub width_mm: u32,
    pub height_mm: u32,
}

/// Operations the window manager needs from the compositor.
///
/// Calls are batched; nothing is guaranteed to reach the screen before
/// [`CompositorDriver::commit`].
pub trait CompositorDriver: Send {
    fn display_info(&self) -> Result<DisplayInfo, DriverError>;

    fn create_layer(&mut self, layer: LayerId, width: u32, height: u32) -> Result<(), DriverError>;
    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool) -> Result<(), DriverError>;
    fn set_layer_source_rect(&mut self, layer: LayerId, rect: Rect) -> Result<(), DriverError>;
    fn set_layer_dest_rect(&mut self, layer: LayerId, rect: Rect) -> Result<(), DriverError>;
    /// Bottom-most layer first.
    fn set_render_order(&mut self, layers: &[LayerId]) -> Result<(), DriverError>;

    /// Places a client surface on `layer`.
    fn create_surface(&mut self, surface: SurfaceId, layer: LayerId) -> Result<(), DriverError>;
    fn remove_surface(&mut self, surface: SurfaceId) -> Result<(), DriverError>;
    fn surface_exists(&self, surface: SurfaceId) -> bool;
    fn set_surface_visibility(&mut self, surface: SurfaceId, visible: bool) -> Result<(), DriverError>;
    fn set_surface_source_rect(&mut self, surface: SurfaceId, rect: Rect) -> Result<(), DriverError>;
    fn set_surface_dest_rect(&mut self, surface: SurfaceId, rect: Rect) -> Result<(), DriverError>;

    fn commit(&mut self) -> Result<(), DriverError>;
}
