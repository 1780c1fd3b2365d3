//! Identifiers and small enums shared across the window manager modules.

use serde::{Deserialize, Serialize};

/// Opaque compositor surface id.
pub type SurfaceId = u32;
/// Compositor layer id; numerically greater layers lose eviction contests.
pub type LayerId = u32;
/// Sequence number of a transition request, never 0.
pub type RequestId = u32;

/// Area name given to the surface that keeps the upper half of a split layer.
pub const AREA_SPLIT_MAIN: &str = "split.main";
/// Area name given to the surface joining a split layer.
pub const AREA_SPLIT_SUB: &str = "split.sub";
/// Area name of a regular single-occupant layout.
pub const AREA_NORMAL_FULL: &str = "normal.full";
/// Area whose rectangle defines the layout base resolution.
pub const AREA_FULLSCREEN: &str = "fullscreen";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Make the role visible (activate).
    Allocate,
    /// Hide the role (deactivate).
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Invisible,
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

impl From<Task> for Visibility {
    fn from(task: Task) -> Self {
        match task {
            Task::Allocate => Visibility::Visible,
            Task::Release => Visibility::Invisible,
        }
    }
}
