//! Serde schema of the JSON layout documents and the parsed layer model.

use regex::Regex;
use serde::{Deserialize, Serialize};

use ivi_wm_core::Rect;

use crate::types::LayerId;

fn unset_layer_id() -> i64 {
    -1
}

/// `layers.json`
#[derive(Debug, Clone, Deserialize)]
pub struct LayersDocument {
    #[serde(default)]
    pub main_surface: Option<MainSurfaceEntry>,
    pub mappings: Vec<MappingEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainSurfaceEntry {
    #[serde(default)]
    pub surface_role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingEntry {
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "unset_layer_id")]
    pub layer_id: i64,
    #[serde(default)]
    pub area: Option<MappingArea>,
    #[serde(default)]
    pub split_layouts: Vec<SplitLayoutEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingArea {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub rect: Option<MappingRect>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MappingRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitLayoutEntry {
    pub name: String,
    pub main_match: String,
    pub sub_match: String,
}

/// `areas.db`
#[derive(Debug, Clone, Deserialize)]
pub struct AreasDocument {
    pub areas: Vec<AreaEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaEntry {
    pub name: String,
    pub rect: Rect,
}

/// Region a layer covers, as declared in its mapping.
///
/// Negative extents in `Rect` mean "output size minus that many pixels".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "rect", rename_all = "snake_case")]
pub enum LayerArea {
    Full,
    Rect(Rect),
}

/// A pair of role patterns that may share one layer as main and sub.
#[derive(Debug, Clone)]
pub struct SplitLayout {
    pub name: String,
    pub(crate) main_match: Regex,
    pub(crate) sub_match: Regex,
}

impl SplitLayout {
    pub fn matches(&self, main_role: &str, sub_role: &str) -> bool {
        self.main_match.is_match(main_role) && self.sub_match.is_match(sub_role)
    }
}

#[derive(Debug, Clone)]
pub struct LayerDef {
    pub id: LayerId,
    pub name: String,
    pub role_pattern: String,
    pub(crate) role_match: Regex,
    pub area: LayerArea,
    pub split_layouts: Vec<SplitLayout>,
}

/// One side of a split check: who the surface is and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitParty<'a> {
    pub surface: crate::types::SurfaceId,
    pub layer: LayerId,
    pub role: &'a str,
}
