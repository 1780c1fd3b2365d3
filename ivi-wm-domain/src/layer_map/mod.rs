//! Static role → layer mapping, screen areas and split-layout rules.
//!
//! A [`LayerMap`] is built once at start-up from the layer and area
//! documents (or their built-in defaults) and is read-only afterwards.
//! Role patterns are full-match regular expressions tested in ascending
//! layer id order; the first hit wins. A layer whose pattern matches the
//! literal role `"fallback"` receives roles that match nothing else.

pub mod defaults;
pub mod errors;
pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use ivi_wm_core::utils::read_optional_to_string;
use ivi_wm_core::{Rect, Size};

use crate::types::{LayerId, AREA_FULLSCREEN};
pub use errors::LayerMapError;
pub use types::{
    AreaEntry, AreasDocument, LayerArea, LayerDef, LayersDocument, MappingEntry, SplitLayout, SplitParty,
};

const FALLBACK_ROLE: &str = "fallback";

/// Compiles `pattern` so that it must match the whole input.
pub(crate) fn full_match(pattern: &str) -> Result<Regex, LayerMapError> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| LayerMapError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[derive(Debug, Clone)]
pub struct LayerMap {
    layers: BTreeMap<LayerId, LayerDef>,
    fallback: Option<LayerId>,
    areas: HashMap<String, Rect>,
    main_surface_role: Option<String>,
}

impl LayerMap {
    pub fn from_documents(layers: LayersDocument, areas: AreasDocument) -> Result<Self, LayerMapError> {
        let mut defs = BTreeMap::new();
        for mapping in layers.mappings {
            let def = Self::layer_from_mapping(mapping)?;
            if defs.contains_key(&def.id) {
                return Err(LayerMapError::DuplicateLayerId(def.id));
            }
            debug!(
                layer = def.id,
                name = %def.name,
                split_layouts = def.split_layouts.len(),
                "Registered layer"
            );
            defs.insert(def.id, def);
        }
        if defs.is_empty() {
            return Err(LayerMapError::NoLayers);
        }

        let mut area_table = HashMap::with_capacity(areas.areas.len());
        for area in areas.areas {
            if area_table.insert(area.name.clone(), area.rect).is_some() {
                return Err(LayerMapError::DuplicateArea(area.name));
            }
        }

        let fallback = defs.values().find(|l| l.role_match.is_match(FALLBACK_ROLE)).map(|l| l.id);
        let main_surface_role = layers
            .main_surface
            .map(|m| m.surface_role)
            .filter(|role| !role.is_empty());

        Ok(Self {
            layers: defs,
            fallback,
            areas: area_table,
            main_surface_role,
        })
    }

    fn layer_from_mapping(mapping: MappingEntry) -> Result<LayerDef, LayerMapError> {
        if mapping.name.is_empty() {
            return Err(LayerMapError::MissingName { role: mapping.role });
        }
        let id = u32::try_from(mapping.layer_id).map_err(|_| LayerMapError::InvalidLayerId {
            name: mapping.name.clone(),
            layer_id: mapping.layer_id,
        })?;

        let area = match mapping.area {
            Some(area) if area.kind == "rect" => match area.rect {
                Some(r) => LayerArea::Rect(Rect::new(r.x, r.y, r.width, r.height)),
                None => LayerArea::Full,
            },
            _ => LayerArea::Full,
        };

        let split_layouts = mapping
            .split_layouts
            .into_iter()
            .map(|sl| {
                Ok(SplitLayout {
                    main_match: full_match(&sl.main_match)?,
                    sub_match: full_match(&sl.sub_match)?,
                    name: sl.name,
                })
            })
            .collect::<Result<Vec<_>, LayerMapError>>()?;

        Ok(LayerDef {
            id,
            role_match: full_match(&mapping.role)?,
            role_pattern: mapping.role,
            name: mapping.name,
            area,
            split_layouts,
        })
    }

    pub fn from_json(layers_json: &str, areas_json: &str) -> Result<Self, LayerMapError> {
        let layers: LayersDocument = serde_json::from_str(layers_json)?;
        let areas: AreasDocument = serde_json::from_str(areas_json)?;
        Self::from_documents(layers, areas)
    }

    /// The built-in mapping and area tables.
    pub fn with_defaults() -> Result<Self, LayerMapError> {
        Self::from_json(defaults::DEFAULT_LAYERS_JSON, defaults::DEFAULT_AREAS_JSON)
    }

    /// Reads both documents, substituting the built-in ones for absent files.
    pub fn load(layers_path: Option<&Path>, areas_path: Option<&Path>) -> Result<Self, LayerMapError> {
        let layers = Self::read_document(layers_path, defaults::DEFAULT_LAYERS_JSON)?;
        let areas = Self::read_document(areas_path, defaults::DEFAULT_AREAS_JSON)?;
        Self::from_json(&layers, &areas)
    }

    pub(crate) fn read_document(path: Option<&Path>, default: &str) -> Result<String, LayerMapError> {
        if let Some(path) = path {
            if let Some(content) = read_optional_to_string(path)? {
                info!(path = %path.display(), "Using layout document");
                return Ok(content);
            }
            info!(path = %path.display(), "Layout document not found, using built-in default");
        }
        Ok(default.to_string())
    }

    /// Resolves a canonical role to its layer, falling back to the
    /// designated fallback layer when no pattern matches.
    pub fn resolve_layer(&self, role: &str) -> Option<LayerId> {
        if let Some(layer) = self.layers.values().find(|l| l.role_match.is_match(role)) {
            debug!(role, layer = layer.id, "Role matches layer");
            return Some(layer.id);
        }
        if let Some(fallback) = self.fallback {
            debug!(role, layer = fallback, "Role is not mapped, using fallback layer");
        }
        self.fallback
    }

    pub fn fallback_layer(&self) -> Option<LayerId> {
        self.fallback
    }

    pub fn area_rect(&self, area: &str) -> Option<Rect> {
        self.areas.get(area).copied()
    }

    pub fn has_area(&self, area: &str) -> bool {
        self.areas.contains_key(area)
    }

    /// Layout base resolution, taken from the `fullscreen` area.
    pub fn base_size(&self) -> Option<Size> {
        self.area_rect(AREA_FULLSCREEN).map(|r| r.size())
    }

    /// Whether `candidate` may join `layer` as sub next to `current_main`.
    ///
    /// Both must sit on `layer`, be distinct surfaces, and one of the layer's
    /// split layouts must match the main role and the candidate role.
    pub fn can_split(&self, layer: LayerId, current_main: SplitParty<'_>, candidate: SplitParty<'_>) -> bool {
        if current_main.surface == candidate.surface {
            return false;
        }
        if current_main.layer != layer || candidate.layer != layer {
            return false;
        }
        let Some(def) = self.layers.get(&layer) else {
            return false;
        };
        let matched = def
            .split_layouts
            .iter()
            .find(|sl| sl.matches(current_main.role, candidate.role));
        if let Some(sl) = matched {
            debug!(layer, layout = %sl.name, main = current_main.role, sub = candidate.role, "Split layout matched");
        }
        matched.is_some()
    }

    pub fn layer(&self, id: LayerId) -> Option<&LayerDef> {
        self.layers.get(&id)
    }

    /// Layers in ascending id order, which is also the render order.
    pub fn layers(&self) -> impl Iterator<Item = &LayerDef> {
        self.layers.values()
    }

    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().copied().collect()
    }

    pub fn main_surface_role(&self) -> Option<&str> {
        self.main_surface_role.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SPLIT_LAYERS: &str = r#"{
        "mappings": [
            { "role": "homescreen", "name": "home", "layer_id": 1000 },
            {
                "role": "music|video|map|radio|phone",
                "name": "apps",
                "layer_id": 1001,
                "split_layouts": [
                    { "name": "map+music", "main_match": "map", "sub_match": "music|video" }
                ]
            },
            { "role": "fallback|browser", "name": "fallbacks", "layer_id": 1002 },
            { "role": "on_screen.*", "name": "popups", "layer_id": 9999 }
        ]
    }"#;

    fn split_map() -> LayerMap {
        LayerMap::from_json(SPLIT_LAYERS, defaults::DEFAULT_AREAS_JSON).unwrap()
    }

    #[test]
    fn defaults_parse() {
        let map = LayerMap::with_defaults().unwrap();
        assert_eq!(map.layer_ids(), vec![1000, 1001, 9999]);
        assert_eq!(map.main_surface_role(), Some("HomeScreen"));
        assert_eq!(map.area_rect("split.sub"), Some(Rect::new(0, 962, 1080, 744)));
        assert_eq!(map.base_size(), Some(Size::new(1080, 1920)));
        assert_eq!(map.layer(1001).unwrap().area, LayerArea::Rect(Rect::new(0, 218, -1, -433)));
        assert_eq!(map.layer(1000).unwrap().area, LayerArea::Full);
        assert_eq!(map.fallback_layer(), None);
    }

    #[test]
    fn patterns_are_full_match() {
        let map = LayerMap::with_defaults().unwrap();
        assert_eq!(map.resolve_layer("HomeScreen"), Some(1000));
        assert_eq!(map.resolve_layer("Radio"), Some(1001));
        assert_eq!(map.resolve_layer("OnScreenAlert"), Some(9999));
        // substring of an alternative is not enough
        assert_eq!(map.resolve_layer("Radiox"), None);
        assert_eq!(map.resolve_layer("unknown"), None);
    }

    #[test]
    fn unmatched_role_uses_fallback_layer() {
        let map = split_map();
        assert_eq!(map.fallback_layer(), Some(1002));
        assert_eq!(map.resolve_layer("some_new_app"), Some(1002));
        assert_eq!(map.resolve_layer("map"), Some(1001));
    }

    #[test]
    fn split_requires_same_layer_distinct_surfaces_and_matching_layout() {
        let map = split_map();
        let main = SplitParty { surface: 1, layer: 1001, role: "map" };
        let music = SplitParty { surface: 2, layer: 1001, role: "music" };
        assert!(map.can_split(1001, main, music));

        // wrong direction
        assert!(!map.can_split(1001, music, main));
        // same surface
        assert!(!map.can_split(1001, main, SplitParty { surface: 1, ..music }));
        // candidate on another layer
        assert!(!map.can_split(1001, main, SplitParty { layer: 1002, ..music }));
        // role not covered by sub_match
        assert!(!map.can_split(1001, main, SplitParty { surface: 3, layer: 1001, role: "phone" }));
        // layer without split layouts
        assert!(!map.can_split(1000, SplitParty { layer: 1000, ..main }, SplitParty { layer: 1000, ..music }));
    }

    #[test]
    fn rejects_invalid_mappings() {
        let areas = defaults::DEFAULT_AREAS_JSON;
        let no_name = r#"{ "mappings": [ { "role": "x", "layer_id": 1 } ] }"#;
        assert!(matches!(LayerMap::from_json(no_name, areas), Err(LayerMapError::MissingName { .. })));

        let no_id = r#"{ "mappings": [ { "role": "x", "name": "x" } ] }"#;
        assert!(matches!(LayerMap::from_json(no_id, areas), Err(LayerMapError::InvalidLayerId { layer_id: -1, .. })));

        let dup = r#"{ "mappings": [ { "role": "a", "name": "a", "layer_id": 5 }, { "role": "b", "name": "b", "layer_id": 5 } ] }"#;
        assert!(matches!(LayerMap::from_json(dup, areas), Err(LayerMapError::DuplicateLayerId(5))));

        let bad_re = r#"{ "mappings": [ { "role": "(", "name": "a", "layer_id": 5 } ] }"#;
        assert!(matches!(LayerMap::from_json(bad_re, areas), Err(LayerMapError::BadPattern { .. })));

        let empty = r#"{ "mappings": [] }"#;
        assert!(matches!(LayerMap::from_json(empty, areas), Err(LayerMapError::NoLayers)));
    }

    #[test]
    fn load_falls_back_to_defaults_for_missing_files() {
        let dir = TempDir::new().unwrap();
        let layers_path = dir.path().join("layers.json");
        fs::write(&layers_path, SPLIT_LAYERS).unwrap();

        let map = LayerMap::load(Some(&layers_path), Some(&dir.path().join("areas.db"))).unwrap();
        assert_eq!(map.layer_ids(), vec![1000, 1001, 1002, 9999]);
        assert!(map.has_area("normal.full"));

        let defaults = LayerMap::load(None, None).unwrap();
        assert_eq!(defaults.layer_ids(), vec![1000, 1001, 9999]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let areas_path = dir.path().join("areas.db");
        fs::write(&areas_path, "{ \"areas\": [ { \"name\": 3 } ] }").unwrap();
        assert!(matches!(LayerMap::load(None, Some(&areas_path)), Err(LayerMapError::Json(_))));
    }
}
