//! An in-memory compositor.
//!
//! Keeps the scene graph the window manager would have built and a log of
//! the most recent calls, so it serves both as a stand-in when no compositor
//! is present and as the driver used by tests. Clones share the same scene.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use ivi_wm_core::Rect;

use super::{CompositorDriver, DisplayInfo, DriverError};
use crate::types::{LayerId, SurfaceId};

/// Calls kept in the log; older ones are dropped.
pub const CALL_LOG_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    CreateLayer { layer: LayerId, width: u32, height: u32 },
    LayerVisibility { layer: LayerId, visible: bool },
    LayerSourceRect { layer: LayerId, rect: Rect },
    LayerDestRect { layer: LayerId, rect: Rect },
    RenderOrder(Vec<LayerId>),
    CreateSurface { surface: SurfaceId, layer: LayerId },
    RemoveSurface(SurfaceId),
    SurfaceVisibility { surface: SurfaceId, visible: bool },
    SurfaceSourceRect { surface: SurfaceId, rect: Rect },
    SurfaceDestRect { surface: SurfaceId, rect: Rect },
    Commit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessLayer {
    pub width: u32,
    pub height: u32,
    pub visible: bool,
    pub source: Rect,
    pub dest: Rect,
    pub surfaces: Vec<SurfaceId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessSurface {
    pub layer: LayerId,
    pub visible: bool,
    pub source: Rect,
    pub dest: Rect,
}

#[derive(Debug)]
struct Scene {
    display: Option<DisplayInfo>,
    layers: BTreeMap<LayerId, HeadlessLayer>,
    surfaces: BTreeMap<SurfaceId, HeadlessSurface>,
    render_order: Vec<LayerId>,
    calls: VecDeque<DriverCall>,
    failing_surfaces: HashSet<SurfaceId>,
}

impl Scene {
    fn record(&mut self, call: DriverCall) {
        if self.calls.len() == CALL_LOG_CAPACITY {
            self.calls.pop_front();
        }
        self.calls.push_back(call);
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    scene: Arc<Mutex<Scene>>,
}

impl HeadlessDriver {
    /// A headless output of the given pixel and millimetre size.
    pub fn new(display: DisplayInfo) -> Self {
        Self::with_display(Some(display))
    }

    /// A driver that reports no output at all.
    pub fn without_output() -> Self {
        Self::with_display(None)
    }

    fn with_display(display: Option<DisplayInfo>) -> Self {
        Self {
            scene: Arc::new(Mutex::new(Scene {
                display,
                layers: BTreeMap::new(),
                surfaces: BTreeMap::new(),
                render_order: Vec::new(),
                calls: VecDeque::with_capacity(CALL_LOG_CAPACITY),
                failing_surfaces: HashSet::new(),
            })),
        }
    }

    fn scene(&self) -> MutexGuard<'_, Scene> {
        // a poisoned scene is still a usable record
        self.scene.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The last [`CALL_LOG_CAPACITY`] calls, oldest first.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.scene().calls.iter().cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.scene().calls.clear();
    }

    pub fn layer(&self, layer: LayerId) -> Option<HeadlessLayer> {
        self.scene().layers.get(&layer).cloned()
    }

    pub fn surface(&self, surface: SurfaceId) -> Option<HeadlessSurface> {
        self.scene().surfaces.get(&surface).cloned()
    }

    pub fn render_order(&self) -> Vec<LayerId> {
        self.scene().render_order.clone()
    }

    /// Makes every per-surface property call for `surface` fail.
    pub fn fail_surface(&self, surface: SurfaceId) {
        self.scene().failing_surfaces.insert(surface);
    }

    fn with_surface<F>(&mut self, surface: SurfaceId, call: DriverCall, apply: F) -> Result<(), DriverError>
    where
        F: FnOnce(&mut HeadlessSurface),
    {
        let mut scene = self.scene();
        if scene.failing_surfaces.contains(&surface) {
            return Err(DriverError::Protocol(format!("surface {} rejected the request", surface)));
        }
        let entry = scene.surfaces.get_mut(&surface).ok_or(DriverError::UnknownSurface(surface))?;
        apply(entry);
        scene.record(call);
        Ok(())
    }

    fn with_layer<F>(&mut self, layer: LayerId, call: DriverCall, apply: F) -> Result<(), DriverError>
    where
        F: FnOnce(&mut HeadlessLayer),
    {
        let mut scene = self.scene();
        let entry = scene.layers.get_mut(&layer).ok_or(DriverError::UnknownLayer(layer))?;
        apply(entry);
        scene.record(call);
        Ok(())
    }
}

impl CompositorDriver for HeadlessDriver {
    fn display_info(&self) -> Result<DisplayInfo, DriverError> {
        self.scene().display.ok_or(DriverError::NoOutput)
    }

    fn create_layer(&mut self, layer: LayerId, width: u32, height: u32) -> Result<(), DriverError> {
        let mut scene = self.scene();
        let entry = scene.layers.entry(layer).or_default();
        entry.width = width;
        entry.height = height;
        scene.record(DriverCall::CreateLayer { layer, width, height });
        Ok(())
    }

    fn set_layer_visibility(&mut self, layer: LayerId, visible: bool) -> Result<(), DriverError> {
        self.with_layer(layer, DriverCall::LayerVisibility { layer, visible }, |l| l.visible = visible)
    }

    fn set_layer_source_rect(&mut self, layer: LayerId, rect: Rect) -> Result<(), DriverError> {
        self.with_layer(layer, DriverCall::LayerSourceRect { layer, rect }, |l| l.source = rect)
    }

    fn set_layer_dest_rect(&mut self, layer: LayerId, rect: Rect) -> Result<(), DriverError> {
        self.with_layer(layer, DriverCall::LayerDestRect { layer, rect }, |l| l.dest = rect)
    }

    fn set_render_order(&mut self, layers: &[LayerId]) -> Result<(), DriverError> {
        let mut scene = self.scene();
        if let Some(missing) = layers.iter().find(|id| !scene.layers.contains_key(*id)) {
            return Err(DriverError::UnknownLayer(*missing));
        }
        scene.render_order = layers.to_vec();
        scene.record(DriverCall::RenderOrder(layers.to_vec()));
        Ok(())
    }

    fn create_surface(&mut self, surface: SurfaceId, layer: LayerId) -> Result<(), DriverError> {
        let mut scene = self.scene();
        let target = scene.layers.get_mut(&layer).ok_or(DriverError::UnknownLayer(layer))?;
        if !target.surfaces.contains(&surface) {
            target.surfaces.push(surface);
        }
        scene.surfaces.entry(surface).or_default().layer = layer;
        scene.record(DriverCall::CreateSurface { surface, layer });
        Ok(())
    }

    fn remove_surface(&mut self, surface: SurfaceId) -> Result<(), DriverError> {
        let mut scene = self.scene();
        let removed = scene.surfaces.remove(&surface).ok_or(DriverError::UnknownSurface(surface))?;
        if let Some(layer) = scene.layers.get_mut(&removed.layer) {
            layer.surfaces.retain(|s| *s != surface);
        }
        scene.record(DriverCall::RemoveSurface(surface));
        Ok(())
    }

    fn surface_exists(&self, surface: SurfaceId) -> bool {
        self.scene().surfaces.contains_key(&surface)
    }

    fn set_surface_visibility(&mut self, surface: SurfaceId, visible: bool) -> Result<(), DriverError> {
        self.with_surface(surface, DriverCall::SurfaceVisibility { surface, visible }, |s| s.visible = visible)
    }

    fn set_surface_source_rect(&mut self, surface: SurfaceId, rect: Rect) -> Result<(), DriverError> {
        self.with_surface(surface, DriverCall::SurfaceSourceRect { surface, rect }, |s| s.source = rect)
    }

    fn set_surface_dest_rect(&mut self, surface: SurfaceId, rect: Rect) -> Result<(), DriverError> {
        self.with_surface(surface, DriverCall::SurfaceDestRect { surface, rect }, |s| s.dest = rect)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.scene().record(DriverCall::Commit);
        Ok(())
    }
}
