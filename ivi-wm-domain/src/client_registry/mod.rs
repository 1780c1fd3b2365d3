//! Connected clients, their role → surface bindings and per-layer occupancy.
//!
//! Everything here is mutated only while the [`crate::transition::WindowManagerCore`]
//! lock is held, so the registry itself carries no locking.

pub mod id_allocator;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::types::{LayerId, SurfaceId};
pub use id_allocator::IdAllocator;

/// Occupants of one layer.
///
/// `main` and `sub` are never the same surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutState {
    pub main: Option<SurfaceId>,
    pub sub: Option<SurfaceId>,
}

impl LayoutState {
    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.main == Some(surface) || self.sub == Some(surface)
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.sub.is_none()
    }

    pub fn is_split(&self) -> bool {
        self.main.is_some() && self.sub.is_some()
    }

    /// Clears whichever slot holds `surface`. Returns whether anything changed.
    pub fn vacate(&mut self, surface: SurfaceId) -> bool {
        let mut changed = false;
        if self.main == Some(surface) {
            self.main = None;
            changed = true;
        }
        if self.sub == Some(surface) {
            self.sub = None;
            changed = true;
        }
        changed
    }

    pub fn is_consistent(&self) -> bool {
        match (self.main, self.sub) {
            (Some(m), Some(s)) => m != s,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceBinding {
    pub surface: SurfaceId,
    pub layer: LayerId,
}

/// One connected application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmClient {
    app_id: String,
    bindings: BTreeMap<String, SurfaceBinding>,
}

impl WmClient {
    fn new(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn surface_for(&self, role: &str) -> Option<SurfaceId> {
        self.bindings.get(role).map(|b| b.surface)
    }

    pub fn role_for(&self, surface: SurfaceId) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, b)| b.surface == surface)
            .map(|(role, _)| role.as_str())
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, SurfaceBinding)> {
        self.bindings.iter().map(|(role, b)| (role.as_str(), *b))
    }
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, WmClient>,
    owners: HashMap<SurfaceId, String>,
    layouts: BTreeMap<LayerId, LayoutState>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty [`LayoutState`] for each layer.
    pub fn init_layers(&mut self, layers: impl IntoIterator<Item = LayerId>) {
        for layer in layers {
            self.layouts.entry(layer).or_default();
        }
    }

    /// Adds a client, or a binding to an existing client. Re-adding the same
    /// (app, role) replaces its binding.
    pub fn add_client(&mut self, app_id: &str, layer: LayerId, surface: SurfaceId, role: &str) {
        let client = self.clients.entry(app_id.to_string()).or_insert_with(|| WmClient::new(app_id));
        if let Some(old) = client.bindings.insert(role.to_string(), SurfaceBinding { surface, layer }) {
            if old.surface != surface {
                self.owners.remove(&old.surface);
            }
        }
        self.owners.insert(surface, app_id.to_string());
        debug!(app_id, role, surface, layer, "Client binding added");
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.clients.contains_key(app_id)
    }

    pub fn client(&self, app_id: &str) -> Option<&WmClient> {
        self.clients.get(app_id)
    }

    pub fn lookup_surface(&self, app_id: &str, role: &str) -> Option<SurfaceId> {
        self.clients.get(app_id)?.surface_for(role)
    }

    pub fn lookup_role(&self, app_id: &str, surface: SurfaceId) -> Option<&str> {
        self.clients.get(app_id)?.role_for(surface)
    }

    /// App id owning `surface`.
    pub fn owner_of(&self, surface: SurfaceId) -> Option<&str> {
        self.owners.get(&surface).map(String::as_str)
    }

    /// Owner and role of `surface`.
    pub fn binding_of(&self, surface: SurfaceId) -> Option<(&str, &str)> {
        let app_id = self.owner_of(surface)?;
        let role = self.clients.get(app_id)?.role_for(surface)?;
        Some((app_id, role))
    }

    pub fn layer_of(&self, surface: SurfaceId) -> Option<LayerId> {
        let app_id = self.owners.get(&surface)?;
        self.clients
            .get(app_id)?
            .bindings
            .values()
            .find(|b| b.surface == surface)
            .map(|b| b.layer)
    }

    /// Removes the client and returns it so the caller can scrub its surfaces.
    pub fn remove_client(&mut self, app_id: &str) -> Option<WmClient> {
        let client = self.clients.remove(app_id)?;
        for binding in client.bindings.values() {
            self.owners.remove(&binding.surface);
            self.scrub_surface(binding.surface);
        }
        debug!(app_id, "Client removed");
        Some(client)
    }

    /// Drops the single binding for `surface`; a client left without
    /// bindings stays registered. Returns `(app_id, role)` of the binding.
    pub fn remove_surface(&mut self, surface: SurfaceId) -> Option<(String, String)> {
        let app_id = self.owners.remove(&surface)?;
        let client = self.clients.get_mut(&app_id)?;
        let role = client.role_for(surface)?.to_string();
        client.bindings.remove(&role);
        self.scrub_surface(surface);
        debug!(app_id = %app_id, role = %role, surface, "Surface binding removed");
        Some((app_id, role))
    }

    /// Clears every `main`/`sub` slot that still refers to `surface`.
    pub fn scrub_surface(&mut self, surface: SurfaceId) {
        for (layer, state) in self.layouts.iter_mut() {
            if state.vacate(surface) {
                debug!(layer, surface, "Stale surface removed from layout");
            }
        }
    }

    pub fn layout(&self, layer: LayerId) -> LayoutState {
        self.layouts.get(&layer).copied().unwrap_or_default()
    }

    pub(crate) fn set_layout(&mut self, layer: LayerId, state: LayoutState) {
        self.layouts.insert(layer, state);
    }

    pub fn layouts(&self) -> impl Iterator<Item = (LayerId, LayoutState)> + '_ {
        self.layouts.iter().map(|(id, s)| (*id, *s))
    }

    /// Layer on which `surface` is currently main or sub.
    pub fn occupied_layer(&self, surface: SurfaceId) -> Option<LayerId> {
        self.layouts.iter().find(|(_, s)| s.contains(surface)).map(|(id, _)| *id)
    }

    /// Occupancy invariants: no layer has main == sub and no surface occupies
    /// two layers.
    pub fn layouts_consistent(&self) -> bool {
        let mut seen = HashMap::new();
        for (layer, state) in &self.layouts {
            if !state.is_consistent() {
                return false;
            }
            for surface in [state.main, state.sub].into_iter().flatten() {
                if seen.insert(surface, *layer).is_some() {
                    return false;
                }
            }
        }
        true
    }
}
