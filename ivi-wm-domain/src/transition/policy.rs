//! Layout policy: turns the current request into a list of per-surface actions.
//!
//! Planning only reads the registry and layer map. Occupancy is changed
//! later, when the transition commits.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use ivi_wm_core::PolicyConfig;

use crate::client_registry::ClientRegistry;
use crate::error::{WMError, WmResult};
use crate::layer_map::{LayerMap, SplitParty};
use crate::request_queue::{WmAction, WmTrigger};
use crate::types::{LayerId, SurfaceId, Task, Visibility, AREA_SPLIT_MAIN, AREA_SPLIT_SUB};

/// Read-only view of the state a policy decides on.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub layers: &'a LayerMap,
    pub clients: &'a ClientRegistry,
    /// Area each surface was last laid out in.
    pub current_area: &'a HashMap<SurfaceId, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Actions to execute, the requested surface last.
    Actions(Vec<WmAction>),
    /// The request would not change anything on screen.
    NoChange,
}

/// Layout policies the window manager can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// Single main surface per layer, optional split, higher layers cleared.
    Reference(ReferencePolicy),
}

impl LayoutPolicy {
    pub fn from_config(config: &PolicyConfig) -> Self {
        LayoutPolicy::Reference(ReferencePolicy {
            fullscreen_roles: config.fullscreen_roles.clone(),
            fullscreen_area: config.fullscreen_area.clone(),
        })
    }

    pub fn is_fullscreen_role(&self, role: &str) -> bool {
        match self {
            LayoutPolicy::Reference(p) => p.is_fullscreen_role(role),
        }
    }

    pub fn plan(&self, ctx: &PolicyContext<'_>, trigger: &WmTrigger) -> WmResult<PolicyOutcome> {
        match self {
            LayoutPolicy::Reference(p) => p.plan(ctx, trigger),
        }
    }
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePolicy {
    fullscreen_roles: Vec<String>,
    fullscreen_area: String,
}

impl ReferencePolicy {
    fn is_fullscreen_role(&self, role: &str) -> bool {
        self.fullscreen_roles.iter().any(|r| r == role)
    }

    fn plan(&self, ctx: &PolicyContext<'_>, trigger: &WmTrigger) -> WmResult<PolicyOutcome> {
        let Some(surface) = ctx.clients.lookup_surface(&trigger.app_id, &trigger.role) else {
            warn!(app_id = %trigger.app_id, role = %trigger.role, "Surface vanished before policy check");
            return Err(WMError::LayoutChangeFail);
        };
        let Some(layer) = ctx.clients.layer_of(surface) else {
            warn!(surface, "Surface is not associated with any layer");
            return Err(WMError::LayoutChangeFail);
        };

        match trigger.task {
            Task::Allocate => self.plan_allocate(ctx, trigger, surface, layer),
            Task::Release => Self::plan_release(ctx, trigger, surface, layer),
        }
    }

    fn plan_release(
        ctx: &PolicyContext<'_>,
        trigger: &WmTrigger,
        surface: SurfaceId,
        layer: LayerId,
    ) -> WmResult<PolicyOutcome> {
        if !ctx.clients.layout(layer).contains(surface) {
            debug!(surface, layer, "Released surface is not on screen");
            return Ok(PolicyOutcome::NoChange);
        }
        Ok(PolicyOutcome::Actions(vec![WmAction::new(
            &trigger.app_id,
            &trigger.role,
            surface,
            layer,
            "",
            Visibility::Invisible,
        )]))
    }

    fn plan_allocate(
        &self,
        ctx: &PolicyContext<'_>,
        trigger: &WmTrigger,
        surface: SurfaceId,
        layer: LayerId,
    ) -> WmResult<PolicyOutcome> {
        let state = ctx.clients.layout(layer);
        let fullscreen = self.is_fullscreen_role(&trigger.role);
        let mut area = if fullscreen {
            info!(role = %trigger.role, area = %self.fullscreen_area, "Fullscreen role keeps its area");
            self.fullscreen_area.clone()
        } else {
            trigger.area.clone()
        };
        let mut actions = Vec::new();

        let split_main = if fullscreen { None } else { self.split_partner(ctx, trigger, surface, layer)? };
        if let Some((main, app_id, role)) = &split_main {
            info!(main = *main, sub = surface, "Split layout, requested area becomes {}", AREA_SPLIT_SUB);
            actions.push(WmAction::new(app_id, role, *main, layer, AREA_SPLIT_MAIN, Visibility::Visible));
            area = AREA_SPLIT_SUB.to_string();
        }

        if !fullscreen {
            for (other_layer, other) in ctx.clients.layouts() {
                if other_layer <= layer {
                    continue;
                }
                for evicted in [other.main, other.sub].into_iter().flatten() {
                    actions.push(Self::eviction(ctx, evicted, other_layer)?);
                }
            }
            if split_main.is_none() {
                if let Some(main) = state.main.filter(|m| *m != surface) {
                    actions.push(Self::eviction(ctx, main, layer)?);
                }
            }
            if let Some(sub) = state.sub.filter(|s| *s != surface) {
                actions.push(Self::eviction(ctx, sub, layer)?);
            }
        }

        // A re-activated split keeps its main action, which is a no-op when the main is still in place.
        let unchanged = Self::in_place(ctx, surface, layer, &area)
            && actions
                .iter()
                .all(|a| a.visibility == Visibility::Visible && Self::in_place(ctx, a.surface, a.layer, &a.area));
        if unchanged {
            debug!(surface, area = %area, "Surface already shown in requested area");
            return Ok(PolicyOutcome::NoChange);
        }

        actions.push(WmAction::new(
            &trigger.app_id,
            &trigger.role,
            surface,
            layer,
            &area,
            Visibility::Visible,
        ));
        Ok(PolicyOutcome::Actions(actions))
    }

    /// Whether `surface` already sits in the slot `area` implies and was last shown in `area`.
    fn in_place(ctx: &PolicyContext<'_>, surface: SurfaceId, layer: LayerId, area: &str) -> bool {
        let state = ctx.clients.layout(layer);
        let slot = if area == AREA_SPLIT_SUB { state.sub } else { state.main };
        slot == Some(surface) && ctx.current_area.get(&surface).is_some_and(|a| a == area)
    }

    /// Current main of `layer` if the requested surface may join it as sub.
    fn split_partner(
        &self,
        ctx: &PolicyContext<'_>,
        trigger: &WmTrigger,
        surface: SurfaceId,
        layer: LayerId,
    ) -> WmResult<Option<(SurfaceId, String, String)>> {
        let Some(main) = ctx.clients.layout(layer).main.filter(|m| *m != surface) else {
            return Ok(None);
        };
        let Some((app_id, role)) = ctx.clients.binding_of(main) else {
            warn!(surface = main, "Main surface has no owner");
            return Err(WMError::NotRegistered);
        };
        if self.is_fullscreen_role(role) {
            return Ok(None);
        }
        let main_layer = ctx.clients.layer_of(main).unwrap_or(layer);
        let can_split = ctx.layers.can_split(
            layer,
            SplitParty { surface: main, layer: main_layer, role },
            SplitParty { surface, layer, role: &trigger.role },
        );
        Ok(can_split.then(|| (main, app_id.to_string(), role.to_string())))
    }

    fn eviction(ctx: &PolicyContext<'_>, surface: SurfaceId, layer: LayerId) -> WmResult<WmAction> {
        let Some((app_id, role)) = ctx.clients.binding_of(surface) else {
            warn!(surface, layer, "Surface to hide has no owner");
            return Err(WMError::NotRegistered);
        };
        debug!(app_id, role, surface, layer, "Hiding surface");
        Ok(WmAction::new(app_id, role, surface, layer, "", Visibility::Invisible))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAYERS: &str = r#"{
        "mappings": [
            { "role": "homescreen", "name": "home", "layer_id": 1000 },
            {
                "role": "music|video|map|radio",
                "name": "apps",
                "layer_id": 1001,
                "split_layouts": [
                    { "name": "map_music", "main_match": "map", "sub_match": "music|video" }
                ]
            },
            { "role": "on_screen.*", "name": "popups", "layer_id": 9999 }
        ]
    }"#;

    const AREAS: &str = r#"{
        "areas": [
            { "name": "fullscreen", "rect": { "x": 0, "y": 0, "w": 1080, "h": 1920 } },
            { "name": "normal.full", "rect": { "x": 0, "y": 218, "w": 1080, "h": 1488 } },
            { "name": "split.main", "rect": { "x": 0, "y": 218, "w": 1080, "h": 744 } },
            { "name": "split.sub", "rect": { "x": 0, "y": 962, "w": 1080, "h": 744 } }
        ]
    }"#;

    struct Fixture {
        layers: LayerMap,
        clients: ClientRegistry,
        current_area: HashMap<SurfaceId, String>,
    }

    impl Fixture {
        fn new() -> Self {
            let layers = LayerMap::from_json(LAYERS, AREAS).unwrap();
            let mut clients = ClientRegistry::new();
            clients.init_layers(layers.layer_ids());
            clients.add_client("home", 1000, 1, "homescreen");
            clients.add_client("nav", 1001, 2, "map");
            clients.add_client("player", 1001, 3, "music");
            clients.add_client("tuner", 1001, 4, "radio");
            clients.add_client("popup", 9999, 5, "on_screen");
            Self { layers, clients, current_area: HashMap::new() }
        }

        fn show(&mut self, layer: LayerId, main: Option<SurfaceId>, sub: Option<SurfaceId>, area: &str) {
            self.clients.set_layout(layer, crate::client_registry::LayoutState { main, sub });
            for s in [main, sub].into_iter().flatten() {
                self.current_area.insert(s, area.to_string());
            }
        }

        fn plan(&self, app_id: &str, role: &str, area: &str, task: Task) -> WmResult<PolicyOutcome> {
            let ctx = PolicyContext {
                layers: &self.layers,
                clients: &self.clients,
                current_area: &self.current_area,
            };
            LayoutPolicy::default().plan(
                &ctx,
                &WmTrigger {
                    app_id: app_id.into(),
                    role: role.into(),
                    area: area.into(),
                    task,
                },
            )
        }
    }

    fn summary(outcome: PolicyOutcome) -> Vec<(SurfaceId, String, Visibility)> {
        match outcome {
            PolicyOutcome::Actions(actions) => actions.into_iter().map(|a| (a.surface, a.area, a.visibility)).collect(),
            PolicyOutcome::NoChange => Vec::new(),
        }
    }

    #[test]
    fn allocate_on_empty_layer_is_single_action() {
        let f = Fixture::new();
        let actions = summary(f.plan("nav", "map", "normal.full", Task::Allocate).unwrap());
        assert_eq!(actions, vec![(2, "normal.full".to_string(), Visibility::Visible)]);
    }

    #[test]
    fn same_layer_occupant_is_evicted_without_split_rule() {
        let mut f = Fixture::new();
        f.show(1001, Some(4), None, "normal.full");
        let actions = summary(f.plan("nav", "map", "normal.full", Task::Allocate).unwrap());
        assert_eq!(
            actions,
            vec![
                (4, String::new(), Visibility::Invisible),
                (2, "normal.full".to_string(), Visibility::Visible),
            ]
        );
    }

    #[test]
    fn matching_split_rule_keeps_main_and_moves_request_to_sub() {
        let mut f = Fixture::new();
        f.show(1001, Some(2), None, "normal.full");
        let actions = summary(f.plan("player", "music", "normal.full", Task::Allocate).unwrap());
        assert_eq!(
            actions,
            vec![
                (2, AREA_SPLIT_MAIN.to_string(), Visibility::Visible),
                (3, AREA_SPLIT_SUB.to_string(), Visibility::Visible),
            ]
        );
    }

    #[test]
    fn higher_layers_are_cleared() {
        let mut f = Fixture::new();
        f.show(9999, Some(5), None, "on_screen");
        let actions = summary(f.plan("nav", "map", "normal.full", Task::Allocate).unwrap());
        assert_eq!(actions[0], (5, String::new(), Visibility::Invisible));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn fullscreen_role_never_evicts_and_gets_fullscreen_area() {
        let mut f = Fixture::new();
        f.show(1001, Some(2), None, "normal.full");
        f.show(9999, Some(5), None, "on_screen");
        let actions = summary(f.plan("home", "homescreen", "normal.full", Task::Allocate).unwrap());
        assert_eq!(actions, vec![(1, "fullscreen".to_string(), Visibility::Visible)]);
    }

    #[test]
    fn reactivation_in_same_area_is_no_change() {
        let mut f = Fixture::new();
        f.show(1001, Some(2), None, "normal.full");
        assert_eq!(f.plan("nav", "map", "normal.full", Task::Allocate).unwrap(), PolicyOutcome::NoChange);
        assert!(matches!(
            f.plan("nav", "map", "split.main", Task::Allocate).unwrap(),
            PolicyOutcome::Actions(_)
        ));
    }

    #[test]
    fn reactivating_the_sub_of_a_split_is_no_change() {
        let mut f = Fixture::new();
        f.show(1001, Some(2), Some(3), AREA_SPLIT_SUB);
        f.current_area.insert(2, AREA_SPLIT_MAIN.to_string());
        assert_eq!(f.plan("player", "music", "normal.full", Task::Allocate).unwrap(), PolicyOutcome::NoChange);
        assert_eq!(f.plan("player", "music", AREA_SPLIT_SUB, Task::Allocate).unwrap(), PolicyOutcome::NoChange);

        // main moved elsewhere, so the split has to be rebuilt
        f.current_area.insert(2, "normal.full".to_string());
        let actions = summary(f.plan("player", "music", "normal.full", Task::Allocate).unwrap());
        assert_eq!(
            actions,
            vec![
                (2, AREA_SPLIT_MAIN.to_string(), Visibility::Visible),
                (3, AREA_SPLIT_SUB.to_string(), Visibility::Visible),
            ]
        );
    }

    #[test]
    fn release_hides_only_target() {
        let mut f = Fixture::new();
        f.show(1001, Some(2), Some(3), "split.main");
        let actions = summary(f.plan("player", "music", "", Task::Release).unwrap());
        assert_eq!(actions, vec![(3, String::new(), Visibility::Invisible)]);
        assert_eq!(f.plan("tuner", "radio", "", Task::Release).unwrap(), PolicyOutcome::NoChange);
    }

    #[test]
    fn missing_binding_fails_layout_change() {
        let f = Fixture::new();
        assert_eq!(
            f.plan("nav", "video", "normal.full", Task::Allocate),
            Err(WMError::LayoutChangeFail)
        );
    }
}
