//! The transition state machine and the state it owns.
//!
//! [`WindowManagerCore`] serializes activate/deactivate requests. The
//! request at the front of the queue walks through
//! `PolicyCheck → AwaitingDraw → Committing` and is then removed; the next
//! one starts immediately. Waiting for clients to draw is a state, not a
//! blocked task: acknowledgements and timer expiries arrive as further
//! calls on the core.
//!
//! The core is not internally synchronized. [`crate::service::DefaultWindowManager`]
//! wraps it in a single mutex.

pub mod policy;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, info_span, warn};

use ivi_wm_core::{scale_dest_rect, Rect, ScalingMode, ServiceConfig, Size};

use crate::client_registry::{ClientRegistry, IdAllocator, LayoutState};
use crate::driver::{CompositorDriver, DisplayInfo};
use crate::error::{WMError, WmResult};
use crate::events::{EventKind, EventSubscription, WmEvent};
use crate::layer_map::{LayerArea, LayerMap, LayerMapError};
use crate::request_queue::{RequestHandle, RequestQueue, WmAction, WmRequest, WmTrigger};
use crate::roles::RoleAliasTable;
use crate::timeout::{NoRuntime, TimeoutSupervisor};
use crate::types::{LayerId, RequestId, SurfaceId, Task, AREA_SPLIT_SUB};
pub use policy::{LayoutPolicy, PolicyContext, PolicyOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "request", rename_all = "snake_case")]
pub enum TransitionState {
    Idle,
    PolicyCheck(RequestId),
    AwaitingDraw(RequestId),
    Committing(RequestId),
}

impl TransitionState {
    /// The request being worked on, if any.
    pub fn request(&self) -> Option<RequestId> {
        match self {
            TransitionState::Idle => None,
            TransitionState::PolicyCheck(id)
            | TransitionState::AwaitingDraw(id)
            | TransitionState::Committing(id) => Some(*id),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TransitionState::Idle)
    }
}

#[derive(Debug, Error)]
pub enum CoreInitError {
    #[error("Failed to load layout documents: {0}")]
    Documents(#[from] LayerMapError),
    #[error(transparent)]
    Timer(#[from] NoRuntime),
    #[error("Failed to set up compositor layers: {0}")]
    LayerSetup(#[source] WMError),
}

/// Runtime knobs of the core, usually taken from [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub timeout: Duration,
    pub event_capacity: usize,
    pub scaling: ScalingMode,
    pub policy: LayoutPolicy,
}

impl CoreSettings {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.transition.timeout_ms),
            event_capacity: config.transition.event_capacity,
            scaling: config.display.scaling,
            policy: LayoutPolicy::from_config(&config.policy),
        }
    }
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self::from_config(&ServiceConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSnapshot {
    pub id: LayerId,
    pub name: String,
    pub area: LayerArea,
    pub main: Option<SurfaceId>,
    pub sub: Option<SurfaceId>,
}

/// Debug view of the whole layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutSnapshot {
    pub state: TransitionState,
    pub main_surface: Option<SurfaceId>,
    pub queued: usize,
    pub layers: Vec<LayerSnapshot>,
}

/// How far `begin` got with the current request.
enum Begun {
    AwaitingDraw,
    Committed,
    NoChange,
}

pub struct WindowManagerCore {
    layers: LayerMap,
    roles: RoleAliasTable,
    ids: IdAllocator,
    clients: ClientRegistry,
    queue: RequestQueue,
    state: TransitionState,
    policy: LayoutPolicy,
    driver: Box<dyn CompositorDriver>,
    events: broadcast::Sender<WmEvent>,
    timer: TimeoutSupervisor,
    timeout: Duration,
    scaling: ScalingMode,
    area_info: HashMap<SurfaceId, Rect>,
    current_area: HashMap<SurfaceId, String>,
    main_surface: Option<SurfaceId>,
}

impl std::fmt::Debug for WindowManagerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManagerCore")
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .field("surfaces", &self.ids.len())
            .finish_non_exhaustive()
    }
}

impl WindowManagerCore {
    /// Builds the core and starts its timer task.
    ///
    /// The returned receiver yields the request number of every timer
    /// expiry; feed each one to [`WindowManagerCore::handle_timeout`].
    pub fn new(
        layers: LayerMap,
        roles: RoleAliasTable,
        driver: Box<dyn CompositorDriver>,
        settings: CoreSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RequestId>), CoreInitError> {
        let (timer, expired) = TimeoutSupervisor::spawn()?;
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        let mut clients = ClientRegistry::new();
        clients.init_layers(layers.layer_ids());

        let core = Self {
            layers,
            roles,
            ids: IdAllocator::new(),
            clients,
            queue: RequestQueue::new(),
            state: TransitionState::Idle,
            policy: settings.policy,
            driver,
            events,
            timer,
            timeout: settings.timeout,
            scaling: settings.scaling,
            area_info: HashMap::new(),
            current_area: HashMap::new(),
            main_surface: None,
        };
        Ok((core, expired))
    }

    /// Loads the layout documents named in `config` (or the built-in ones).
    pub fn from_config(
        config: &ServiceConfig,
        driver: Box<dyn CompositorDriver>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RequestId>), CoreInitError> {
        let paths = config.paths.clone().with_install_dir_fallback();
        let layers = LayerMap::load(paths.layers.as_deref(), paths.areas.as_deref())?;
        let roles = RoleAliasTable::load(paths.old_roles.as_deref())?;
        Self::new(layers, roles, driver, CoreSettings::from_config(config))
    }

    /// Creates every configured layer on the compositor, scaled to the output.
    pub fn init_layers(&mut self) -> WmResult<()> {
        let Some(base) = self.layers.base_size() else {
            error!("No fullscreen area configured, cannot derive layout base size");
            return Err(WMError::LayoutChangeFail);
        };
        let display = self.driver.display_info()?;
        let output = Size::new(display.width_px, display.height_px);
        let dest = scale_dest_rect(base, output, self.scaling).ok_or(WMError::LayoutChangeFail)?;
        info!(
            base_w = base.width,
            base_h = base.height,
            out_w = output.width,
            out_h = output.height,
            scaling = self.scaling.as_str(),
            ?dest,
            "Initialising layers"
        );

        let ids = self.layers.layer_ids();
        let source = Rect::new(0, 0, base.width as i32, base.height as i32);
        let scaled = dest.size();
        for id in &ids {
            self.driver.create_layer(*id, scaled.width, scaled.height)?;
            self.driver.set_layer_source_rect(*id, source)?;
            self.driver.set_layer_dest_rect(*id, dest)?;
            self.driver.set_layer_visibility(*id, true)?;
        }
        self.driver.set_render_order(&ids)?;
        self.driver.commit()?;
        Ok(())
    }

    /// Allocates a surface id for the role behind `drawing_name`.
    pub fn request_surface(&mut self, app_id: &str, drawing_name: &str) -> WmResult<SurfaceId> {
        let role = self.roles.canonical(drawing_name);
        let layer = self.layer_for(&role)?;
        let surface = self.ids.generate(&role)?;
        self.bind(app_id, drawing_name, &role, surface, layer);
        info!(app_id, role = %role, surface, layer, "Surface requested");
        Ok(surface)
    }

    /// Registers a client-chosen surface id and attaches it to its layer.
    pub fn request_surface_xdg(&mut self, app_id: &str, drawing_name: &str, surface: SurfaceId) -> WmResult<()> {
        let role = self.roles.canonical(drawing_name);
        let layer = self.layer_for(&role)?;
        self.ids.register(&role, surface)?;
        self.bind(app_id, drawing_name, &role, surface, layer);
        self.driver.create_surface(surface, layer)?;
        self.driver.commit()?;
        info!(app_id, role = %role, surface, layer, "Surface registered");
        Ok(())
    }

    fn layer_for(&self, role: &str) -> WmResult<LayerId> {
        self.layers.resolve_layer(role).ok_or_else(|| {
            warn!(role, "Drawing name does not match any role, fallback is disabled");
            WMError::NotRegistered
        })
    }

    fn bind(&mut self, app_id: &str, drawing_name: &str, role: &str, surface: SurfaceId, layer: LayerId) {
        self.clients.add_client(app_id, layer, surface, role);
        self.roles.remember_label(role, drawing_name);
        if self.layers.main_surface_role() == Some(drawing_name) {
            debug!(surface, "Main surface set");
            self.main_surface = Some(surface);
        }
    }

    /// Validates and queues an activate or deactivate request.
    ///
    /// When the queue was empty the request starts at once, and its policy
    /// result is reported here: `NoLayoutChange` for a no-op, or the error
    /// that aborted it.
    pub fn submit(&mut self, app_id: &str, drawing_name: &str, area: &str, task: Task) -> WmResult<RequestHandle> {
        let role = self.roles.canonical(drawing_name);
        if task == Task::Allocate {
            if self.layers.resolve_layer(&role).is_none() {
                warn!(app_id, role = %role, "Role has no layer");
                return Err(WMError::LayoutChangeFail);
            }
            if !self.policy.is_fullscreen_role(&role) && !self.layers.has_area(area) {
                warn!(app_id, area, "Unknown area");
                return Err(WMError::LayoutChangeFail);
            }
            if !self.clients.contains(app_id) {
                return Err(WMError::NotRegistered);
            }
        }
        if self.clients.lookup_surface(app_id, &role).is_none() {
            debug!(app_id, role = %role, "App holds no surface for role");
            return Err(WMError::NotRegistered);
        }

        let handle = self.queue.push(WmTrigger {
            app_id: app_id.to_string(),
            role,
            area: area.to_string(),
            task,
        })?;
        info!(req = handle.id, app_id, ?task, queued_behind = handle.queued_behind, "Request accepted");

        match self.advance(Some(handle.id)) {
            Some(err) => Err(err),
            None => Ok(handle),
        }
    }

    /// Records a client's draw acknowledgement for the current request.
    pub fn mark_draw_finished(&mut self, app_id: &str, drawing_name: &str) -> WmResult<()> {
        let role = self.roles.canonical(drawing_name);
        let TransitionState::AwaitingDraw(id) = self.state else {
            debug!(app_id, role = %role, state = ?self.state, "end_draw outside of a transition");
            return Err(WMError::Fail);
        };
        let request = self.queue.current_mut().ok_or(WMError::NoEntry)?;
        if request.mark_draw_finished(app_id, &role) == 0 {
            debug!(req = id, app_id, role = %role, "end_draw matches no pending action");
            return Err(WMError::Fail);
        }
        if !request.draw_complete() {
            debug!(req = id, app_id, role = %role, "Waiting for remaining draws");
            return Ok(());
        }

        self.timer.disarm();
        let span = info_span!("request", req = id);
        let _enter = span.enter();
        if let Err(err) = self.commit(id) {
            self.abort(id, err);
        }
        self.advance(None);
        Ok(())
    }

    /// Reacts to a timer expiry. Returns whether it aborted the current request.
    pub fn handle_timeout(&mut self, id: RequestId) -> bool {
        if self.state != TransitionState::AwaitingDraw(id) {
            debug!(req = id, state = ?self.state, "Ignoring stale timer expiry");
            return false;
        }
        {
            let span = info_span!("request", req = id);
            let _enter = span.enter();
            warn!("Draw acknowledgements did not arrive in time");
            self.abort(id, WMError::TimeoutExpired);
        }
        self.advance(None);
        true
    }

    /// Forgets everything about `app_id`. A current request still waiting
    /// for one of its surfaces to draw is aborted.
    pub fn client_disconnected(&mut self, app_id: &str) {
        let dropped = self.queue.remove_pending_for(app_id);
        if dropped > 0 {
            info!(app_id, dropped, "Dropped queued requests of disconnected client");
        }
        let Some(client) = self.clients.remove_client(app_id) else {
            debug!(app_id, "Disconnect of unknown client");
            return;
        };
        for (role, binding) in client.bindings() {
            self.forget_surface(role, binding.surface);
            if self.driver.surface_exists(binding.surface) {
                if let Err(e) = self.driver.remove_surface(binding.surface) {
                    warn!(app_id, surface = binding.surface, error = %e, "Could not remove surface");
                }
            }
        }
        if let Err(e) = self.driver.commit() {
            warn!(app_id, error = %e, "Commit after disconnect failed");
        }
        info!(app_id, "Client disconnected");
        self.abort_current_if(|action| action.app_id == app_id);
    }

    /// The compositor created `surface`; attach it if it was requested here.
    pub fn surface_created(&mut self, surface: SurfaceId) -> WmResult<()> {
        let Some(layer) = self.clients.layer_of(surface) else {
            debug!(surface, "Surface was not requested through the window manager, ignoring");
            return Ok(());
        };
        self.driver.create_surface(surface, layer)?;
        self.driver.commit()?;
        info!(surface, layer, "Surface attached to layer");
        if self.clients.occupied_layer(surface).is_some() {
            if let Some(rect) = self.area_info.get(&surface).copied() {
                debug!(surface, ?rect, "Applying layout committed before the surface existed");
                self.show_surface(surface, rect)?;
            }
        }
        Ok(())
    }

    /// The compositor destroyed `surface`.
    pub fn surface_removed(&mut self, surface: SurfaceId) -> bool {
        let Some((app_id, role)) = self.clients.remove_surface(surface) else {
            debug!(surface, "Removed surface is not managed");
            return false;
        };
        self.forget_surface(&role, surface);
        info!(app_id = %app_id, role = %role, surface, "Surface removed");
        self.abort_current_if(|action| action.surface == surface);
        true
    }

    fn forget_surface(&mut self, role: &str, surface: SurfaceId) {
        self.ids.remove_id(surface);
        self.roles.forget_label(role);
        self.area_info.remove(&surface);
        self.current_area.remove(&surface);
        if self.main_surface == Some(surface) {
            self.main_surface = None;
        }
    }

    fn abort_current_if<F>(&mut self, gone: F)
    where
        F: Fn(&WmAction) -> bool,
    {
        let TransitionState::AwaitingDraw(id) = self.state else {
            return;
        };
        let Some(request) = self.queue.current() else {
            return;
        };
        if request.actions().iter().any(|a| a.awaits_draw() && gone(a)) {
            {
                let span = info_span!("request", req = id);
                let _enter = span.enter();
                warn!("A surface the transition waits for is gone");
                self.abort(id, WMError::NotRegistered);
            }
            self.advance(None);
        }
    }

    pub fn display_info(&self) -> WmResult<DisplayInfo> {
        Ok(self.driver.display_info()?)
    }

    /// Rectangle last applied to the surface of `drawing_name`, while it is shown.
    pub fn area_info(&self, drawing_name: &str) -> WmResult<Rect> {
        let role = self.roles.canonical(drawing_name);
        let surface = self.ids.lookup_id(&role).ok_or(WMError::NotRegistered)?;
        if self.clients.occupied_layer(surface).is_none() {
            debug!(role = %role, surface, "Surface is inactive");
            return Err(WMError::NotRegistered);
        }
        self.area_info.get(&surface).copied().ok_or(WMError::NotRegistered)
    }

    /// Every allocated surface keyed by the name its client uses.
    pub fn drawing_names(&self) -> BTreeMap<String, SurfaceId> {
        self.ids
            .iter()
            .map(|(role, id)| (self.roles.label(role).to_string(), id))
            .collect()
    }

    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        let layers = self
            .layers
            .layers()
            .map(|def| {
                let state = self.clients.layout(def.id);
                LayerSnapshot {
                    id: def.id,
                    name: def.name.clone(),
                    area: def.area,
                    main: state.main,
                    sub: state.sub,
                }
            })
            .collect();
        LayoutSnapshot {
            state: self.state,
            main_surface: self.main_surface,
            queued: self.queue.len(),
            layers,
        }
    }

    pub fn subscribe(&self, kinds: impl IntoIterator<Item = EventKind>) -> EventSubscription {
        EventSubscription::new(self.events.subscribe(), kinds)
    }

    pub fn event_sender(&self) -> broadcast::Sender<WmEvent> {
        self.events.clone()
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn layers(&self) -> &LayerMap {
        &self.layers
    }

    pub fn main_surface(&self) -> Option<SurfaceId> {
        self.main_surface
    }

    pub fn armed_timer(&self) -> Option<RequestId> {
        self.timer.armed_for()
    }

    /// Runs queued requests until one waits for drawing or the queue is empty.
    /// Returns the failure of `origin`, if that request ended here without success.
    fn advance(&mut self, origin: Option<RequestId>) -> Option<WMError> {
        let mut reply = None;
        while self.state.is_idle() {
            let Some(id) = self.queue.current_id() else {
                break;
            };
            let span = info_span!("request", req = id);
            let _enter = span.enter();
            match self.begin(id) {
                Ok(Begun::AwaitingDraw) | Ok(Begun::Committed) => {}
                Ok(Begun::NoChange) => {
                    info!("No layout change");
                    self.finish(id);
                    if origin == Some(id) {
                        reply = Some(WMError::NoLayoutChange);
                    }
                }
                Err(err) => {
                    self.abort(id, err);
                    if origin == Some(id) {
                        reply = Some(err);
                    }
                }
            }
        }
        reply
    }

    /// PolicyCheck followed by the draw request, or a direct commit when
    /// nothing has to be drawn.
    fn begin(&mut self, id: RequestId) -> WmResult<Begun> {
        self.state = TransitionState::PolicyCheck(id);
        let trigger = self.queue.current().ok_or(WMError::NoEntry)?.trigger().clone();
        let ctx = PolicyContext {
            layers: &self.layers,
            clients: &self.clients,
            current_area: &self.current_area,
        };
        let actions = match self.policy.plan(&ctx, &trigger)? {
            PolicyOutcome::NoChange => return Ok(Begun::NoChange),
            PolicyOutcome::Actions(actions) => actions,
        };
        debug!(actions = actions.len(), "Policy check done");

        let request = self.queue.current_mut().ok_or(WMError::NoEntry)?;
        if !request.plan(actions) {
            error!("Request was already planned");
            return Err(WMError::Fail);
        }
        self.start_transition(id)
    }

    fn start_transition(&mut self, id: RequestId) -> WmResult<Begun> {
        let request = self.queue.current().ok_or(WMError::NoEntry)?;
        let mut sync = Vec::new();
        for action in request.actions().iter().filter(|a| a.is_visible()) {
            let rect = self.layers.area_rect(&action.area).ok_or_else(|| {
                warn!(area = %action.area, "Area has no geometry");
                WMError::LayoutChangeFail
            })?;
            sync.push(WmEvent::SyncDraw {
                drawing_name: self.roles.label(&action.role).to_string(),
                drawing_area: action.area.clone(),
                drawing_rect: rect.into(),
            });
        }

        if sync.is_empty() {
            debug!("Nothing to draw, committing at once");
            self.commit(id)?;
            return Ok(Begun::Committed);
        }

        self.state = TransitionState::AwaitingDraw(id);
        for event in sync {
            self.emit(event);
        }
        self.timer.arm_after(id, self.timeout);
        Ok(Begun::AwaitingDraw)
    }

    /// Applies the current request to the compositor and the layout state,
    /// then removes it from the queue.
    fn commit(&mut self, id: RequestId) -> WmResult<()> {
        self.state = TransitionState::Committing(id);
        let actions = self.queue.current().ok_or(WMError::NoEntry)?.actions().to_vec();
        info!(actions = actions.len(), "Committing layout");

        let mut applied = Vec::with_capacity(actions.len());
        for action in actions {
            if self.clients.binding_of(action.surface) != Some((action.app_id.as_str(), action.role.as_str())) {
                debug!(app_id = %action.app_id, surface = action.surface, "Skipping action for departed surface");
                continue;
            }
            let label = self.roles.label(&action.role).to_string();
            let mapped = self.driver.surface_exists(action.surface);
            if !mapped {
                debug!(surface = action.surface, "Surface not created on the compositor yet, layout only");
            }
            if action.is_visible() {
                let rect = self.layers.area_rect(&action.area).ok_or(WMError::LayoutChangeFail)?;
                if mapped {
                    self.show_surface(action.surface, rect)?;
                }
                self.area_info.insert(action.surface, rect);
                self.emit(WmEvent::Visible { drawing_name: label.clone() });
                self.emit(WmEvent::Active { drawing_name: label });
            } else {
                if mapped {
                    self.driver.set_surface_visibility(action.surface, false)?;
                    self.driver.commit()?;
                }
                self.emit(WmEvent::Inactive { drawing_name: label.clone() });
                self.emit(WmEvent::Invisible { drawing_name: label });
            }
            applied.push(action);
        }

        self.apply_layout(&applied);

        let mut visible_apps: Vec<String> = Vec::new();
        for action in applied.iter().filter(|a| a.is_visible()) {
            self.emit(WmEvent::FlushDraw {
                drawing_name: self.roles.label(&action.role).to_string(),
            });
            if !visible_apps.contains(&action.app_id) {
                visible_apps.push(action.app_id.clone());
            }
        }
        if !visible_apps.is_empty() {
            self.emit(WmEvent::ScreenUpdated { ids: visible_apps });
        }

        self.finish(id);
        info!("Transition committed");
        Ok(())
    }

    fn show_surface(&mut self, surface: SurfaceId, rect: Rect) -> WmResult<()> {
        self.driver.set_surface_source_rect(surface, rect.at_origin())?;
        self.driver.set_surface_dest_rect(surface, rect)?;
        self.driver.set_surface_visibility(surface, true)?;
        self.driver.commit()?;
        Ok(())
    }

    fn apply_layout(&mut self, actions: &[WmAction]) {
        let mut touched: BTreeMap<LayerId, LayoutState> = BTreeMap::new();
        for action in actions {
            let state = touched
                .entry(action.layer)
                .or_insert_with(|| self.clients.layout(action.layer));
            state.vacate(action.surface);
            if action.is_visible() {
                if action.area == AREA_SPLIT_SUB {
                    state.sub = Some(action.surface);
                } else {
                    state.main = Some(action.surface);
                }
                self.current_area.insert(action.surface, action.area.clone());
            } else {
                self.current_area.remove(&action.surface);
            }
        }
        for (layer, state) in touched {
            debug!(layer, main = ?state.main, sub = ?state.sub, "Layout updated");
            self.clients.set_layout(layer, state);
        }
        if !self.clients.layouts_consistent() {
            error!("Layout state became inconsistent");
        }
    }

    fn abort(&mut self, id: RequestId, err: WMError) {
        self.timer.disarm();
        match self.finish(id) {
            Some(request) => {
                warn!(error = %err, app_id = %request.trigger().app_id, "Request aborted");
                self.emit(WmEvent::error(&request.trigger().app_id, err));
            }
            None => warn!(error = %err, "Aborted request was no longer current"),
        }
    }

    /// Pops `id` if it is still current and returns to `Idle`.
    fn finish(&mut self, id: RequestId) -> Option<WmRequest> {
        self.state = TransitionState::Idle;
        if self.queue.current_id() == Some(id) {
            self.queue.pop_current()
        } else {
            None
        }
    }

    fn emit(&self, event: WmEvent) {
        debug!(event = event.kind().as_str(), "Emitting event");
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
