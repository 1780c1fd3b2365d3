//! Async facade over [`WindowManagerCore`].
//!
//! Every entry point takes the same `tokio::sync::Mutex`, which is the
//! single serialization boundary for client calls, compositor callbacks
//! and timer expiries.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use ivi_wm_core::{Rect, ServiceConfig};

use crate::driver::{CompositorDriver, DisplayInfo};
use crate::error::WmResult;
use crate::events::{EventKind, EventSubscription, WmEvent};
use crate::request_queue::RequestHandle;
use crate::transition::{CoreInitError, LayoutSnapshot, WindowManagerCore};
use crate::types::{RequestId, SurfaceId, Task};

#[async_trait]
pub trait WindowManagerService: Send + Sync {
    async fn request_surface(&self, app_id: &str, drawing_name: &str) -> WmResult<SurfaceId>;
    async fn request_surface_xdg(&self, app_id: &str, drawing_name: &str, ivi_id: SurfaceId) -> WmResult<()>;
    async fn activate_window(&self, app_id: &str, drawing_name: &str, area: &str) -> WmResult<RequestHandle>;
    async fn deactivate_window(&self, app_id: &str, drawing_name: &str) -> WmResult<RequestHandle>;
    async fn end_draw(&self, app_id: &str, drawing_name: &str) -> WmResult<()>;
    async fn display_info(&self) -> WmResult<DisplayInfo>;
    async fn area_info(&self, drawing_name: &str) -> WmResult<Rect>;
    async fn drawing_names(&self) -> BTreeMap<String, SurfaceId>;
    async fn layout_snapshot(&self) -> LayoutSnapshot;
    async fn client_disconnected(&self, app_id: &str);
    async fn surface_created(&self, surface: SurfaceId) -> WmResult<()>;
    async fn surface_removed(&self, surface: SurfaceId) -> bool;
    fn subscribe(&self, kinds: Vec<EventKind>) -> EventSubscription;
}

pub struct DefaultWindowManager {
    internal: Arc<Mutex<WindowManagerCore>>,
    event_publisher: broadcast::Sender<WmEvent>,
    timeout_watcher: JoinHandle<()>,
}

impl DefaultWindowManager {
    /// Wraps `core` and starts forwarding its timer expiries.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(core: WindowManagerCore, expired: mpsc::UnboundedReceiver<RequestId>) -> Self {
        let event_publisher = core.event_sender();
        let internal = Arc::new(Mutex::new(core));
        let timeout_watcher = tokio::spawn(forward_timeouts(Arc::downgrade(&internal), expired));
        Self {
            internal,
            event_publisher,
            timeout_watcher,
        }
    }

    /// Loads the layout documents, creates the compositor layers and
    /// returns a ready service.
    pub async fn start(config: &ServiceConfig, driver: Box<dyn CompositorDriver>) -> Result<Self, CoreInitError> {
        let (mut core, expired) = WindowManagerCore::from_config(config, driver)?;
        core.init_layers().map_err(CoreInitError::LayerSetup)?;
        info!(layers = core.layers().layer_ids().len(), "Window manager started");
        Ok(Self::new(core, expired))
    }
}

impl Drop for DefaultWindowManager {
    fn drop(&mut self) {
        self.timeout_watcher.abort();
    }
}

async fn forward_timeouts(core: Weak<Mutex<WindowManagerCore>>, mut expired: mpsc::UnboundedReceiver<RequestId>) {
    while let Some(id) = expired.recv().await {
        let Some(core) = core.upgrade() else {
            break;
        };
        let aborted = core.lock().await.handle_timeout(id);
        debug!(req = id, aborted, "Timer expiry handled");
    }
    debug!("Timeout watcher finished");
}

#[async_trait]
impl WindowManagerService for DefaultWindowManager {
    async fn request_surface(&self, app_id: &str, drawing_name: &str) -> WmResult<SurfaceId> {
        self.internal.lock().await.request_surface(app_id, drawing_name)
    }

    async fn request_surface_xdg(&self, app_id: &str, drawing_name: &str, ivi_id: SurfaceId) -> WmResult<()> {
        self.internal.lock().await.request_surface_xdg(app_id, drawing_name, ivi_id)
    }

    async fn activate_window(&self, app_id: &str, drawing_name: &str, area: &str) -> WmResult<RequestHandle> {
        self.internal.lock().await.submit(app_id, drawing_name, area, Task::Allocate)
    }

    async fn deactivate_window(&self, app_id: &str, drawing_name: &str) -> WmResult<RequestHandle> {
        self.internal.lock().await.submit(app_id, drawing_name, "", Task::Release)
    }

    async fn end_draw(&self, app_id: &str, drawing_name: &str) -> WmResult<()> {
        self.internal.lock().await.mark_draw_finished(app_id, drawing_name)
    }

    async fn display_info(&self) -> WmResult<DisplayInfo> {
        self.internal.lock().await.display_info()
    }

    async fn area_info(&self, drawing_name: &str) -> WmResult<Rect> {
        self.internal.lock().await.area_info(drawing_name)
    }

    async fn drawing_names(&self) -> BTreeMap<String, SurfaceId> {
        self.internal.lock().await.drawing_names()
    }

    async fn layout_snapshot(&self) -> LayoutSnapshot {
        self.internal.lock().await.layout_snapshot()
    }

    async fn client_disconnected(&self, app_id: &str) {
        self.internal.lock().await.client_disconnected(app_id);
    }

    async fn surface_created(&self, surface: SurfaceId) -> WmResult<()> {
        self.internal.lock().await.surface_created(surface)
    }

    async fn surface_removed(&self, surface: SurfaceId) -> bool {
        self.internal.lock().await.surface_removed(surface)
    }

    fn subscribe(&self, kinds: Vec<EventKind>) -> EventSubscription {
        EventSubscription::new(self.event_publisher.subscribe(), kinds)
    }
}
