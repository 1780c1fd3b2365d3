//! Surface layout transition manager for an IVI compositor.
//!
//! Applications ask for a surface under a role name and then ask for that
//! surface to be shown in a named screen area or hidden. Requests are queued
//! and handled one at a time: the layout policy decides what else must move,
//! affected clients are asked to redraw (`syncDraw`), and once all of them
//! call `end_draw` the new layout is committed to the compositor in one go.
//!
//! - [`layer_map`]: role to layer mapping and named screen areas.
//! - [`client_registry`]: clients, their surfaces and the per-layer layout.
//! - [`request_queue`]: FIFO of pending layout requests.
//! - [`transition`]: the state machine and the layout policy.
//! - [`timeout`]: draw deadline timer.
//! - [`service`]: the async [`WindowManagerService`] facade.
//! - [`dispatcher`]: JSON verb dispatch for transports.
//! - [`driver`]: the compositor boundary and an in-memory implementation.

pub use ivi_wm_core as core;

pub mod client_registry;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod events;
pub mod layer_map;
pub mod request_queue;
pub mod roles;
pub mod service;
pub mod timeout;
pub mod transition;
pub mod types;

pub use client_registry::ClientRegistry;
pub use dispatcher::{DispatchError, Dispatcher, Session};
pub use driver::{CompositorDriver, DisplayInfo, DriverError, HeadlessDriver};
pub use error::{describe, WMError, WmResult};
pub use events::{DrawingRect, EventKind, EventSubscription, WmEvent};
pub use layer_map::{LayerMap, LayerMapError};
pub use request_queue::{RequestHandle, RequestQueue};
pub use roles::RoleAliasTable;
pub use service::{DefaultWindowManager, WindowManagerService};
pub use timeout::TimeoutSupervisor;
pub use transition::{CoreInitError, CoreSettings, LayoutSnapshot, TransitionState, WindowManagerCore};
pub use types::{LayerId, RequestId, SurfaceId, Task, Visibility};
