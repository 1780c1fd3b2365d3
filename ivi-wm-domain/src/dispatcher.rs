//! Verb dispatcher for the client-facing API.
//!
//! A transport (bus binding, socket, test harness) hands each call to
//! [`Dispatcher::dispatch`] together with the caller's [`Session`]. Arguments
//! and replies are JSON objects using the historical key names.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::WMError;
use crate::events::{DrawingRect, EventKind, EventSubscription};
use crate::service::WindowManagerService;
use crate::types::SurfaceId;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown verb '{0}'")]
    UnknownVerb(String),
    #[error("Invalid arguments for '{verb}': {source}")]
    InvalidArguments {
        verb: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
    #[error(transparent)]
    Wm(#[from] WMError),
}

impl DispatchError {
    /// Code placed in the failure reply.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::Wm(e) => e.code(),
            _ => "FAIL",
        }
    }
}

/// Per-connection state: who is calling and which events they asked for.
#[derive(Debug)]
pub struct Session {
    app_id: String,
    events: Option<EventSubscription>,
}

impl Session {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            events: None,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The session's event stream, present after the first `wm_subscribe`.
    pub fn events(&mut self) -> Option<&mut EventSubscription> {
        self.events.as_mut()
    }
}

#[derive(Debug, Deserialize)]
struct DrawingNameArgs {
    drawing_name: String,
}

#[derive(Debug, Deserialize)]
struct ActivateArgs {
    drawing_name: String,
    drawing_area: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IviIdArg {
    Number(SurfaceId),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct XdgArgs {
    drawing_name: String,
    ivi_id: IviIdArg,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventArg {
    Index(usize),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct SubscribeArgs {
    event: EventArg,
}

fn parse<T: for<'de> Deserialize<'de>>(verb: &str, args: Value) -> Result<T, DispatchError> {
    serde_json::from_value(args).map_err(|source| DispatchError::InvalidArguments {
        verb: verb.to_string(),
        source,
    })
}

impl EventArg {
    fn resolve(self) -> Result<EventKind, DispatchError> {
        match self {
            EventArg::Index(i) => EventKind::ALL.get(i).copied().ok_or_else(|| DispatchError::UnknownEvent(i.to_string())),
            EventArg::Name(name) => name.parse().map_err(|_| DispatchError::UnknownEvent(name)),
        }
    }
}

impl IviIdArg {
    fn resolve(self) -> Result<SurfaceId, DispatchError> {
        match self {
            IviIdArg::Number(id) => Ok(id),
            IviIdArg::Text(text) => text.trim().parse().map_err(|_| DispatchError::Wm(WMError::Fail)),
        }
    }
}

pub struct Dispatcher<S: WindowManagerService + ?Sized> {
    service: Arc<S>,
}

impl<S: WindowManagerService + ?Sized> Dispatcher<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Runs one verb on behalf of `session`.
    pub async fn dispatch(&self, session: &mut Session, verb: &str, args: Value) -> Result<Value, DispatchError> {
        debug!(app_id = %session.app_id, verb, "Dispatching");
        let app_id = session.app_id.as_str();
        let reply = match verb {
            "requestsurface" => {
                let a: DrawingNameArgs = parse(verb, args)?;
                let id = self.service.request_surface(app_id, &a.drawing_name).await?;
                json!(id)
            }
            "requestsurfacexdg" => {
                let a: XdgArgs = parse(verb, args)?;
                let ivi_id = a.ivi_id.resolve()?;
                self.service.request_surface_xdg(app_id, &a.drawing_name, ivi_id).await?;
                Value::Null
            }
            "activatewindow" => {
                let a: ActivateArgs = parse(verb, args)?;
                let handle = self.service.activate_window(app_id, &a.drawing_name, &a.drawing_area).await?;
                json!(handle)
            }
            "deactivatewindow" => {
                let a: DrawingNameArgs = parse(verb, args)?;
                let handle = self.service.deactivate_window(app_id, &a.drawing_name).await?;
                json!(handle)
            }
            "enddraw" => {
                let a: DrawingNameArgs = parse(verb, args)?;
                self.service.end_draw(app_id, &a.drawing_name).await?;
                Value::Null
            }
            "getdisplayinfo" => json!(self.service.display_info().await?),
            "getareainfo" => {
                let a: DrawingNameArgs = parse(verb, args)?;
                let rect = self.service.area_info(&a.drawing_name).await?;
                json!(DrawingRect::from(rect))
            }
            "wm_subscribe" => {
                let a: SubscribeArgs = parse(verb, args)?;
                let kind = a.event.resolve()?;
                match session.events.as_mut() {
                    Some(sub) => sub.add(kind),
                    None => session.events = Some(self.service.subscribe(vec![kind])),
                }
                Value::Null
            }
            "list_drawing_names" => json!(self.service.drawing_names().await),
            "debug_layers" => json!(self.service.layout_snapshot().await),
            "ping" => json!({ "status": "pong" }),
            other => {
                warn!(app_id = %session.app_id, verb = other, "Unknown verb");
                return Err(DispatchError::UnknownVerb(other.to_string()));
            }
        };
        Ok(reply)
    }

    /// Tears down everything `session` owned.
    pub async fn close(&self, session: Session) {
        debug!(app_id = %session.app_id, "Session closed");
        self.service.client_disconnected(&session.app_id).await;
    }
}
