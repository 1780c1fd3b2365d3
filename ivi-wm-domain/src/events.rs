//! Lifecycle events published to window manager clients.
//!
//! Events are broadcast on a `tokio::sync::broadcast` channel. Clients that
//! only care about some event names wrap their receiver in an
//! [`EventSubscription`].

use std::collections::HashSet;
use std::str::FromStr;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use ivi_wm_core::Rect;

use crate::error::WMError;

/// Rectangle as carried in `syncDraw` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrawingRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<Rect> for DrawingRect {
    fn from(r: Rect) -> Self {
        Self { x: r.x, y: r.y, width: r.w, height: r.h }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum WmEvent {
    Active {
        drawing_name: String,
    },
    Inactive {
        drawing_name: String,
    },
    Visible {
        drawing_name: String,
    },
    Invisible {
        drawing_name: String,
    },
    /// Client should render for the new geometry, then call `end_draw`.
    SyncDraw {
        drawing_name: String,
        drawing_area: String,
        drawing_rect: DrawingRect,
    },
    /// The new layout is on screen.
    FlushDraw {
        drawing_name: String,
    },
    ScreenUpdated {
        ids: Vec<String>,
    },
    /// A request of `app_id` was aborted.
    Error {
        app_id: String,
        error: String,
        description: String,
    },
}

impl WmEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WmEvent::Active { .. } => EventKind::Active,
            WmEvent::Inactive { .. } => EventKind::Inactive,
            WmEvent::Visible { .. } => EventKind::Visible,
            WmEvent::Invisible { .. } => EventKind::Invisible,
            WmEvent::SyncDraw { .. } => EventKind::SyncDraw,
            WmEvent::FlushDraw { .. } => EventKind::FlushDraw,
            WmEvent::ScreenUpdated { .. } => EventKind::ScreenUpdated,
            WmEvent::Error { .. } => EventKind::Error,
        }
    }

    pub(crate) fn error(app_id: &str, err: WMError) -> Self {
        WmEvent::Error {
            app_id: app_id.to_string(),
            error: err.code().to_string(),
            description: err.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Active,
    Inactive,
    Visible,
    Invisible,
    SyncDraw,
    FlushDraw,
    ScreenUpdated,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Active,
        EventKind::Inactive,
        EventKind::Visible,
        EventKind::Invisible,
        EventKind::SyncDraw,
        EventKind::FlushDraw,
        EventKind::ScreenUpdated,
        EventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Active => "active",
            EventKind::Inactive => "inactive",
            EventKind::Visible => "visible",
            EventKind::Invisible => "invisible",
            EventKind::SyncDraw => "syncDraw",
            EventKind::FlushDraw => "flushDraw",
            EventKind::ScreenUpdated => "screenUpdated",
            EventKind::Error => "error",
        }
    }
}

impl FromStr for EventKind {
    type Err = WMError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
            .ok_or(WMError::NotRegistered)
    }
}

/// A broadcast receiver filtered to a set of event kinds.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: broadcast::Receiver<WmEvent>,
    kinds: HashSet<EventKind>,
}

impl EventSubscription {
    pub fn new(receiver: broadcast::Receiver<WmEvent>, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            receiver,
            kinds: kinds.into_iter().collect(),
        }
    }

    pub fn add(&mut self, kind: EventKind) {
        self.kinds.insert(kind);
    }

    pub fn wants(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Next event of a subscribed kind. Lagging surfaces as `RecvError::Lagged`.
    pub async fn recv(&mut self) -> Result<WmEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(event.kind()) {
                return Ok(event);
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<WmEvent, TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.wants(event.kind()) {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sync_draw_wire_format() {
        let event = WmEvent::SyncDraw {
            drawing_name: "Navigation".into(),
            drawing_area: "normal.full".into(),
            drawing_rect: Rect::new(0, 218, 1080, 1488).into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "syncDraw",
                "drawing_name": "Navigation",
                "drawing_area": "normal.full",
                "drawing_rect": { "x": 0, "y": 218, "width": 1080, "height": 1488 }
            })
        );
    }

    #[test]
    fn event_names_round_trip_through_kind() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        assert_eq!("syncdraw".parse::<EventKind>(), Err(WMError::NotRegistered));
        let updated = WmEvent::ScreenUpdated { ids: vec!["app.nav".into()] };
        assert_eq!(serde_json::to_value(&updated).unwrap()["event"], updated.kind().as_str());
    }

    #[tokio::test]
    async fn subscription_filters_kinds() {
        let (tx, rx) = broadcast::channel(8);
        let mut sub = EventSubscription::new(rx, [EventKind::FlushDraw]);
        tx.send(WmEvent::Active { drawing_name: "map".into() }).unwrap();
        tx.send(WmEvent::FlushDraw { drawing_name: "map".into() }).unwrap();
        assert_eq!(sub.recv().await.unwrap(), WmEvent::FlushDraw { drawing_name: "map".into() });
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));

        sub.add(EventKind::Error);
        tx.send(WmEvent::error("app.nav", WMError::TimeoutExpired)).unwrap();
        match sub.try_recv().unwrap() {
            WmEvent::Error { error, .. } => assert_eq!(error, "TIMEOUT_EXPIRED"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
