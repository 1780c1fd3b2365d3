use serde::Serialize;

use crate::types::{LayerId, RequestId, SurfaceId, Task, Visibility};

/// What a client asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WmTrigger {
    pub app_id: String,
    /// Canonical role.
    pub role: String,
    pub area: String,
    pub task: Task,
}

/// One per-surface step of a transition, computed by the layout policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WmAction {
    pub app_id: String,
    pub role: String,
    pub surface: SurfaceId,
    pub layer: LayerId,
    pub area: String,
    pub visibility: Visibility,
    /// Set once the client acknowledged drawing; invisible actions start finished.
    pub draw_finished: bool,
}

impl WmAction {
    pub fn new(
        app_id: &str,
        role: &str,
        surface: SurfaceId,
        layer: LayerId,
        area: &str,
        visibility: Visibility,
    ) -> Self {
        Self {
            app_id: app_id.to_string(),
            role: role.to_string(),
            surface,
            layer,
            area: area.to_string(),
            visibility,
            draw_finished: !visibility.is_visible(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    pub fn awaits_draw(&self) -> bool {
        self.is_visible() && !self.draw_finished
    }
}

/// A queued transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WmRequest {
    id: RequestId,
    trigger: WmTrigger,
    actions: Vec<WmAction>,
    planned: bool,
}

impl WmRequest {
    pub(crate) fn new(id: RequestId, trigger: WmTrigger) -> Self {
        Self {
            id,
            trigger,
            actions: Vec::new(),
            planned: false,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn trigger(&self) -> &WmTrigger {
        &self.trigger
    }

    pub fn actions(&self) -> &[WmAction] {
        &self.actions
    }

    /// Installs the policy result. The action list is fixed afterwards.
    pub(crate) fn plan(&mut self, actions: Vec<WmAction>) -> bool {
        if self.planned {
            return false;
        }
        self.actions = actions;
        self.planned = true;
        true
    }

    /// Marks every drawing action of (app, role) finished. Returns how many
    /// actions changed.
    pub(crate) fn mark_draw_finished(&mut self, app_id: &str, role: &str) -> usize {
        let mut marked = 0;
        for action in self.actions.iter_mut() {
            if action.awaits_draw() && action.app_id == app_id && action.role == role {
                action.draw_finished = true;
                marked += 1;
            }
        }
        marked
    }

    /// True once no visible action waits for a draw acknowledgement.
    pub fn draw_complete(&self) -> bool {
        self.actions.iter().all(|a| a.draw_finished)
    }
}

/// Returned to the submitter of an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestHandle {
    pub id: RequestId,
    /// Requests ahead of this one when it was queued; 0 means it ran at once.
    pub queued_behind: usize,
}
