//! Ordered queue of transition requests with a single current request.
//!
//! The front of the queue is always the request being executed. An app may
//! have at most one request waiting behind the current one.

pub mod types;

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{WMError, WmResult};
use crate::types::RequestId;
pub use types::{RequestHandle, WmAction, WmRequest, WmTrigger};

#[derive(Debug)]
pub struct RequestQueue {
    requests: VecDeque<WmRequest>,
    next_id: RequestId,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self {
            requests: VecDeque::new(),
            next_id: 1,
        }
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a request. Fails with `ReqRejected` if the app already has a
    /// request waiting behind the current one.
    pub fn push(&mut self, trigger: WmTrigger) -> WmResult<RequestHandle> {
        if self.has_pending_for(&trigger.app_id) {
            debug!(app_id = %trigger.app_id, "Request already pending for app");
            return Err(WMError::ReqRejected);
        }
        let id = self.allocate_id();
        let queued_behind = self.requests.len();
        self.requests.push_back(WmRequest::new(id, trigger));
        Ok(RequestHandle { id, queued_behind })
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_id;
        self.next_id = match self.next_id.wrapping_add(1) {
            0 => 1,
            n => n,
        };
        id
    }

    pub fn current(&self) -> Option<&WmRequest> {
        self.requests.front()
    }

    pub(crate) fn current_mut(&mut self) -> Option<&mut WmRequest> {
        self.requests.front_mut()
    }

    pub fn current_id(&self) -> Option<RequestId> {
        self.current().map(WmRequest::id)
    }

    /// Removes the current request; the next one (if any) becomes current.
    pub fn pop_current(&mut self) -> Option<WmRequest> {
        self.requests.pop_front()
    }

    /// Whether `app_id` has a request queued behind the current one.
    pub fn has_pending_for(&self, app_id: &str) -> bool {
        self.requests.iter().skip(1).any(|r| r.trigger().app_id == app_id)
    }

    /// Drops non-current requests from `app_id`, returning how many were dropped.
    pub fn remove_pending_for(&mut self, app_id: &str) -> usize {
        let before = self.requests.len();
        let mut index = 0;
        self.requests.retain(|r| {
            let keep = index == 0 || r.trigger().app_id != app_id;
            index += 1;
            keep
        });
        before - self.requests.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WmRequest> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Task, Visibility};

    fn trigger(app_id: &str, role: &str) -> WmTrigger {
        WmTrigger {
            app_id: app_id.to_string(),
            role: role.to_string(),
            area: "normal.full".to_string(),
            task: Task::Allocate,
        }
    }

    #[test]
    fn numbers_requests_from_one() {
        let mut queue = RequestQueue::new();
        let first = queue.push(trigger("a", "map")).unwrap();
        let second = queue.push(trigger("b", "music")).unwrap();
        assert_eq!((first.id, first.queued_behind), (1, 0));
        assert_eq!((second.id, second.queued_behind), (2, 1));
        assert_eq!(queue.current_id(), Some(1));
    }

    #[test]
    fn rejects_second_pending_request_for_app() {
        let mut queue = RequestQueue::new();
        queue.push(trigger("a", "map")).unwrap();
        // the current request does not count as pending
        queue.push(trigger("a", "map")).unwrap();
        assert_eq!(queue.push(trigger("a", "video")), Err(WMError::ReqRejected));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn pop_advances_current() {
        let mut queue = RequestQueue::new();
        queue.push(trigger("a", "map")).unwrap();
        queue.push(trigger("b", "music")).unwrap();
        assert_eq!(queue.pop_current().map(|r| r.id()), Some(1));
        assert_eq!(queue.current_id(), Some(2));
        queue.pop_current();
        assert!(queue.is_empty());
        assert_eq!(queue.current_id(), None);
    }

    #[test]
    fn ids_wrap_without_zero() {
        let mut queue = RequestQueue::new();
        queue.next_id = u32::MAX;
        assert_eq!(queue.push(trigger("a", "map")).unwrap().id, u32::MAX);
        assert_eq!(queue.push(trigger("b", "map")).unwrap().id, 1);
    }

    #[test]
    fn remove_pending_keeps_current() {
        let mut queue = RequestQueue::new();
        queue.push(trigger("a", "map")).unwrap();
        queue.push(trigger("b", "music")).unwrap();
        queue.push(trigger("a", "map")).unwrap();
        assert_eq!(queue.remove_pending_for("a"), 1);
        assert_eq!(queue.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn draw_acknowledgements_complete_request() {
        let mut request = WmRequest::new(1, trigger("a", "map"));
        assert!(request.plan(vec![
            WmAction::new("b", "music", 2, 1001, "", Visibility::Invisible),
            WmAction::new("a", "map", 1, 1001, "normal.full", Visibility::Visible),
        ]));
        assert!(!request.plan(Vec::new()));
        assert!(!request.draw_complete());
        assert_eq!(request.mark_draw_finished("a", "music"), 0);
        assert_eq!(request.mark_draw_finished("a", "map"), 1);
        assert!(request.draw_complete());
        assert_eq!(request.mark_draw_finished("a", "map"), 0);
    }
}
