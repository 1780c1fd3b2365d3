use std::collections::HashMap;

use tracing::debug;

use crate::error::{WMError, WmResult};
use crate::types::SurfaceId;

/// Bidirectional role ↔ surface id table.
///
/// Generated ids start at 1 and skip ids that were registered externally.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: SurfaceId,
    by_role: HashMap<String, SurfaceId>,
    by_id: HashMap<SurfaceId, String>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next: 1,
            by_role: HashMap::new(),
            by_id: HashMap::new(),
        }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh id for `role`. A role holds at most one id.
    pub fn generate(&mut self, role: &str) -> WmResult<SurfaceId> {
        if self.by_role.contains_key(role) {
            debug!(role, "Surface already present");
            return Err(WMError::ReqRejected);
        }
        let mut id = self.next;
        while id == 0 || self.by_id.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next = id.wrapping_add(1);
        self.insert(role, id);
        Ok(id)
    }

    /// Binds a client-chosen id to `role`.
    pub fn register(&mut self, role: &str, id: SurfaceId) -> WmResult<()> {
        if self.by_role.contains_key(role) || self.by_id.contains_key(&id) {
            debug!(role, id, "Surface already present");
            return Err(WMError::ReqRejected);
        }
        self.insert(role, id);
        Ok(())
    }

    fn insert(&mut self, role: &str, id: SurfaceId) {
        self.by_role.insert(role.to_string(), id);
        self.by_id.insert(id, role.to_string());
    }

    pub fn lookup_id(&self, role: &str) -> Option<SurfaceId> {
        self.by_role.get(role).copied()
    }

    pub fn lookup_role(&self, id: SurfaceId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn remove_id(&mut self, id: SurfaceId) -> Option<String> {
        let role = self.by_id.remove(&id)?;
        self.by_role.remove(&role);
        Some(role)
    }

    /// All (role, id) pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SurfaceId)> {
        self.by_role.iter().map(|(role, id)| (role.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
