//! Session-scoped element identity.
//!
//! Maps structural paths to stable ids. The table is append-only for the
//! lifetime of the page load: one path gets at most one id, ids are
//! allocated monotonically and never recycled, and an id stays valid as an
//! overlay key even after its element disappears.

use crate::dom::{NodeId, PageHost};
use crate::path;
use crate::types::ElementId;
use std::collections::HashMap;
use tracing::trace;

/// Append-only path→id registry for one capture session.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    ids: HashMap<String, ElementId>,
    next_id: u64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next_id: 1,
        }
    }

    /// Id for a path, allocating on first sight.
    pub fn id_for_path(&mut self, path: &str) -> ElementId {
        if let Some(&id) = self.ids.get(path) {
            return id;
        }
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.ids.insert(path.to_string(), id);
        trace!("Registered {} for path {}", id, path);
        id
    }

    /// Resolve a handle and return its id, or `None` when the handle has no
    /// usable path (detached node).
    pub fn id_for<H: PageHost>(&mut self, host: &H, node: NodeId) -> Option<ElementId> {
        let path = path::resolve(host, node);
        if path.is_empty() {
            return None;
        }
        Some(self.id_for_path(&path))
    }

    /// Non-allocating lookup.
    pub fn get(&self, path: &str) -> Option<ElementId> {
        self.ids.get(path).copied()
    }

    /// Whether a path has ever been registered this session.
    pub fn knows(&self, path: &str) -> bool {
        self.ids.contains_key(path)
    }

    /// Number of distinct structural positions observed so far.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;

    #[test]
    fn test_same_path_same_id() {
        let mut registry = IdentityRegistry::new();
        let a = registry.id_for_path("/body[1]/div[1]");
        let b = registry.id_for_path("/body[1]/div[1]");
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_paths_distinct_monotonic_ids() {
        let mut registry = IdentityRegistry::new();
        let a = registry.id_for_path("/body[1]/div[1]");
        let b = registry.id_for_path("/body[1]/div[2]");
        let c = registry.id_for_path("/body[1]/p[1]");
        assert_eq!(a, ElementId(1));
        assert_eq!(b, ElementId(2));
        assert_eq!(c, ElementId(3));
    }

    #[test]
    fn test_ids_survive_element_removal() {
        let mut page = MemoryPage::new("example.com", 600.0, 600.0);
        let body = page.add_element(page.root(), "body");
        let div = page.add_element(body, "div");

        let mut registry = IdentityRegistry::new();
        let id = registry.id_for(&page, div).unwrap();

        page.detach(div);
        // The registry still answers for the path; the id was not recycled
        assert_eq!(registry.get("/body[1]/div[1]"), Some(id));
        let next = registry.id_for_path("/body[1]/span[1]");
        assert_eq!(next, ElementId(id.0 + 1));
    }

    #[test]
    fn test_detached_handle_yields_no_id() {
        let mut page = MemoryPage::new("example.com", 600.0, 600.0);
        let body = page.add_element(page.root(), "body");
        let div = page.add_element(body, "div");
        page.detach(div);

        let mut registry = IdentityRegistry::new();
        assert_eq!(registry.id_for(&page, div), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_repeated_observation_is_idempotent() {
        let mut page = MemoryPage::new("example.com", 600.0, 600.0);
        let body = page.add_element(page.root(), "body");
        let div = page.add_element(body, "div");

        let mut registry = IdentityRegistry::new();
        let first = registry.id_for(&page, div).unwrap();
        for _ in 0..10 {
            assert_eq!(registry.id_for(&page, div), Some(first));
        }
        assert_eq!(registry.len(), 1);
    }
}
