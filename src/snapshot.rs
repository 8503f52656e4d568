//! Snapshot differencing.
//!
//! Fingerprints every element's serialized subtree and compares two
//! snapshots to find elements whose markup changed between capture
//! cycles. The comparison is one-directional: it walks the newer
//! snapshot, so removals surface later through identity-resolution
//! failures rather than here.

use crate::dom::{NodeId, PageHost};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Subtree fingerprint. A digest of the serialized markup, so a change
/// anywhere in the subtree changes the ancestor's fingerprint too.
pub type Fingerprint = [u8; 32];

/// One full-document snapshot: element → subtree fingerprint.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    fingerprints: HashMap<NodeId, Fingerprint>,
}

impl Snapshot {
    /// Fingerprint every attached element of the document. Overlay
    /// markers are invisible to enumeration, so redrawing them between
    /// cycles never registers as document change.
    pub fn capture<H: PageHost>(host: &H) -> Self {
        let mut fingerprints = HashMap::new();
        for node in host.elements() {
            fingerprints.insert(node, fingerprint(&host.outer_html(node)));
        }
        Self { fingerprints }
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Elements of `after` that are new or whose fingerprint differs
    /// from `before`. Elements only present in `before` are not
    /// reported.
    pub fn changed_since(&self, before: &Snapshot) -> Vec<NodeId> {
        let mut changed: Vec<NodeId> = self
            .fingerprints
            .iter()
            .filter(|(node, fp)| before.fingerprints.get(*node) != Some(*fp))
            .map(|(&node, _)| node)
            .collect();
        changed.sort_unstable();
        changed
    }
}

fn fingerprint(markup: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(markup.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;
    use crate::types::Geometry;

    fn page_with_list() -> (MemoryPage, NodeId, NodeId, NodeId) {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let body = page.add_element(page.root(), "body");
        let list = page.add_element(body, "ul");
        let item = page.add_element(list, "li");
        page.set_text(item, "first");
        (page, body, list, item)
    }

    #[test]
    fn test_unchanged_document_reports_nothing() {
        let (page, ..) = page_with_list();
        let before = Snapshot::capture(&page);
        let after = Snapshot::capture(&page);
        assert!(!before.is_empty());
        // One fingerprint per attached element: html, body, ul, li
        assert_eq!(before.len(), 4);
        assert!(after.changed_since(&before).is_empty());
    }

    #[test]
    fn test_text_change_marks_element_and_ancestors() {
        let (mut page, body, list, item) = page_with_list();
        let before = Snapshot::capture(&page);
        page.set_text(item, "second");
        let after = Snapshot::capture(&page);

        let changed = after.changed_since(&before);
        assert!(changed.contains(&item));
        assert!(changed.contains(&list));
        assert!(changed.contains(&body));
    }

    #[test]
    fn test_inserted_element_counts_as_changed() {
        let (mut page, _, list, _) = page_with_list();
        let before = Snapshot::capture(&page);
        let added = page.add_element(list, "li");
        page.set_text(added, "second");
        let after = Snapshot::capture(&page);

        assert!(after.changed_since(&before).contains(&added));
    }

    #[test]
    fn test_removed_element_is_not_reported() {
        let (mut page, _, _, item) = page_with_list();
        let before = Snapshot::capture(&page);
        page.detach(item);
        let after = Snapshot::capture(&page);

        let changed = after.changed_since(&before);
        assert!(!changed.contains(&item));
        // The list's own markup changed, so its ancestors still surface
        assert!(!changed.is_empty());
    }

    #[test]
    fn test_overlay_markers_do_not_disturb_fingerprints() {
        let (mut page, _, _, item) = page_with_list();
        let before = Snapshot::capture(&page);
        page.insert_marker(
            Geometry::new(0.0, 0.0, 10.0, 10.0),
            "hsl(137, 70%, 60%)",
            "we-1",
        );
        let after = Snapshot::capture(&page);

        assert_eq!(after.len(), before.len());
        assert!(after.changed_since(&before).is_empty());
        let _ = item;
    }
}
