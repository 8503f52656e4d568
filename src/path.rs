//! Structural path resolution.
//!
//! Computes a root-relative address for a live element, preferring the
//! nearest ancestor carrying the globally unique attribute as an anchor and
//! falling back to 1-based ordinals among same-tag element siblings. The
//! path is the key the identity registry de-duplicates on, so two handles
//! with identical ancestry up to an anchored ancestor must render the same
//! string.

use crate::dom::{NodeId, PageHost};

/// Resolve a handle to its structural path.
///
/// Returns an empty string for a detached handle or for the document root;
/// callers must treat an empty path as unresolvable and skip the element.
pub fn resolve<H: PageHost>(host: &H, node: NodeId) -> String {
    if !host.is_attached(node) {
        return String::new();
    }

    let mut segments: Vec<String> = Vec::new();
    let mut current = node;

    loop {
        // The document root is never part of a path and never an anchor.
        let Some(parent) = host.parent(current) else {
            break;
        };

        if let Some(id) = host.global_id(current) {
            segments.reverse();
            return format!("//*[@id=\"{}\"]{}", id, segments.join(""));
        }

        let tag = host.tag(current);
        let mut ordinal = 1;
        for sibling in host.children(parent) {
            if sibling == current {
                break;
            }
            if host.tag(sibling) == tag {
                ordinal += 1;
            }
        }
        segments.push(format!("/{tag}[{ordinal}]"));
        current = parent;
    }

    segments.reverse();
    segments.concat()
}
