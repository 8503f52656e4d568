//! The host-tree seam.
//!
//! The capture pipeline never owns the rendered page; it talks to the host
//! rendering engine through the [`PageHost`] trait: element enumeration,
//! geometry, computed style, hit testing, scrolling, and the overlay node
//! surface. [`MemoryPage`] is the in-process implementation used by the
//! fixture binary and the test suite.

pub mod memory;

pub use memory::MemoryPage;

use crate::types::Geometry;
use serde::{Deserialize, Serialize};

/// Opaque reference to a node in the live document.
///
/// Equality is reference identity for the current page load; handles are
/// never serialized.
pub type NodeId = u64;

/// The slice of computed style the pipeline inspects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub cursor: String,
    pub background_color: String,
    pub color: String,
    pub font_size: String,
    pub font_style: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
            cursor: "auto".to_string(),
            background_color: "transparent".to_string(),
            color: "inherit".to_string(),
            font_size: "inherit".to_string(),
            font_style: "normal".to_string(),
        }
    }
}

impl ComputedStyle {
    /// True when the style alone hides the element, regardless of geometry.
    pub fn is_hidden(&self) -> bool {
        self.display == "none" || self.visibility == "hidden" || self.opacity == 0.0
    }
}

/// Host rendering engine surface.
///
/// All rects are viewport-relative (the host's `getBoundingClientRect`
/// convention); callers add the scroll offset when they need page-absolute
/// coordinates.
pub trait PageHost {
    /// Every element currently in the tree, in document order. Detached
    /// nodes and overlay markers are not enumerated.
    fn elements(&self) -> Vec<NodeId>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Element children only; text nodes are reached via [`text_chunks`].
    ///
    /// [`text_chunks`]: PageHost::text_chunks
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lower-case tag name.
    fn tag(&self, node: NodeId) -> String;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    /// The globally unique attribute, when the element carries one.
    fn global_id(&self, node: NodeId) -> Option<String>;

    /// Direct text-node children, in order, untrimmed.
    fn text_chunks(&self, node: NodeId) -> Vec<String>;

    /// Concatenated text of the whole subtree (the `textContent` analogue).
    fn descendant_text(&self, node: NodeId) -> String;

    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    /// Rendered box fragments, viewport-relative.
    fn client_rects(&self, node: NodeId) -> Vec<Geometry>;

    /// Union of the rendered box, viewport-relative.
    fn bounding_rect(&self, node: NodeId) -> Geometry;

    /// The element painted topmost at a viewport point, excluding overlay
    /// markers.
    fn topmost_at(&self, x: f64, y: f64) -> Option<NodeId>;

    /// Whether `ancestor` contains `node` (inclusive).
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Whether the handle still reaches the document root.
    fn is_attached(&self, node: NodeId) -> bool;

    fn has_click_handler(&self, node: NodeId) -> bool;

    /// Serialized subtree markup (tag, attributes, descendants) used for
    /// fingerprinting.
    fn outer_html(&self, node: NodeId) -> String;

    fn scroll_y(&self) -> f64;

    fn viewport_height(&self) -> f64;

    fn document_height(&self) -> f64;

    /// Scroll to an absolute offset, clamped to the scrollable range.
    fn scroll_to(&mut self, y: f64);

    fn scroll_by(&mut self, dy: f64) {
        self.scroll_to(self.scroll_y() + dy);
    }

    /// Insert an overlay marker node. Markers are excluded from
    /// [`elements`], snapshots, and hit testing.
    ///
    /// [`elements`]: PageHost::elements
    fn insert_marker(&mut self, rect: Geometry, color: &str, label: &str) -> NodeId;

    fn update_marker(&mut self, marker: NodeId, rect: Geometry, color: &str, label: &str);

    fn remove_marker(&mut self, marker: NodeId);

    /// Whether a node belongs to an overlay-injected subtree.
    fn is_overlay(&self, node: NodeId) -> bool;
}
