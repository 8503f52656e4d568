//! Relevance filtering.
//!
//! Decides which elements are worth capturing. Two policies coexist:
//! leaf-only capture keeps fine-grained rendering leaves for passive
//! background extraction, while salient-region capture keeps coarser
//! human-meaningful regions for the scroll-driven loop, using an
//! occlusion-aware area check and a containment-resolution pass.

use crate::dom::{NodeId, PageHost};
use crate::types::{Geometry, StyleInfo};
use std::collections::HashSet;

/// Relevance policy selected by the caller per capture cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Visible elements with no visible children.
    LeafOnly,
    /// Interactive/textual/media regions above a minimum visible area.
    SalientRegion,
}

/// Tags that never contribute readable text.
const NO_RENDER_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Configured relevance filter.
pub struct RelevanceFilter {
    /// Minimum visible area for salient-region mode, in px².
    min_area: f64,
    /// Interactive/media/text-container allow-list.
    salient_tags: HashSet<&'static str>,
}

impl RelevanceFilter {
    pub fn new(min_area: f64) -> Self {
        let salient_tags: HashSet<&'static str> = [
            "button", "a", "img", "picture", "input", "textarea", "select", "video", "svg",
            "canvas", "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "div", "map", "area",
        ]
        .into_iter()
        .collect();

        Self {
            min_area,
            salient_tags,
        }
    }

    /// An element is visible iff its rendered box has positive extent and
    /// its effective style does not hide it.
    pub fn is_visible<H: PageHost>(&self, host: &H, node: NodeId) -> bool {
        let rect = host.bounding_rect(node);
        rect.width > 0.0 && rect.height > 0.0 && !host.computed_style(node).is_hidden()
    }

    /// A true rendering leaf: visible itself, with no visible child.
    pub fn is_leaf_of_interest<H: PageHost>(&self, host: &H, node: NodeId) -> bool {
        self.is_visible(host, node)
            && !host
                .children(node)
                .iter()
                .any(|&child| self.is_visible(host, child))
    }

    /// Rendered area summed over fragments that are actually topmost at
    /// their own center point, excluding fully occluded fragments.
    pub fn visible_area<H: PageHost>(&self, host: &H, node: NodeId) -> f64 {
        host.client_rects(node)
            .iter()
            .filter(|rect| {
                let (cx, cy) = rect.center();
                match host.topmost_at(cx, cy) {
                    Some(at_center) => at_center == node || host.contains(node, at_center),
                    None => false,
                }
            })
            .map(Geometry::area)
            .sum()
    }

    fn is_salient<H: PageHost>(&self, host: &H, node: NodeId) -> bool {
        self.salient_tags.contains(host.tag(node).as_str())
            || host.has_click_handler(node)
            || host.attr(node, "tabindex").is_some()
            || host.computed_style(node).cursor == "pointer"
            || !host.descendant_text(node).is_empty()
    }

    /// Whether the element qualifies under the given policy.
    pub fn is_capturable<H: PageHost>(&self, host: &H, node: NodeId, mode: CaptureMode) -> bool {
        match mode {
            CaptureMode::LeafOnly => self.is_leaf_of_interest(host, node),
            CaptureMode::SalientRegion => {
                self.is_salient(host, node) && self.visible_area(host, node) >= self.min_area
            }
        }
    }

    /// Drop qualifying elements that strictly contain another qualifying
    /// element, unless the ancestor is a paragraph. Idempotent.
    pub fn resolve_containment<H: PageHost>(&self, host: &H, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes
            .iter()
            .copied()
            .filter(|&x| {
                host.tag(x) == "p"
                    || !nodes
                        .iter()
                        .any(|&y| y != x && host.contains(x, y))
            })
            .collect()
    }
}

/// Extract the meaningful text of an element.
///
/// Form controls report their placeholder, buttons and links their rendered
/// label, explicitly labelled elements their accessible name; no-render tags
/// report nothing; everything else concatenates its direct text children.
pub fn element_text<H: PageHost>(host: &H, node: NodeId) -> String {
    let tag = host.tag(node);

    if tag == "input" || tag == "textarea" {
        return host
            .attr(node, "placeholder")
            .map(|p| p.trim().to_string())
            .unwrap_or_default();
    }
    if tag == "button" || tag == "a" {
        return host.descendant_text(node).trim().to_string();
    }
    if let Some(label) = host.attr(node, "aria-label") {
        return label.trim().to_string();
    }
    if NO_RENDER_TAGS.contains(&tag.as_str()) {
        return String::new();
    }

    let mut text = String::new();
    for chunk in host.text_chunks(node) {
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            text.push_str(chunk);
            text.push(' ');
        }
    }
    text.trim().to_string()
}

/// Capture the element's presentation style.
pub fn capture_style<H: PageHost>(host: &H, node: NodeId) -> StyleInfo {
    let style = host.computed_style(node);
    StyleInfo {
        background_color: style.background_color,
        font_color: style.color,
        font_size: style.font_size,
        font_style: style.font_style,
    }
}

/// Rendered-box position in page-absolute coordinates.
pub fn page_geometry<H: PageHost>(host: &H, node: NodeId) -> Geometry {
    let rect = host.bounding_rect(node);
    Geometry::new(rect.x, rect.y + host.scroll_y(), rect.width, rect.height)
}
