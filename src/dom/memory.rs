//! In-memory page backing the [`PageHost`] seam.
//!
//! Models a rendered document as an arena tree with page-absolute rects and
//! a scrollable viewport. Mutation helpers let tests and the fixture binary
//! simulate lazy loading, in-place change, and detachment between capture
//! cycles. Serde-loadable so a page description can be replayed from disk.

use super::{ComputedStyle, NodeId, PageHost};
use crate::types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeData {
    tag: String,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
    #[serde(default)]
    parent: Option<NodeId>,
    #[serde(default)]
    children: Vec<NodeId>,
    #[serde(default)]
    text: Vec<String>,
    #[serde(default)]
    style: ComputedStyle,
    /// Page-absolute rendered box.
    #[serde(default)]
    rect: Geometry,
    #[serde(default = "default_attached")]
    attached: bool,
    #[serde(default)]
    overlay: bool,
    #[serde(default)]
    click_handler: bool,
}

fn default_attached() -> bool {
    true
}

/// A simulated rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPage {
    nodes: Vec<NodeData>,
    root: NodeId,
    viewport_height: f64,
    document_height: f64,
    #[serde(default)]
    scroll_y: f64,
    #[serde(default)]
    website: String,
}

impl MemoryPage {
    /// Create a page with a bare document root.
    pub fn new(website: &str, viewport_height: f64, document_height: f64) -> Self {
        let root = NodeData {
            tag: "html".to_string(),
            attrs: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            text: Vec::new(),
            style: ComputedStyle::default(),
            rect: Geometry::new(0.0, 0.0, 1000.0, document_height),
            attached: true,
            overlay: false,
            click_handler: false,
        };
        Self {
            nodes: vec![root],
            root: 0,
            viewport_height,
            document_height,
            scroll_y: 0.0,
            website: website.to_string(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn website(&self) -> &str {
        &self.website
    }

    /// Append an element under `parent`, returning its handle.
    pub fn add_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let attached = self.node(parent).attached;
        self.nodes.push(NodeData {
            tag: tag.to_lowercase(),
            attrs: BTreeMap::new(),
            parent: Some(parent),
            children: Vec::new(),
            text: Vec::new(),
            style: ComputedStyle::default(),
            rect: Geometry::default(),
            attached,
            overlay: false,
            click_handler: false,
        });
        self.node_mut(parent).children.push(id);
        id
    }

    /// Append an element with a page-absolute rect in one step.
    pub fn add_element_with_rect(&mut self, parent: NodeId, tag: &str, rect: Geometry) -> NodeId {
        let id = self.add_element(parent, tag);
        self.set_rect(id, rect);
        id
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Geometry) {
        self.node_mut(node).rect = rect;
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node)
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn style_mut(&mut self, node: NodeId) -> &mut ComputedStyle {
        &mut self.node_mut(node).style
    }

    /// Replace the element's direct text with a single chunk.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).text = vec![text.to_string()];
    }

    pub fn push_text(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).text.push(text.to_string());
    }

    pub fn set_click_handler(&mut self, node: NodeId, has_handler: bool) {
        self.node_mut(node).click_handler = has_handler;
    }

    /// Detach a subtree from the document. Handles stay valid but the nodes
    /// disappear from enumeration and resolve to empty paths.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).children.retain(|&c| c != node);
        }
        self.node_mut(node).parent = None;
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            self.node_mut(n).attached = false;
            stack.extend(self.node(n).children.clone());
        }
    }

    /// Attached overlay marker nodes, in insertion order.
    pub fn markers(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.overlay && node.attached)
            .map(|(i, _)| i as NodeId)
            .collect()
    }

    /// Overlay marker nodes currently attached.
    pub fn marker_count(&self) -> usize {
        self.markers().len()
    }

    /// Grow or shrink the scrollable document (lazy-load simulation).
    pub fn set_document_height(&mut self, height: f64) {
        self.document_height = height;
        self.node_mut(self.root).rect.height = height;
        let max = (self.document_height - self.viewport_height).max(0.0);
        if self.scroll_y > max {
            self.scroll_y = max;
        }
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id as usize]
    }

    fn dfs(&self, from: NodeId, out: &mut Vec<NodeId>) {
        let data = self.node(from);
        if !data.attached || data.overlay {
            return;
        }
        out.push(from);
        for &child in &data.children {
            self.dfs(child, out);
        }
    }

    fn serialize_node(&self, node: NodeId, out: &mut String) {
        let data = self.node(node);
        out.push('<');
        out.push_str(&data.tag);
        for (k, v) in &data.attrs {
            out.push_str(&format!(" {k}=\"{v}\""));
        }
        out.push('>');
        for chunk in &data.text {
            out.push_str(chunk);
        }
        for &child in &data.children {
            self.serialize_node(child, out);
        }
        out.push_str(&format!("</{}>", data.tag));
    }
}

impl PageHost for MemoryPage {
    fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.dfs(self.root, &mut out);
        out
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.clone()
    }

    fn tag(&self, node: NodeId) -> String {
        self.node(node).tag.clone()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node).attrs.get(name).cloned()
    }

    fn global_id(&self, node: NodeId) -> Option<String> {
        self.node(node).attrs.get("id").cloned().filter(|v| !v.is_empty())
    }

    fn text_chunks(&self, node: NodeId) -> Vec<String> {
        self.node(node).text.clone()
    }

    fn descendant_text(&self, node: NodeId) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let data = self.node(n);
            parts.extend(data.text.iter().cloned());
            // Reverse so the stack pops children in document order
            stack.extend(data.children.iter().rev().copied());
        }
        parts.join(" ").trim().to_string()
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        self.node(node).style.clone()
    }

    fn client_rects(&self, node: NodeId) -> Vec<Geometry> {
        let data = self.node(node);
        if !data.attached || data.style.display == "none" {
            return Vec::new();
        }
        if data.rect.width <= 0.0 || data.rect.height <= 0.0 {
            return Vec::new();
        }
        vec![Geometry::new(
            data.rect.x,
            data.rect.y - self.scroll_y,
            data.rect.width,
            data.rect.height,
        )]
    }

    fn bounding_rect(&self, node: NodeId) -> Geometry {
        let data = self.node(node);
        Geometry::new(
            data.rect.x,
            data.rect.y - self.scroll_y,
            data.rect.width,
            data.rect.height,
        )
    }

    fn topmost_at(&self, x: f64, y: f64) -> Option<NodeId> {
        let page_y = y + self.scroll_y;
        let mut hit = None;
        for node in self.elements() {
            let data = self.node(node);
            if data.style.is_hidden() {
                continue;
            }
            let r = data.rect;
            if x >= r.x && x < r.x + r.width && page_y >= r.y && page_y < r.y + r.height {
                // Later in document order paints on top
                hit = Some(node);
            }
        }
        hit
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.node(n).parent;
        }
        false
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.node(node).attached
    }

    fn has_click_handler(&self, node: NodeId) -> bool {
        self.node(node).click_handler
    }

    fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node(node, &mut out);
        out
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn document_height(&self) -> f64 {
        self.document_height
    }

    fn scroll_to(&mut self, y: f64) {
        let max = (self.document_height - self.viewport_height).max(0.0);
        self.scroll_y = y.clamp(0.0, max);
    }

    fn insert_marker(&mut self, rect: Geometry, color: &str, label: &str) -> NodeId {
        let id = self.nodes.len() as NodeId;
        let mut attrs = BTreeMap::new();
        attrs.insert("class".to_string(), "bounding-box".to_string());
        attrs.insert("data-color".to_string(), color.to_string());
        attrs.insert("data-label".to_string(), label.to_string());
        self.nodes.push(NodeData {
            tag: "div".to_string(),
            attrs,
            parent: None,
            children: Vec::new(),
            text: Vec::new(),
            style: ComputedStyle::default(),
            rect,
            attached: true,
            overlay: true,
            click_handler: false,
        });
        id
    }

    fn update_marker(&mut self, marker: NodeId, rect: Geometry, color: &str, label: &str) {
        let data = self.node_mut(marker);
        data.rect = rect;
        data.attrs
            .insert("data-color".to_string(), color.to_string());
        data.attrs
            .insert("data-label".to_string(), label.to_string());
    }

    fn remove_marker(&mut self, marker: NodeId) {
        self.node_mut(marker).attached = false;
    }

    fn is_overlay(&self, node: NodeId) -> bool {
        self.node(node).overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_two_divs() -> (MemoryPage, NodeId, NodeId, NodeId) {
        let mut page = MemoryPage::new("example.com", 600.0, 1800.0);
        let body = page.add_element(page.root(), "body");
        page.set_rect(body, Geometry::new(0.0, 0.0, 1000.0, 1800.0));
        let a = page.add_element_with_rect(body, "div", Geometry::new(0.0, 0.0, 100.0, 100.0));
        let b = page.add_element_with_rect(body, "div", Geometry::new(0.0, 200.0, 100.0, 100.0));
        (page, body, a, b)
    }

    #[test]
    fn test_enumeration_is_document_order() {
        let (page, body, a, b) = page_with_two_divs();
        assert_eq!(page.elements(), vec![page.root(), body, a, b]);
    }

    #[test]
    fn test_detach_removes_subtree_from_enumeration() {
        let (mut page, body, a, b) = page_with_two_divs();
        let inner = page.add_element(a, "span");
        page.detach(a);
        assert_eq!(page.elements(), vec![page.root(), body, b]);
        assert!(!page.is_attached(a));
        assert!(!page.is_attached(inner));
        // The handle itself is still valid
        assert_eq!(page.tag(a), "div");
    }

    #[test]
    fn test_scroll_clamps_to_document() {
        let (mut page, ..) = page_with_two_divs();
        page.scroll_to(10_000.0);
        assert_eq!(page.scroll_y(), 1200.0); // 1800 - 600
        page.scroll_to(-50.0);
        assert_eq!(page.scroll_y(), 0.0);
    }

    #[test]
    fn test_client_rects_are_viewport_relative() {
        let (mut page, _, _, b) = page_with_two_divs();
        page.scroll_to(150.0);
        let rects = page.client_rects(b);
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0].y, 50.0);
    }

    #[test]
    fn test_topmost_at_prefers_later_paint_order() {
        let (mut page, body, a, _) = page_with_two_divs();
        // Occluder painted after `a`, covering it entirely
        let occluder =
            page.add_element_with_rect(body, "div", Geometry::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(page.topmost_at(50.0, 50.0), Some(occluder));
        page.style_mut(occluder).display = "none".to_string();
        assert_eq!(page.topmost_at(50.0, 50.0), Some(a));
    }

    #[test]
    fn test_outer_html_reflects_descendant_change() {
        let (mut page, _, a, _) = page_with_two_divs();
        let span = page.add_element(a, "span");
        page.set_text(span, "before");
        let first = page.outer_html(a);
        page.set_text(span, "after");
        let second = page.outer_html(a);
        assert_ne!(first, second);
        assert!(second.contains("after"));
    }

    #[test]
    fn test_markers_stay_out_of_enumeration_and_hit_testing() {
        let (mut page, _, a, _) = page_with_two_divs();
        let before = page.elements();
        let marker = page.insert_marker(Geometry::new(0.0, 0.0, 500.0, 500.0), "red", "we-1");
        assert_eq!(page.elements(), before);
        assert!(page.is_overlay(marker));
        assert_eq!(page.topmost_at(50.0, 50.0), Some(a));
    }
}
