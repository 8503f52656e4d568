//! Overlay rendering.
//!
//! Draws highlight markers over captured elements through the host's
//! marker surface. The renderer owns the id → marker mapping, so
//! re-applying a label set repositions existing markers instead of
//! stacking duplicates, and ids absent from the new set lose their
//! markers.

use crate::dom::{NodeId, PageHost};
use crate::types::{ElementId, Geometry};
use std::collections::HashMap;
use tracing::debug;

/// One marker to render: the element id, its page-absolute box, and an
/// optional human label shown instead of the bare id.
#[derive(Debug, Clone)]
pub struct MarkerSpec {
    pub id: ElementId,
    pub rect: Geometry,
    pub label: Option<String>,
}

/// Golden-angle hue walk, so consecutive markers get visually distant
/// colors without a fixed palette.
pub fn marker_color(k: usize) -> String {
    format!("hsl({}, 70%, 60%)", (k * 137) % 360)
}

/// Highlight color for entries that carry no label.
pub const DEFAULT_MARKER_COLOR: &str = "red";

/// Marker lifecycle manager over a [`PageHost`].
pub struct OverlayRenderer {
    markers: HashMap<ElementId, NodeId>,
    enabled: bool,
}

impl OverlayRenderer {
    pub fn new(enabled: bool) -> Self {
        Self {
            markers: HashMap::new(),
            enabled,
        }
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Draw a marker for the element, or move the existing one.
    pub fn draw<H: PageHost>(
        &mut self,
        host: &mut H,
        id: ElementId,
        rect: Geometry,
        color: &str,
        label: &str,
    ) {
        if !self.enabled {
            return;
        }
        match self.markers.get(&id) {
            Some(&marker) => host.update_marker(marker, rect, color, label),
            None => {
                let marker = host.insert_marker(rect, color, label);
                self.markers.insert(id, marker);
            }
        }
    }

    /// Remove the element's marker, if it has one.
    pub fn remove<H: PageHost>(&mut self, host: &mut H, id: ElementId) {
        if let Some(marker) = self.markers.remove(&id) {
            host.remove_marker(marker);
        }
    }

    /// Remove every marker. Safe to call repeatedly.
    pub fn clear_all<H: PageHost>(&mut self, host: &mut H) {
        for (_, marker) in self.markers.drain() {
            host.remove_marker(marker);
        }
    }

    /// Reconcile the overlay against a label set: draw or reposition a
    /// marker per entry, remove markers whose ids are no longer listed.
    /// Colors are assigned per distinct label in first-seen order, so
    /// entries sharing a label share a color.
    pub fn apply_label_set<H: PageHost>(&mut self, host: &mut H, specs: &[MarkerSpec]) {
        if !self.enabled {
            return;
        }
        let stale: Vec<ElementId> = self
            .markers
            .keys()
            .filter(|id| !specs.iter().any(|spec| spec.id == **id))
            .copied()
            .collect();
        for id in stale {
            self.remove(host, id);
        }

        let mut palette: HashMap<&str, String> = HashMap::new();
        for spec in specs {
            if let Some(label) = &spec.label {
                let next = palette.len();
                palette
                    .entry(label.as_str())
                    .or_insert_with(|| marker_color(next));
            }
        }

        for spec in specs {
            let (color, label) = match &spec.label {
                Some(label) => (palette[label.as_str()].clone(), label.clone()),
                None => (DEFAULT_MARKER_COLOR.to_string(), spec.id.to_string()),
            };
            self.draw(host, spec.id, spec.rect, &color, &label);
        }
        debug!(markers = self.markers.len(), "overlay reconciled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryPage;

    fn spec(n: u64, y: f64) -> MarkerSpec {
        MarkerSpec {
            id: ElementId(n),
            rect: Geometry::new(0.0, y, 100.0, 20.0),
            label: None,
        }
    }

    fn labeled_spec(n: u64, label: &str) -> MarkerSpec {
        MarkerSpec {
            id: ElementId(n),
            rect: Geometry::new(0.0, f64::from(n as u32) * 30.0, 100.0, 20.0),
            label: Some(label.to_string()),
        }
    }

    fn marker_colors(page: &MemoryPage) -> Vec<String> {
        page.markers()
            .into_iter()
            .map(|marker| page.attr(marker, "data-color").unwrap())
            .collect()
    }

    #[test]
    fn test_marker_color_golden_angle() {
        assert_eq!(marker_color(0), "hsl(0, 70%, 60%)");
        assert_eq!(marker_color(1), "hsl(137, 70%, 60%)");
        assert_eq!(marker_color(3), "hsl(51, 70%, 60%)");
    }

    #[test]
    fn test_redraw_moves_marker_instead_of_stacking() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(true);

        overlay.apply_label_set(&mut page, &[spec(1, 10.0)]);
        overlay.apply_label_set(&mut page, &[spec(1, 50.0)]);
        assert_eq!(overlay.marker_count(), 1);
    }

    #[test]
    fn test_apply_removes_unlisted_markers() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(true);

        overlay.apply_label_set(&mut page, &[spec(1, 10.0), spec(2, 40.0), spec(3, 70.0)]);
        assert_eq!(overlay.marker_count(), 3);

        overlay.apply_label_set(&mut page, &[spec(2, 40.0)]);
        assert_eq!(overlay.marker_count(), 1);
    }

    #[test]
    fn test_entries_sharing_a_label_share_a_color() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(true);

        overlay.apply_label_set(
            &mut page,
            &[
                labeled_spec(1, "header"),
                labeled_spec(2, "header"),
                labeled_spec(3, "footer"),
            ],
        );

        let colors = marker_colors(&page);
        assert_eq!(colors[0], marker_color(0));
        assert_eq!(colors[1], marker_color(0));
        assert_eq!(colors[2], marker_color(1));
    }

    #[test]
    fn test_reapplied_set_refreshes_marker_colors() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(true);

        overlay.apply_label_set(
            &mut page,
            &[labeled_spec(1, "header"), labeled_spec(2, "footer")],
        );
        // Relabel: both ids now fall in the same bucket
        overlay.apply_label_set(
            &mut page,
            &[labeled_spec(1, "header"), labeled_spec(2, "header")],
        );

        assert_eq!(overlay.marker_count(), 2);
        let colors = marker_colors(&page);
        assert_eq!(colors, vec![marker_color(0), marker_color(0)]);
    }

    #[test]
    fn test_unlabeled_entries_use_the_default_color() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(true);

        overlay.apply_label_set(&mut page, &[labeled_spec(1, "header"), spec(2, 40.0)]);

        let colors = marker_colors(&page);
        assert_eq!(colors, vec![marker_color(0), DEFAULT_MARKER_COLOR.to_string()]);
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(true);

        overlay.apply_label_set(&mut page, &[spec(1, 10.0)]);
        overlay.clear_all(&mut page);
        overlay.clear_all(&mut page);
        assert_eq!(overlay.marker_count(), 0);
    }

    #[test]
    fn test_disabled_renderer_draws_nothing() {
        let mut page = MemoryPage::new("example.com", 600.0, 1200.0);
        let mut overlay = OverlayRenderer::new(false);

        overlay.apply_label_set(&mut page, &[spec(1, 10.0)]);
        assert_eq!(overlay.marker_count(), 0);
    }
}
