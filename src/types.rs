//! Core types used throughout the capture pipeline.
//!
//! This module defines element identity, extraction items, batch envelopes,
//! and the interaction events that can trigger a recapture.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Integer band of the page, one per viewport height.
pub type ScrollIndex = u32;

/// Session-stable identifier for a structural position on the page.
///
/// Allocated monotonically from 1 and never reused. Rendered as `we-{n}` on
/// the wire and in label files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "we-{}", self.0)
    }
}

impl FromStr for ElementId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s.strip_prefix("we-").ok_or(())?;
        n.parse::<u64>().map(ElementId).map_err(|_| ())
    }
}

impl Serialize for ElementId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid element id: {s}")))
    }
}

/// Rendered-box position and size, in page-absolute coordinates on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Presentation style captured alongside each element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleInfo {
    pub background_color: String,
    pub font_color: String,
    pub font_size: String,
    pub font_style: String,
}

impl Default for StyleInfo {
    fn default() -> Self {
        Self {
            background_color: "transparent".to_string(),
            font_color: "inherit".to_string(),
            font_size: "inherit".to_string(),
            font_style: "normal".to_string(),
        }
    }
}

/// One captured element, produced per relevant element each capture cycle.
///
/// Geometry and style are presentation state and are recomputed every cycle;
/// only the id and path are identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionItem {
    pub web_element_id: ElementId,
    pub xpath: String,
    pub text: String,
    #[serde(flatten)]
    pub geometry: Geometry,
    #[serde(flatten)]
    pub style: StyleInfo,
    pub scroll_index: ScrollIndex,
}

/// Payload handed to the extraction batch sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub website: String,

    /// Carried for the wire format; screenshot capture itself is external.
    pub screenshot: Option<String>,

    pub elements: Vec<ExtractionItem>,

    /// Unix timestamp in seconds, set at flush time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Cumulative totals reported when a scroll run reaches exhaustion.
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    /// Per-index element-count drift plus snapshot-diff hits, accumulated.
    pub total_changed_elements: u64,
    /// Time spent computing snapshot diffs.
    pub total_compare_time: Duration,
    /// Wall-clock time of the whole run.
    pub total_run_time: Duration,
    /// Number of capture cycles executed.
    pub cycles: u32,
}

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Capturing,
    Waiting,
    Exhausted,
    ListeningForInteraction,
}

/// User interaction kinds that arm a recapture once the scroll run is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    Click,
    Input,
    KeyDown,
    Change,
    Focus,
    TouchStart,
}

impl InteractionEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionEvent::Click => "click",
            InteractionEvent::Input => "input",
            InteractionEvent::KeyDown => "keydown",
            InteractionEvent::Change => "change",
            InteractionEvent::Focus => "focus",
            InteractionEvent::TouchStart => "touchstart",
        }
    }
}

/// Errors from the batch sink hand-off.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink endpoint rejected batch: {0}")]
    Rejected(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors while loading a label set.
#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("label file unreadable: {0}")]
    Io(#[from] std::io::Error),

    #[error("label file is empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_id_roundtrip() {
        let id = ElementId(42);
        assert_eq!(id.to_string(), "we-42");
        assert_eq!("we-42".parse::<ElementId>().unwrap(), id);
        assert!("42".parse::<ElementId>().is_err());
        assert!("we-x".parse::<ElementId>().is_err());
    }

    #[test]
    fn test_geometry_center_and_area() {
        let g = Geometry::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(g.center(), (60.0, 45.0));
        assert_eq!(g.area(), 5000.0);
    }

    #[test]
    fn test_item_wire_format_is_flat_camel_case() {
        let item = ExtractionItem {
            web_element_id: ElementId(1),
            xpath: "/body[1]/div[1]".to_string(),
            text: "hello".to_string(),
            geometry: Geometry::new(1.0, 2.0, 3.0, 4.0),
            style: StyleInfo::default(),
            scroll_index: 0,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["webElementId"], "we-1");
        assert_eq!(json["x"], 1.0);
        assert_eq!(json["backgroundColor"], "transparent");
        assert_eq!(json["scrollIndex"], 0);
        // Nested wrappers must not leak into the wire format
        assert!(json.get("geometry").is_none());
        assert!(json.get("style").is_none());
    }

    #[test]
    fn test_batch_omits_missing_timestamp() {
        let batch = ExtractionBatch {
            website: "example.com".to_string(),
            screenshot: None,
            elements: vec![],
            timestamp: None,
        };
        let json = serde_json::to_value(&batch).unwrap();
        assert!(json.get("timestamp").is_none());
        assert!(json["screenshot"].is_null());
    }
}
