//! DOM Capture - Structural page capture pipeline
//!
//! This crate captures the meaningful elements of a rendered page as stable,
//! re-identifiable records:
//!
//! - **Path resolution**: structural addresses anchored at unique-id ancestors
//! - **Identity registry**: an append-only path → id table for the session
//! - **Relevance filtering**: visibility, leaf-only and salient-region policies
//! - **Snapshot differencing**: coarse subtree fingerprints between cycles
//! - **Capture orchestration**: the scroll-driven loop and interaction recapture
//! - **Batch sink**: inactivity-flushed delivery to the extraction endpoint
//!
//! # Architecture
//!
//! The pipeline never owns the rendered page; it drives any host rendering
//! engine through the [`PageHost`] trait. Data flows one direction: path
//! resolution feeds the identity registry, the relevance filter selects
//! elements, the orchestrator assembles extraction items per scroll band, and
//! the batch sink ships them. The overlay renderer consumes the same id
//! namespace to annotate the live page.

pub mod config;
pub mod dom;
pub mod filter;
pub mod identity;
pub mod labels;
pub mod orchestrator;
pub mod overlay;
pub mod path;
pub mod sink;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use dom::{ComputedStyle, MemoryPage, NodeId, PageHost};
pub use filter::{CaptureMode, RelevanceFilter};
pub use identity::IdentityRegistry;
pub use labels::{load_label_file, parse_labels, LabelEntry};
pub use orchestrator::CaptureOrchestrator;
pub use overlay::{marker_color, MarkerSpec, OverlayRenderer, DEFAULT_MARKER_COLOR};
pub use sink::{BatchSink, BatchTransport, HttpTransport};
pub use snapshot::Snapshot;
pub use types::{
    CapturePhase, CaptureSummary, ElementId, ExtractionBatch, ExtractionItem, Geometry,
    InteractionEvent, LabelError, ScrollIndex, SinkError, StyleInfo,
};
