//! Capture orchestration.
//!
//! Owns the scroll-driven capture loop and everything it touches: the
//! identity registry, the relevance filter, the overlay, the per-band
//! item counts, and the channel to the batch sink. The loop is strictly
//! sequential; every wait is an explicit `tokio::time` suspension, so
//! no two capture cycles can overlap. Scrolling stops advancing is the
//! only terminal condition, after which the orchestrator listens for
//! user interactions and recaptures the current band on demand.

use crate::config::Config;
use crate::dom::{NodeId, PageHost};
use crate::filter::{self, CaptureMode, RelevanceFilter};
use crate::identity::IdentityRegistry;
use crate::labels::LabelEntry;
use crate::overlay::{marker_color, MarkerSpec, OverlayRenderer};
use crate::path;
use crate::snapshot::Snapshot;
use crate::types::{
    CapturePhase, CaptureSummary, ElementId, ExtractionItem, Geometry, InteractionEvent,
    ScrollIndex,
};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Scroll-driven capture state machine over one page load.
pub struct CaptureOrchestrator<H: PageHost> {
    host: H,
    registry: IdentityRegistry,
    filter: RelevanceFilter,
    overlay: OverlayRenderer,
    sender: mpsc::Sender<Vec<ExtractionItem>>,
    mode: CaptureMode,
    phase: CapturePhase,

    scroll_interval: Duration,
    settle_delay: Duration,
    interaction_settle: Duration,
    interaction_cooldown: Duration,
    emit_summary: bool,

    /// Item count per scroll band, for drift accounting.
    index_counts: HashMap<ScrollIndex, usize>,
    /// Bands flagged by external change signals, drained by the sweep.
    dirty_indices: BTreeSet<ScrollIndex>,
    /// Last emitted page-absolute box per id, for overlay labelling.
    last_geometry: HashMap<ElementId, Geometry>,
    last_interaction: Option<Instant>,
    summary: CaptureSummary,
}

impl<H: PageHost> CaptureOrchestrator<H> {
    pub fn new(
        host: H,
        config: &Config,
        mode: CaptureMode,
        sender: mpsc::Sender<Vec<ExtractionItem>>,
    ) -> Self {
        Self {
            host,
            registry: IdentityRegistry::new(),
            filter: RelevanceFilter::new(config.filter.min_area),
            overlay: OverlayRenderer::new(config.overlay.enabled),
            sender,
            mode,
            phase: CapturePhase::Idle,
            scroll_interval: Duration::from_millis(config.timing.scroll_interval_ms),
            settle_delay: Duration::from_millis(config.timing.settle_delay_ms),
            interaction_settle: Duration::from_millis(config.timing.interaction_settle_ms),
            interaction_cooldown: Duration::from_millis(config.timing.interaction_cooldown_ms),
            emit_summary: config.general.emit_summary,
            index_counts: HashMap::new(),
            dirty_indices: BTreeSet::new(),
            last_geometry: HashMap::new(),
            last_interaction: None,
            summary: CaptureSummary::default(),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn summary(&self) -> &CaptureSummary {
        &self.summary
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The band the current scroll offset falls into.
    pub fn current_scroll_index(&self) -> ScrollIndex {
        (self.host.scroll_y() / self.host.viewport_height()).floor() as ScrollIndex
    }

    /// Drive the whole scroll run: capture the top band, then scroll one
    /// viewport at a time, diffing and capturing after each advance,
    /// until scrolling stops moving the page.
    pub async fn run_scroll_capture(&mut self) -> CaptureSummary {
        let run_start = Instant::now();
        info!(
            document_height = self.host.document_height(),
            viewport_height = self.host.viewport_height(),
            "starting scroll capture"
        );

        self.phase = CapturePhase::Capturing;
        let mut previous = Snapshot::capture(&self.host);
        self.capture_cycle(self.current_scroll_index()).await;
        self.phase = CapturePhase::Waiting;
        sleep(self.settle_delay).await;

        loop {
            let offset = self.host.scroll_y();
            self.host.scroll_by(self.host.viewport_height());
            if self.host.scroll_y() == offset {
                break;
            }
            sleep(self.scroll_interval).await;

            let current = Snapshot::capture(&self.host);
            let compare_start = Instant::now();
            let changed = current.changed_since(&previous);
            self.summary.total_compare_time += compare_start.elapsed();
            self.summary.total_changed_elements += changed.len() as u64;
            previous = current;

            self.phase = CapturePhase::Capturing;
            self.capture_cycle(self.current_scroll_index()).await;
            self.phase = CapturePhase::Waiting;
            sleep(self.settle_delay).await;
        }

        self.phase = CapturePhase::Exhausted;
        self.summary.total_run_time = run_start.elapsed();
        if self.emit_summary {
            info!(
                cycles = self.summary.cycles,
                total_changed_elements = self.summary.total_changed_elements,
                total_compare_time_ms = self.summary.total_compare_time.as_millis() as u64,
                total_run_time_ms = self.summary.total_run_time.as_millis() as u64,
                "scroll capture exhausted"
            );
        }
        self.phase = CapturePhase::ListeningForInteraction;
        self.summary.clone()
    }

    /// One pass of filtering, identity assignment, and item emission at
    /// the current scroll position. Returns the qualifying item count.
    pub async fn capture_cycle(&mut self, index: ScrollIndex) -> usize {
        let mut qualifying: Vec<NodeId> = self
            .host
            .elements()
            .into_iter()
            .filter(|&node| self.filter.is_capturable(&self.host, node, self.mode))
            .collect();
        if self.mode == CaptureMode::SalientRegion {
            qualifying = self.filter.resolve_containment(&self.host, &qualifying);
        }

        let mut items = Vec::with_capacity(qualifying.len());
        for node in qualifying {
            let xpath = path::resolve(&self.host, node);
            if xpath.is_empty() {
                continue;
            }
            // Leaf-only capture appends never-seen leaves; salient-region
            // capture re-emits with fresh geometry and style every cycle
            if self.mode == CaptureMode::LeafOnly && self.registry.knows(&xpath) {
                continue;
            }
            let id = self.registry.id_for_path(&xpath);
            let geometry = filter::page_geometry(&self.host, node);
            self.last_geometry.insert(id, geometry);
            items.push(ExtractionItem {
                web_element_id: id,
                xpath,
                text: filter::element_text(&self.host, node),
                geometry,
                style: filter::capture_style(&self.host, node),
                scroll_index: index,
            });
        }

        let count = items.len();
        if let Some(&previous) = self.index_counts.get(&index) {
            if previous != count {
                let drift = previous.abs_diff(count) as u64;
                self.summary.total_changed_elements += drift;
                debug!(index, previous, count, "item count drifted");
            }
        }
        self.index_counts.insert(index, count);

        for item in &items {
            let color = marker_color(item.web_element_id.0 as usize);
            self.overlay.draw(
                &mut self.host,
                item.web_element_id,
                item.geometry,
                &color,
                &item.web_element_id.to_string(),
            );
        }

        if !items.is_empty() {
            if let Err(e) = self.sender.send(items).await {
                warn!(error = %e, "batch sink unavailable, dropping cycle output");
            }
        }
        self.summary.cycles += 1;
        debug!(index, count, "capture cycle complete");
        count
    }

    /// Interaction-triggered recapture of the band under the current
    /// scroll offset. Throttled: events inside the cooldown window are
    /// ignored. Returns whether a recapture actually ran.
    pub async fn handle_interaction(&mut self, event: InteractionEvent) -> bool {
        if self.phase != CapturePhase::ListeningForInteraction {
            return false;
        }
        if let Some(last) = self.last_interaction {
            if last.elapsed() < self.interaction_cooldown {
                debug!(event = event.as_str(), "interaction throttled");
                return false;
            }
        }

        // The band is taken from the offset at event time, not the target
        let index = self.current_scroll_index();
        info!(event = event.as_str(), index, "interaction recapture");
        self.host.scroll_to(f64::from(index) * self.host.viewport_height());
        sleep(self.interaction_settle).await;
        self.capture_cycle(index).await;
        // Cooldown runs from completion so recaptures can never overlap
        self.last_interaction = Some(Instant::now());
        true
    }

    /// Flag bands for the dirty sweep.
    pub fn mark_dirty(&mut self, indices: impl IntoIterator<Item = ScrollIndex>) {
        self.dirty_indices.extend(indices);
    }

    /// Revisit each flagged band once: scroll to it, wait, recapture,
    /// and log the item-count movement. The flagged set is cleared.
    pub async fn recapture_dirty(&mut self) {
        let indices: Vec<ScrollIndex> = std::mem::take(&mut self.dirty_indices)
            .into_iter()
            .collect();
        for index in indices {
            let before = self.index_counts.get(&index).copied();
            self.host
                .scroll_to(f64::from(index) * self.host.viewport_height());
            sleep(self.settle_delay).await;
            let after = self.capture_cycle(index).await;
            info!(index, ?before, after, "dirty band recaptured");
        }
    }

    /// Reconcile the overlay against a reloaded label set. Ids with no
    /// recorded geometry (never captured this session) are skipped; ids
    /// missing from the set lose their markers.
    pub fn apply_labels(&mut self, entries: &[LabelEntry]) {
        let specs: Vec<MarkerSpec> = entries
            .iter()
            .filter_map(|entry| {
                self.last_geometry.get(&entry.id).map(|&rect| MarkerSpec {
                    id: entry.id,
                    rect,
                    label: entry.label.clone(),
                })
            })
            .collect();
        self.overlay.apply_label_set(&mut self.host, &specs);
    }

    /// Drop every overlay marker.
    pub fn clear_overlay(&mut self) {
        self.overlay.clear_all(&mut self.host);
    }
}
