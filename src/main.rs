//! DOM Capture - Main entry point
//!
//! This binary runs one scroll-capture session over a page fixture and
//! ships the extracted batches to the configured endpoint.

use dom_capture::{
    load_label_file, BatchSink, CaptureMode, CaptureOrchestrator, Config, HttpTransport,
    MemoryPage,
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first so it can drive the log level
    let config = Config::load();

    let level: Level = config.general.log_level.parse().unwrap_or(Level::INFO);
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    info!("Starting DOM capture");
    info!("Configuration loaded from {:?}", Config::default_config_path());

    if !config.general.enabled {
        info!("Capture is disabled in configuration, exiting");
        return Ok(());
    }

    let mut args = std::env::args().skip(1);
    let fixture_path: PathBuf = match args.next() {
        Some(path) => path.into(),
        None => {
            eprintln!("usage: dom-capture <page-fixture.json> [label-file.csv]");
            std::process::exit(2);
        }
    };
    let label_path: Option<PathBuf> = args.next().map(Into::into);

    let fixture = std::fs::read_to_string(&fixture_path)?;
    let page: MemoryPage = serde_json::from_str(&fixture)?;
    let website = page.website().to_string();
    info!(website = %website, "page fixture loaded");

    // Create the capture channel and the sink task
    let (batch_tx, batch_rx) = mpsc::channel(100);
    let transport = HttpTransport::new(&config.sink.endpoint);
    let sink = BatchSink::new(batch_rx, transport, &website, &config.sink);
    let sink_handle = tokio::spawn(sink.run());

    let mut orchestrator =
        CaptureOrchestrator::new(page, &config, CaptureMode::SalientRegion, batch_tx);
    let summary = orchestrator.run_scroll_capture().await;
    info!(
        cycles = summary.cycles,
        total_changed_elements = summary.total_changed_elements,
        "scroll capture finished"
    );

    if let Some(path) = label_path {
        match load_label_file(&path) {
            Ok(entries) => {
                info!(entries = entries.len(), "label set loaded");
                orchestrator.apply_labels(&entries);
            }
            Err(e) => warn!(error = %e, "label set unavailable, overlay left as drawn"),
        }
    }

    // Close the channel so the sink makes its final flush
    drop(orchestrator);
    sink_handle.await?;

    Ok(())
}
