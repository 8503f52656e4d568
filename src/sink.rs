//! Batch sink.
//!
//! Buffers captured items and ships them to the extraction endpoint
//! once the stream goes quiet: a poll loop checks how long it has been
//! since the last new item arrived, and flushes the whole buffer after
//! the configured inactivity window. Delivery failures are logged and
//! the batch dropped; capture never blocks on the network.

use crate::config::SinkConfig;
use crate::types::{ExtractionBatch, ExtractionItem, SinkError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Delivery seam. Production uses [`HttpTransport`]; tests substitute a
/// recording mock.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn post(&self, batch: &ExtractionBatch) -> Result<(), SinkError>;
}

/// POSTs batches as JSON to the configured endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn post(&self, batch: &ExtractionBatch) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(batch)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Inactivity-flushing batch sink.
///
/// Owns the receiving end of the capture channel; [`run`] drives it
/// until the channel closes, then makes a final flush of whatever is
/// buffered.
///
/// [`run`]: BatchSink::run
pub struct BatchSink<T: BatchTransport> {
    receiver: mpsc::Receiver<Vec<ExtractionItem>>,
    transport: T,
    website: String,
    buffer: Vec<ExtractionItem>,
    last_new_item: Instant,
    poll_interval: Duration,
    flush_after: Duration,
}

impl<T: BatchTransport> BatchSink<T> {
    pub fn new(
        receiver: mpsc::Receiver<Vec<ExtractionItem>>,
        transport: T,
        website: &str,
        config: &SinkConfig,
    ) -> Self {
        Self {
            receiver,
            transport,
            website: website.to_string(),
            buffer: Vec::new(),
            last_new_item: Instant::now(),
            poll_interval: Duration::from_secs(config.flush_poll_seconds),
            flush_after: Duration::from_secs(config.flush_after_seconds),
        }
    }

    /// Run until the producing side closes the channel.
    pub async fn run(mut self) {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.receiver.recv() => {
                    match received {
                        Some(items) => self.accept(items),
                        None => break,
                    }
                }
                _ = poll.tick() => {
                    if !self.buffer.is_empty()
                        && self.last_new_item.elapsed() >= self.flush_after
                    {
                        self.flush().await;
                    }
                }
            }
        }

        // Producers are gone; ship whatever is left
        if !self.buffer.is_empty() {
            self.flush().await;
        }
        info!("batch sink stopped");
    }

    fn accept(&mut self, items: Vec<ExtractionItem>) {
        if items.is_empty() {
            return;
        }
        debug!(count = items.len(), buffered = self.buffer.len(), "items buffered");
        self.buffer.extend(items);
        self.last_new_item = Instant::now();
    }

    async fn flush(&mut self) {
        let elements = std::mem::take(&mut self.buffer);
        let batch = ExtractionBatch {
            website: self.website.clone(),
            screenshot: None,
            elements,
            timestamp: Some(chrono::Utc::now().timestamp()),
        };

        match self.transport.post(&batch).await {
            Ok(()) => {
                info!(elements = batch.elements.len(), "batch delivered");
            }
            Err(SinkError::Rejected(status)) => {
                warn!(status, elements = batch.elements.len(), "endpoint rejected batch, dropping");
            }
            Err(e) => {
                error!(error = %e, elements = batch.elements.len(), "batch delivery failed, dropping");
            }
        }
    }
}
