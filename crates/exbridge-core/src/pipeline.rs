//! Single-writer ingest pipeline.
//!
//! `parse → diff → apply → notify` for one blob at a time. Blobs arrive
//! either synchronously through [`IngestPipeline::ingest`] or from any
//! thread through a [`ContentFeed`], which is a single-slot, latest-wins
//! queue: a blob that is superseded before the worker picks it up is
//! dropped, since only the newest document matters.
//!
//! ## Atomicity Contract
//!
//! - A blob that fails to parse leaves the live snapshot untouched and
//!   fires no events.
//! - The diff is computed and applied under the store's writer lock, so
//!   it is always relative to the snapshot it replaces.
//! - All notifications of one blob complete before the next blob starts.

use crate::diff::engine::compute_diff;
use crate::errors::Result;
use crate::snapshot::digest::content_digest;
use crate::snapshot::parser::parse;
use crate::store::{ApplyOutcome, SnapshotStore};
use crate::{log_op_end, log_op_error, log_op_start};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Length of the digest prefix written to logs
const DIGEST_LOG_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct IngestPipeline {
    store: Arc<SnapshotStore>,
}

impl IngestPipeline {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Process one exchanged blob to completion.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` or `InvalidShape` if the blob cannot be parsed;
    /// the error is also logged and the previous snapshot stays live.
    /// Subscriber failures are not errors here; they are reported in
    /// [`ApplyOutcome::report`].
    pub fn ingest(&self, raw: &str) -> Result<ApplyOutcome> {
        let start = Instant::now();
        let digest = content_digest(raw.as_bytes());
        let digest = &digest[..DIGEST_LOG_LEN];
        log_op_start!("ingest", bytes = raw.len(), content_digest = digest);

        let document = match parse(raw) {
            Ok(document) => document,
            Err(err) => {
                log_op_error!(
                    "ingest",
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    content_digest = digest,
                );
                return Err(err);
            }
        };

        let writer = self.store.writer();
        let diff = compute_diff(&writer.current(), &document);
        let outcome = writer.apply(diff);

        let counts = outcome.diff.counts();
        log_op_end!(
            "ingest",
            duration_ms = start.elapsed().as_millis() as u64,
            content_digest = digest,
            snapshot_version = outcome.version,
            added = counts.added,
            changed = counts.changed,
            removed = counts.removed,
            subscriber_failures = outcome.report.failed(),
        );

        Ok(outcome)
    }

    /// Start the background worker and return the feed that drives it.
    ///
    /// Must be called from within a Tokio runtime. The worker ends when every
    /// clone of the returned feed has been dropped or when
    /// [`PipelineHandle::shutdown`] is called; a pending blob is processed
    /// before it exits.
    pub fn spawn(self: Arc<Self>) -> (ContentFeed, PipelineHandle) {
        let (tx, rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_worker(self, rx, shutdown_rx));

        (
            ContentFeed { tx: Arc::new(tx) },
            PipelineHandle {
                shutdown: Some(shutdown_tx),
                task,
            },
        )
    }
}

/// Inbound side of the pipeline; cheap to clone and callable from any thread.
#[derive(Debug, Clone)]
pub struct ContentFeed {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl ContentFeed {
    /// Hand a changed blob to the pipeline.
    ///
    /// Never blocks. Replaces any blob that has not been picked up yet.
    pub fn on_content_changed(&self, raw: impl Into<String>) {
        self.tx.send_replace(Some(raw.into()));
    }

    /// True once the worker has exited and blobs are no longer consumed
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Control handle for the background worker
#[derive(Debug)]
pub struct PipelineHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    /// Stop accepting blobs, process a pending one if present, and wait for the worker.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.join().await;
    }

    /// Wait for the worker to end on its own (all feeds dropped).
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "ingest worker terminated abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run_worker(
    pipeline: Arc<IngestPipeline>,
    mut rx: watch::Receiver<Option<String>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    tracing::debug!("ingest worker started");
    let mut shutdown_armed = true;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                process_latest(&pipeline, &mut rx).await;
            }
            signal = &mut shutdown, if shutdown_armed => {
                if signal.is_err() {
                    // Handle dropped without shutdown: run until the feeds go away
                    shutdown_armed = false;
                    continue;
                }
                // Ref::has_changed still answers once every feed is gone
                let pending = rx.borrow().has_changed();
                if pending {
                    process_latest(&pipeline, &mut rx).await;
                }
                break;
            }
        }
    }
    tracing::debug!("ingest worker stopped");
}

async fn process_latest(pipeline: &Arc<IngestPipeline>, rx: &mut watch::Receiver<Option<String>>) {
    let latest = rx.borrow_and_update().clone();
    let Some(raw) = latest else {
        return;
    };
    let pipeline = Arc::clone(pipeline);
    // Subscribers are synchronous callbacks; keep them off the async workers.
    // Parse failures were already logged by `ingest`.
    match tokio::task::spawn_blocking(move || pipeline.ingest(&raw)).await {
        Ok(_) => {}
        Err(err) => tracing::error!(error = %err, "ingest task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::ChangeNotifier;
    use serde_json::json;

    fn pipeline() -> IngestPipeline {
        IngestPipeline::new(Arc::new(SnapshotStore::new(Arc::new(ChangeNotifier::new()))))
    }

    #[test]
    fn test_ingest_applies_document() {
        let pipeline = pipeline();
        let outcome = pipeline.ingest(r#"{"a": 1}"#).unwrap();
        assert_eq!(outcome.version, 1);
        assert_eq!(pipeline.store().get("a"), Some(json!(1)));
    }

    #[test]
    fn test_ingest_rejects_scalar_without_touching_store() {
        let pipeline = pipeline();
        pipeline.ingest(r#"{"a": 1}"#).unwrap();
        assert!(pipeline.ingest("42").is_err());
        assert_eq!(pipeline.store().version(), 1);
    }

    #[tokio::test]
    async fn test_worker_stops_when_feed_dropped() {
        let (feed, handle) = Arc::new(pipeline()).spawn();
        drop(feed);
        handle.join().await;
    }
}
