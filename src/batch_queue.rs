//! Async batching queue for best-effort run submission.
//!
//! Tracing must never block or break the instrumented application, so
//! submissions go through a bounded channel into a background worker
//! that batches them up. A full channel drops the submission with a
//! warning; a failed flush is logged and discarded. Nothing here
//! retries.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::client::{BatchIngest, Client};
use crate::error::{Error, Result};
use crate::run::{RunCreate, RunUpdate};

/// Default number of operations per batch submission.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default interval between periodic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

const CHANNEL_CAPACITY: usize = 10_000;

#[derive(Debug)]
enum QueueCommand {
    Create(RunCreate),
    Update(Uuid, RunUpdate),
    Flush,
    Shutdown,
}

/// Background batching queue in front of a [`Client`].
///
/// Collects run creations and updates and submits them together via
/// the batch-ingest endpoint, flushing when the batch fills, on a
/// timer, on [`flush`](Self::flush), and on shutdown.
pub struct BatchQueue {
    sender: mpsc::Sender<QueueCommand>,
    worker: Option<tokio::task::JoinHandle<()>>,
}

impl BatchQueue {
    /// Create a queue with the default batch size and flush interval.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_config(client, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL)
    }

    /// Create a queue with explicit batching parameters.
    #[must_use]
    pub fn with_config(client: Client, batch_size: usize, flush_interval: Duration) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let worker = tokio::spawn(batch_worker(client, receiver, batch_size, flush_interval));
        Self {
            sender,
            worker: Some(worker),
        }
    }

    /// Enqueue a run creation.
    ///
    /// # Errors
    ///
    /// [`Error::Other`] when the queue is full (the creation is
    /// dropped) or the worker has shut down.
    pub fn create_run(&self, run: RunCreate) -> Result<()> {
        self.send(QueueCommand::Create(run), "run creation")
    }

    /// Enqueue a run update.
    pub fn update_run(&self, run_id: Uuid, update: RunUpdate) -> Result<()> {
        self.send(QueueCommand::Update(run_id, update), "run update")
    }

    /// Ask the worker to flush everything pending now.
    pub fn flush(&self) -> Result<()> {
        match self.sender.try_send(QueueCommand::Flush) {
            // A full queue is about to flush on its own
            Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::Other("batch queue is closed".to_string()))
            }
            Ok(()) => Ok(()),
        }
    }

    /// Shut the worker down after flushing everything pending.
    pub async fn shutdown(mut self) {
        let _ = self.sender.try_send(QueueCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }

    fn send(&self, command: QueueCommand, what: &str) -> Result<()> {
        match self.sender.try_send(command) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("batch queue full, dropping {what}");
                Err(Error::Other(format!("batch queue full, dropped {what}")))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::Other("batch queue is closed".to_string()))
            }
        }
    }
}

impl Drop for BatchQueue {
    fn drop(&mut self) {
        // Best effort: let the worker flush what it holds
        let _ = self.sender.try_send(QueueCommand::Shutdown);
    }
}

async fn batch_worker(
    client: Client,
    mut receiver: mpsc::Receiver<QueueCommand>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut pending = BatchIngest::default();
    let mut timer = interval(flush_interval);
    timer.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            command = receiver.recv() => {
                match command {
                    Some(QueueCommand::Create(run)) => pending.post.push(run),
                    Some(QueueCommand::Update(run_id, update)) => {
                        pending.patch.push((run_id, update));
                    }
                    Some(QueueCommand::Flush) => {
                        submit(&client, &mut pending).await;
                        continue;
                    }
                    Some(QueueCommand::Shutdown) | None => {
                        submit(&client, &mut pending).await;
                        debug!("batch queue worker stopped");
                        return;
                    }
                }
                if pending.len() >= batch_size {
                    submit(&client, &mut pending).await;
                }
            }
            _ = timer.tick() => {
                submit(&client, &mut pending).await;
            }
        }
    }
}

/// Submit and clear the pending batch, logging (never propagating) failures.
async fn submit(client: &Client, pending: &mut BatchIngest) {
    if pending.is_empty() {
        return;
    }
    let batch = std::mem::take(pending);
    debug!(
        creates = batch.post.len(),
        updates = batch.patch.len(),
        "flushing run batch"
    );
    if let Err(e) = client.batch_ingest_runs(&batch).await {
        error!(dropped = batch.len(), "failed to submit run batch: {e}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::run::RunType;
    use serde_json::json;

    fn offline_client() -> Client {
        Client::builder()
            .api_key("test-key")
            .endpoint("http://127.0.0.1:9")
            .build()
            .expect("failed to build client")
    }

    // ===== Lifecycle Tests =====

    #[tokio::test]
    async fn test_enqueue_create_and_shutdown() {
        let queue = BatchQueue::new(offline_client());
        let run = RunCreate::new(Uuid::new_v4(), "queued", RunType::Chain);
        assert!(queue.create_run(run).is_ok());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_update() {
        let queue = BatchQueue::new(offline_client());
        let update = RunUpdate::new().with_error("queued failure");
        assert!(queue.update_run(Uuid::new_v4(), update).is_ok());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_flush_with_nothing_pending() {
        let queue = BatchQueue::new(offline_client());
        assert!(queue.flush().is_ok());
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_with_pending_items() {
        let queue = BatchQueue::with_config(offline_client(), 100, Duration::from_secs(300));
        for i in 0..10 {
            let run = RunCreate::new(Uuid::new_v4(), format!("pending-{i}"), RunType::Tool);
            let _ = queue.create_run(run);
        }
        // Shutdown flushes (and here drops, since nothing is listening)
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_immediate_shutdown() {
        let queue = BatchQueue::new(offline_client());
        queue.shutdown().await;
    }

    // ===== Delivery Tests (mockito) =====

    #[tokio::test]
    async fn test_flush_delivers_batch() {
        let mut server = mockito::Server::new_async().await;
        let run_id = Uuid::new_v4();
        let mock = server
            .mock("POST", "/runs/batch")
            .match_body(mockito::Matcher::PartialJson(json!({
                "post": [{"id": run_id, "name": "delivered"}],
            })))
            .with_status(202)
            .create_async()
            .await;

        let client = Client::builder()
            .api_key("test-key")
            .endpoint(&server.url())
            .build()
            .unwrap();
        let queue = BatchQueue::with_config(client, 100, Duration::from_secs(300));

        let run = RunCreate::new(run_id, "delivered", RunType::Chain);
        queue.create_run(run).unwrap();
        queue.shutdown().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_batch_size_triggers_flush() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/runs/batch")
            .with_status(202)
            .expect_at_least(1)
            .create_async()
            .await;

        let client = Client::builder()
            .api_key("test-key")
            .endpoint(&server.url())
            .build()
            .unwrap();
        // Batch size 2 with a long timer: only size can trigger the flush
        let queue = BatchQueue::with_config(client, 2, Duration::from_secs(300));

        queue
            .create_run(RunCreate::new(Uuid::new_v4(), "a", RunType::Llm))
            .unwrap();
        queue
            .update_run(Uuid::new_v4(), RunUpdate::new().with_outputs(json!({"n": 1})))
            .unwrap();
        queue.shutdown().await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_failure_is_swallowed() {
        // Unroutable endpoint: the worker logs and drops, the caller
        // never sees the transport failure.
        let queue = BatchQueue::with_config(offline_client(), 1, Duration::from_millis(10));
        queue
            .create_run(RunCreate::new(Uuid::new_v4(), "lost", RunType::Chain))
            .unwrap();
        queue.shutdown().await;
    }

    // ===== Constants Tests =====

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_BATCH_SIZE, 20);
        assert_eq!(DEFAULT_FLUSH_INTERVAL, Duration::from_secs(5));
        assert!(CHANNEL_CAPACITY >= DEFAULT_BATCH_SIZE);
    }
}
