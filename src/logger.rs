//! High-level run logging: ordering plus submission in one call.
//!
//! [`RunLogger`] is the piece that makes manual trace logging correct:
//! it runs every start through the [`RunOrderTracker`], stamps the
//! assigned `execution_order` (and default session) onto the payload,
//! and hands the result to the [`BatchQueue`]. A call that violates the
//! begin/end contract fails before anything is enqueued, so the remote
//! service only ever sees runs with consistent ordering.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::batch_queue::BatchQueue;
use crate::client::Client;
use crate::error::Result;
use crate::order::RunOrderTracker;
use crate::run::{RunCreate, RunUpdate};

/// Logs ordered trace runs to the service.
///
/// # Example
///
/// ```no_run
/// use tracesmith::{Client, RunCreate, RunLogger, RunType, RunUpdate};
/// use serde_json::json;
/// use uuid::Uuid;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::builder().api_key("your-api-key").build()?;
///     let logger = RunLogger::new(client).with_session_name("demo");
///
///     let root = Uuid::new_v4();
///     logger.start_run(RunCreate::new(root, "pipeline", RunType::Chain))?;
///
///     let step = Uuid::new_v4();
///     logger.start_run(
///         RunCreate::new(step, "lookup", RunType::Tool).with_parent_run_id(root),
///     )?;
///     logger.end_run(step, RunUpdate::new().with_outputs(json!({"hits": 3})))?;
///     logger.end_run(root, RunUpdate::new())?;
///
///     logger.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct RunLogger {
    tracker: Arc<RunOrderTracker>,
    queue: BatchQueue,
    session_name: Option<String>,
}

impl RunLogger {
    /// Create a logger submitting through a default [`BatchQueue`].
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_queue(BatchQueue::new(client))
    }

    /// Create a logger over an explicitly configured queue.
    #[must_use]
    pub fn with_queue(queue: BatchQueue) -> Self {
        Self {
            tracker: Arc::new(RunOrderTracker::new()),
            queue,
            session_name: None,
        }
    }

    /// Create a logger with explicit batching parameters.
    #[must_use]
    pub fn with_config(client: Client, batch_size: usize, flush_interval: Duration) -> Self {
        Self::with_queue(BatchQueue::with_config(client, batch_size, flush_interval))
    }

    /// Default session/project for runs that do not name one.
    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// The order tracker backing this logger.
    #[must_use]
    pub fn tracker(&self) -> &RunOrderTracker {
        &self.tracker
    }

    /// Open a run and enqueue its creation; returns the assigned
    /// `execution_order`.
    ///
    /// The payload's own `execution_order` is overwritten with the
    /// tracker's assignment; the logger's session name fills in when
    /// the payload has none.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateRun`](crate::Error::DuplicateRun) when the
    /// payload's id was already started; nothing is enqueued then.
    pub fn start_run(&self, mut run: RunCreate) -> Result<u32> {
        let order = self.tracker.begin(run.id, run.parent_run_id)?;
        run.execution_order = Some(order);
        if run.session_name.is_none() {
            run.session_name.clone_from(&self.session_name);
        }
        self.queue.create_run(run)?;
        Ok(order)
    }

    /// Close a run and enqueue its update.
    ///
    /// Stamps `end_time` with the current UTC instant when the caller
    /// left it unset.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownRun`](crate::Error::UnknownRun) or
    /// [`Error::AlreadyClosed`](crate::Error::AlreadyClosed) on a bad
    /// call sequence; nothing is enqueued then.
    pub fn end_run(&self, run_id: Uuid, mut update: RunUpdate) -> Result<()> {
        self.tracker.end(run_id)?;
        if update.end_time.is_none() {
            update.end_time = Some(Utc::now());
        }
        self.queue.update_run(run_id, update)
    }

    /// Flush pending submissions.
    pub fn flush(&self) -> Result<()> {
        self.queue.flush()
    }

    /// Flush and stop the background submission worker.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
    }
}
