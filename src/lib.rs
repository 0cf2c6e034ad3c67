//! # tracesmith
//!
//! Rust client for a run-tracing observability service: log trace runs
//! (spans) with correct parent/child ordering, submit them efficiently,
//! and attach evaluation feedback.
//!
//! ## Features
//!
//! - **Run ordering**: [`RunOrderTracker`] assigns `execution_order`
//!   values so manually logged runs reconstruct into the right call tree
//! - **Run management**: create and close runs over the REST API
//! - **Batch ingestion**: best-effort background batching that never
//!   blocks the instrumented application
//! - **Feedback**: score logged runs for evaluation workflows
//!
//! ## Example
//!
//! ```no_run
//! use tracesmith::{Client, RunCreate, RunLogger, RunType, RunUpdate};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .api_key("your-api-key")
//!         .build()?;
//!     let logger = RunLogger::new(client);
//!
//!     let root = Uuid::new_v4();
//!     logger.start_run(RunCreate::new(root, "pipeline", RunType::Chain))?;
//!     logger.end_run(root, RunUpdate::new())?;
//!     logger.shutdown().await;
//!     Ok(())
//! }
//! ```

mod batch_queue;
mod client;
mod error;
mod feedback;
mod logger;
mod order;
mod run;

pub use batch_queue::{BatchQueue, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL};
pub use client::{BatchIngest, Client, ClientBuilder, API_KEY_ENV, DEFAULT_ENDPOINT, ENDPOINT_ENV};
pub use error::{Error, Result};
pub use feedback::FeedbackCreate;
pub use logger::RunLogger;
pub use order::RunOrderTracker;
pub use run::{Run, RunCreate, RunType, RunUpdate};
