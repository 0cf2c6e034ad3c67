//! Error types for the tracing client.

use thiserror::Error;
use uuid::Uuid;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while tracking or submitting runs.
///
/// The first three variants are local contract violations raised by
/// [`RunOrderTracker`](crate::RunOrderTracker): the caller issued an
/// invalid begin/end sequence and must fix its call order. They are
/// never retried or recovered from internally. The remaining variants
/// cover configuration and transport failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// `begin` was called twice for the same run id.
    #[error("run {0} was already begun")]
    DuplicateRun(Uuid),

    /// `end` was called for a run id that was never begun.
    #[error("run {0} was never begun")]
    UnknownRun(Uuid),

    /// `end` was called twice for the same run id.
    #[error("run {0} is already closed")]
    AlreadyClosed(Uuid),

    /// Client was misconfigured (bad endpoint URL, missing API key).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Underlying HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service returned a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The service rate-limited the request (429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else (queue closed, queue full, ...).
    #[error("{0}")]
    Other(String),
}
