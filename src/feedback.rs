//! Evaluation feedback attached to runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Payload for `POST /feedback`: scores or annotates a logged run.
///
/// `key` names the metric ("correctness", "user_click", ...); `score`
/// is its numeric value when one applies. Both payload fields are
/// opaque to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackCreate {
    /// Caller-generated unique id for this feedback record.
    pub id: Uuid,
    /// The run being scored.
    pub run_id: Uuid,
    /// Metric name.
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Structured correction supplied by a reviewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<Value>,
}

impl FeedbackCreate {
    /// Create feedback for a run under the given metric key.
    pub fn new(run_id: Uuid, key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            key: key.into(),
            score: None,
            comment: None,
            correction: None,
        }
    }

    /// Set the numeric score.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Attach a free-text comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Attach a structured correction.
    #[must_use]
    pub fn with_correction(mut self, correction: Value) -> Self {
        self.correction = Some(correction);
        self
    }
}
