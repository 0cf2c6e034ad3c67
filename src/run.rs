//! Run data model: payloads for creating, updating, and reading runs.
//!
//! A run is one logged unit of work (a span). Runs are created open,
//! optionally nest beneath a parent run, and are closed exactly once by
//! a PATCH that sets `end_time` together with outputs or an error. The
//! service rejects a second close, so [`RunUpdate`] fields are
//! effectively settable once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of work a run represents.
///
/// This is an open enumeration interpreted by the remote trace renderer,
/// not by this crate; `chain` and `llm` are the common cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Llm,
    Chain,
    Tool,
    Retriever,
    Embedding,
    Prompt,
    Parser,
}

/// Payload for `POST /runs`: creates a new (open) run.
///
/// The id is caller-generated before submission so that child runs can
/// reference their parent without waiting for a server round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCreate {
    /// Caller-generated unique id for this run.
    pub id: Uuid,
    /// Display name shown by the trace renderer.
    pub name: String,
    /// Kind of work this run represents.
    pub run_type: RunType,
    /// UTC instant the work began.
    pub start_time: DateTime<Utc>,
    /// Opaque input payload; never interpreted by this crate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Value>,
    /// Enclosing run, absent for a root run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<Uuid>,
    /// Position among siblings sharing `parent_run_id`; assigned by
    /// [`RunOrderTracker`](crate::RunOrderTracker) for manual logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Free-form metadata bag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
    /// Project/session the run is filed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,
}

impl RunCreate {
    /// Create a run payload with the current UTC instant as `start_time`.
    pub fn new(id: Uuid, name: impl Into<String>, run_type: RunType) -> Self {
        Self {
            id,
            name: name.into(),
            run_type,
            start_time: Utc::now(),
            inputs: None,
            parent_run_id: None,
            execution_order: None,
            tags: None,
            extra: None,
            session_name: None,
        }
    }

    /// Set the input payload.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Nest this run beneath a parent.
    #[must_use]
    pub fn with_parent_run_id(mut self, parent_run_id: Uuid) -> Self {
        self.parent_run_id = Some(parent_run_id);
        self
    }

    /// Set the sibling position explicitly.
    #[must_use]
    pub fn with_execution_order(mut self, execution_order: u32) -> Self {
        self.execution_order = Some(execution_order);
        self
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Attach free-form metadata.
    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// File the run under a project/session.
    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// Override the start time (defaults to construction time).
    #[must_use]
    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = start_time;
        self
    }
}

/// Payload for `PATCH /runs/{id}`: closes or annotates an open run.
///
/// The service rejects a PATCH for a run whose `end_time` was already
/// set, so every field here is settable exactly once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunUpdate {
    /// UTC instant the work finished; setting it closes the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Opaque output payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    /// Error description when the work failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Intermediate events observed during the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Value>>,
}

impl RunUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the run at the given instant.
    #[must_use]
    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Set the output payload.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Value) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Record an error description.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attach intermediate events.
    #[must_use]
    pub fn with_events(mut self, events: Vec<Value>) -> Self {
        self.events = Some(events);
        self
    }
}

/// A run as returned by the service (`GET /runs/{id}`).
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub name: String,
    pub run_type: RunType,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_run_id: Option<Uuid>,
    #[serde(default)]
    pub execution_order: Option<u32>,
    #[serde(default)]
    pub inputs: Option<Value>,
    #[serde(default)]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub session_name: Option<String>,
}

impl Run {
    /// Whether the run has been closed (its `end_time` is set).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    // ===== RunType Tests =====

    #[test]
    fn test_run_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RunType::Chain).unwrap(), "\"chain\"");
        assert_eq!(serde_json::to_string(&RunType::Llm).unwrap(), "\"llm\"");
        assert_eq!(serde_json::to_string(&RunType::Tool).unwrap(), "\"tool\"");
    }

    #[test]
    fn test_run_type_deserializes() {
        let rt: RunType = serde_json::from_str("\"prompt\"").unwrap();
        assert_eq!(rt, RunType::Prompt);
    }

    // ===== RunCreate Tests =====

    #[test]
    fn test_run_create_minimal_omits_optional_fields() {
        let run = RunCreate::new(Uuid::new_v4(), "step", RunType::Chain);
        let value = serde_json::to_value(&run).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("id"));
        assert!(obj.contains_key("start_time"));
        assert!(!obj.contains_key("parent_run_id"));
        assert!(!obj.contains_key("execution_order"));
        assert!(!obj.contains_key("inputs"));
        assert!(!obj.contains_key("session_name"));
    }

    #[test]
    fn test_run_create_builders() {
        let parent = Uuid::new_v4();
        let run = RunCreate::new(Uuid::new_v4(), "child", RunType::Llm)
            .with_parent_run_id(parent)
            .with_execution_order(3)
            .with_inputs(json!({"prompt": "hi"}))
            .with_tags(vec!["eval".to_string()])
            .with_session_name("my-project");

        assert_eq!(run.parent_run_id, Some(parent));
        assert_eq!(run.execution_order, Some(3));
        assert_eq!(run.session_name.as_deref(), Some("my-project"));

        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["run_type"], "llm");
        assert_eq!(value["execution_order"], 3);
        assert_eq!(value["inputs"]["prompt"], "hi");
    }

    #[test]
    fn test_run_create_start_time_is_utc_iso8601() {
        let run = RunCreate::new(Uuid::new_v4(), "t", RunType::Tool);
        let value = serde_json::to_value(&run).unwrap();
        let ts = value["start_time"].as_str().unwrap();
        // chrono serializes DateTime<Utc> as RFC 3339 / ISO-8601 with Z offset
        assert!(ts.ends_with('Z') || ts.contains("+00:00"), "got {ts}");
    }

    // ===== RunUpdate Tests =====

    #[test]
    fn test_run_update_empty_serializes_to_empty_object() {
        let update = RunUpdate::new();
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_run_update_builders() {
        let now = Utc::now();
        let update = RunUpdate::new()
            .with_end_time(now)
            .with_outputs(json!({"answer": 42}))
            .with_error("tool timed out");

        let value = serde_json::to_value(&update).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("end_time"));
        assert_eq!(value["outputs"]["answer"], 42);
        assert_eq!(value["error"], "tool timed out");
        assert!(!obj.contains_key("events"));
    }

    // ===== Run Tests =====

    #[test]
    fn test_run_deserializes_with_missing_optionals() {
        let id = Uuid::new_v4();
        let raw = json!({
            "id": id,
            "name": "root",
            "run_type": "chain",
            "start_time": "2026-01-05T12:00:00Z",
        });
        let run: Run = serde_json::from_value(raw).unwrap();
        assert_eq!(run.id, id);
        assert!(run.parent_run_id.is_none());
        assert!(!run.is_closed());
    }

    #[test]
    fn test_run_is_closed() {
        let raw = json!({
            "id": Uuid::new_v4(),
            "name": "done",
            "run_type": "llm",
            "start_time": "2026-01-05T12:00:00Z",
            "end_time": "2026-01-05T12:00:01Z",
            "outputs": {"text": "ok"},
        });
        let run: Run = serde_json::from_value(raw).unwrap();
        assert!(run.is_closed());
        assert_eq!(run.outputs.unwrap()["text"], "ok");
    }
}
