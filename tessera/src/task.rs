//! Asynchronous server-side tasks: submissions, records, and outcomes.
//!
//! A task is submitted as `{operation, filter, spatial, extras}`, runs
//! server-side through the states `started`, `success` or `failure`, and on
//! success leaves result records whose `tag` field carries a JSON-encoded
//! payload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Result, TesseraError};

/// Filter selecting the data a task operates on.
///
/// The wire form is a map of `<path>__<op>` keys. Constructors cover the
/// lookups the API documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TaskFilter(Map<String, Value>);

impl TaskFilter {
    /// Select everything in one layer.
    pub fn layer(uuid: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("layer__uuid__exact".to_string(), Value::String(uuid.into()));
        Self(map)
    }
}

/// One asynchronous operation to submit.
#[derive(Debug, Clone, Default)]
pub struct Task {
    pub operation: String,
    pub filter: TaskFilter,
    pub spatial: Map<String, Value>,
    pub extras: Map<String, Value>,
}

impl Task {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set one spatial parameter, e.g. a reference geometry.
    pub fn with_spatial(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spatial.insert(key.into(), value.into());
        self
    }

    /// Set one operation-specific extra parameter.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Render the submission body entry for this task. Unset parts are sent
    /// as empty objects, not omitted.
    pub(crate) fn to_wire(&self) -> Value {
        json!({
            "operation": self.operation,
            "filter": self.filter,
            "spatial": self.spatial,
            "extras": self.extras,
        })
    }
}

/// Lifecycle state reported for a task or an uploaded blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Started,
    Success,
    Failure,
}

/// A task as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    pub operation: String,
    #[serde(default)]
    pub task_filter: Value,
    #[serde(default)]
    pub spatial: Value,
    pub uri: String,
    pub uuid: String,
    pub state: TaskState,
    #[serde(default)]
    pub extras: Value,
    #[serde(default)]
    pub reason: Option<String>,
    pub date_created: i64,
    pub date_modified: i64,
}

/// One stored result of a successful task. `tag` is a JSON-encoded payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResult {
    pub uuid: String,
    pub uri: String,
    pub tag: String,
    pub date_created: i64,
    pub date_modified: i64,
}

/// Terminal outcome of one submitted task.
///
/// Serializes as either the list of decoded result payloads or as
/// `{"error": <reason>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskOutcome {
    /// Decoded result payloads, one per stored result record.
    Completed(Vec<Value>),
    /// The failure reason reported by the server.
    Failed { error: String },
}

/// How the poller treats API errors while waiting for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPolicy {
    /// Stop polling on an API error; tasks not yet resolved stay `None`.
    #[default]
    BestEffort,
    /// Propagate the first API error to the caller.
    Strict,
}

/// Extract the result records from one results page.
pub(crate) fn parse_results_page(mut page: Value) -> Result<Vec<TaskResult>> {
    let results = page
        .get_mut("results")
        .map(Value::take)
        .ok_or_else(|| TesseraError::Response("results page without a results key".to_string()))?;
    serde_json::from_value(results).map_err(Into::into)
}
