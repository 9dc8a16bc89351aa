//! Manager resource types.
//!
//! Executions are decoded into typed structs. Events are kept as the raw JSON
//! object the manager returned, with typed accessors on top, so that
//! re-serializing an event reproduces every field the manager sent.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Executions
// ============================================================================

/// Opaque identifier of a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Wrap a manager-assigned execution id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ExecutionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    /// Running.
    Started,
    /// Cancellation requested.
    Cancelling,
    /// Forced cancellation requested.
    ForceCancelling,
    /// Stopped by a cancel request.
    Cancelled,
    /// Finished successfully.
    Terminated,
    /// Finished with an error.
    Failed,
    /// A status this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    /// Statuses after which the execution never changes again.
    pub const TERMINAL: [Self; 3] = [Self::Terminated, Self::Failed, Self::Cancelled];

    /// Whether the execution has reached an end state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Cancelling => "cancelling",
            Self::ForceCancelling => "force_cancelling",
            Self::Cancelled => "cancelled",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A workflow run on the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution id.
    pub id: ExecutionId,
    /// Name of the workflow being run.
    pub workflow_id: String,
    /// Deployment the workflow runs against.
    #[serde(default)]
    pub deployment_id: String,
    /// Blueprint the deployment was created from.
    #[serde(default)]
    pub blueprint_id: String,
    /// Current status.
    pub status: ExecutionStatus,
    /// Error text, present only for failed executions.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub error: Option<String>,
    /// Creation timestamp as reported by the manager.
    #[serde(default)]
    pub created_at: String,
    /// Workflow parameters the execution was started with.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl Execution {
    /// Create an execution record in the given status.
    #[must_use]
    pub fn new(
        id: impl Into<ExecutionId>,
        workflow_id: impl Into<String>,
        deployment_id: impl Into<String>,
        status: ExecutionStatus,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_id: workflow_id.into(),
            deployment_id: deployment_id.into(),
            blueprint_id: String::new(),
            status,
            error: None,
            created_at: String::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Set the error text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// The manager reports "no error" as an empty string.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Body of a start-execution request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteRequest {
    /// Target deployment.
    pub deployment_id: String,
    /// Workflow to run.
    pub workflow_id: String,
    /// Workflow parameters.
    pub parameters: BTreeMap<String, Value>,
    /// Accept parameters the workflow does not declare.
    pub allow_custom_parameters: bool,
    /// Start even if another execution is running on the deployment.
    pub force: bool,
}

impl ExecuteRequest {
    /// Request to run `workflow_id` on `deployment_id` with no parameters.
    #[must_use]
    pub fn new(deployment_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            workflow_id: workflow_id.into(),
            parameters: BTreeMap::new(),
            allow_custom_parameters: false,
            force: false,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Wire value of the `type` field for lifecycle events.
pub const EVENT_TYPE_EVENT: &str = "cloudify_event";

/// Wire value of the `type` field for log records.
pub const EVENT_TYPE_LOG: &str = "cloudify_log";

/// Kind of an event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Lifecycle event (task started, workflow succeeded, ...).
    Event,
    /// Log line emitted by an operation.
    Log,
}

/// One event or log record of an execution, exactly as the manager sent it.
///
/// Both the flat layout (`node_name`, `operation` at top level) and the
/// older nested layout (`context.node_id`, `message.text`) are understood.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    raw: Map<String, Value>,
}

impl Event {
    /// Lifecycle event with the given `event_type` and message.
    #[must_use]
    pub fn lifecycle(event_type: &str, message: &str) -> Self {
        Self::default()
            .with_field("type", EVENT_TYPE_EVENT)
            .with_field("event_type", event_type)
            .with_field("message", message)
    }

    /// Log record with the given level and message.
    #[must_use]
    pub fn log(level: &str, message: &str) -> Self {
        Self::default()
            .with_field("type", EVENT_TYPE_LOG)
            .with_field("level", level)
            .with_field("message", message)
    }

    /// Set a top-level field.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.raw.insert(key.to_owned(), value.into());
        self
    }

    /// The raw JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Whether this is a log record or a lifecycle event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self.str_field("type") {
            Some(EVENT_TYPE_LOG) => EventKind::Log,
            Some(_) => EventKind::Event,
            None if self.level().is_some() && self.event_type().is_none() => EventKind::Log,
            None => EventKind::Event,
        }
    }

    /// Timestamp string as reported by the manager.
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.str_field("timestamp")
            .or_else(|| self.str_field("reported_timestamp"))
            .or_else(|| self.str_field("@timestamp"))
    }

    /// Log level, for log records.
    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.str_field("level")
            .or_else(|| self.nested_str("logger", "level"))
    }

    /// Lifecycle event type, for events.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.str_field("event_type")
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
            .or_else(|| self.nested_str("message", "text"))
    }

    /// Deployment the event belongs to.
    #[must_use]
    pub fn deployment_id(&self) -> Option<&str> {
        self.context_str("deployment_id")
    }

    /// Execution the event belongs to.
    #[must_use]
    pub fn execution_id(&self) -> Option<&str> {
        self.context_str("execution_id")
    }

    /// Node instance the operation ran on.
    #[must_use]
    pub fn node_instance_id(&self) -> Option<&str> {
        self.context_str("node_instance_id")
            .or_else(|| self.context_str("node_id"))
    }

    /// Node name the operation ran on.
    #[must_use]
    pub fn node_name(&self) -> Option<&str> {
        self.context_str("node_name")
            .or_else(|| self.node_instance_id())
    }

    /// Fully qualified operation name.
    #[must_use]
    pub fn operation(&self) -> Option<&str> {
        self.context_str("operation")
    }

    /// Source node of a relationship operation.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        self.context_str("source_id")
    }

    /// Target node of a relationship operation.
    #[must_use]
    pub fn target_id(&self) -> Option<&str> {
        self.context_str("target_id")
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }

    fn nested_str(&self, outer: &str, inner: &str) -> Option<&str> {
        self.raw.get(outer)?.get(inner)?.as_str()
    }

    fn context_str(&self, key: &str) -> Option<&str> {
        self.str_field(key)
            .or_else(|| self.nested_str("context", key))
    }
}

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventPage {
    /// Events on this page, in sequence order.
    pub items: Vec<Event>,
    /// Total number of events the manager reports for the query.
    pub total: u64,
}

// ============================================================================
// Wire envelopes
// ============================================================================

/// Paged listing envelope: `{"items": [...], "metadata": {"pagination": {...}}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListResponse<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Metadata {
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub total: u64,
}

/// Body of an execution action request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExecutionAction {
    pub action: &'static str,
}
