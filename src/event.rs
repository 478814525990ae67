//! Structured operation events
//!
//! Every path operation and template stage emits an [`Event`] describing what
//! happened. Where those events go is the sink's business:
//! - [`TracingSink`] forwards them to `tracing` (the default)
//! - [`MemorySink`] appends them to a queryable in-memory log (tests, audits)

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operation that produced the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOp {
    Get,
    Set,
    Has,
    Remove,
    Fallback,
    Transform,
    Render,
    Warn,
    Error,
}

impl EventOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOp::Get => "get",
            EventOp::Set => "set",
            EventOp::Has => "has",
            EventOp::Remove => "remove",
            EventOp::Fallback => "fallback",
            EventOp::Transform => "transform",
            EventOp::Render => "render",
            EventOp::Warn => "warn",
            EventOp::Error => "error",
        }
    }
}

/// Which half of the crate emitted the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Props,
    Template,
}

impl Module {
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Props => "props",
            Module::Template => "template",
        }
    }
}

/// Single structured event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Operation kind
    pub op: EventOp,
    /// Path the operation worked on (template source for render events)
    pub path: String,
    /// Resolved, written, or produced value, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Failure message for warn/error events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Emitting module
    pub module: Module,
    /// Wall-clock time (ms since Unix epoch)
    pub timestamp_ms: u64,
}

impl Event {
    pub fn new(op: EventOp, module: Module, path: impl Into<String>) -> Self {
        Self {
            op,
            path: path.into(),
            value: None,
            error: None,
            module,
            timestamp_ms: now_ms(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Receives structured events from the path and template APIs
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Default sink: forwards events to `tracing` at a level matching the op
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: Event) {
        let op = event.op.as_str();
        let module = event.module.as_str();
        match event.op {
            EventOp::Error => tracing::error!(
                target: "dotprops",
                module,
                op,
                path = %event.path,
                error = event.error.as_deref().unwrap_or(""),
                "operation failed"
            ),
            EventOp::Warn => tracing::warn!(
                target: "dotprops",
                module,
                op,
                path = %event.path,
                detail = event.error.as_deref().unwrap_or(""),
                "operation warning"
            ),
            _ => tracing::debug!(
                target: "dotprops",
                module,
                op,
                path = %event.path,
                "operation"
            ),
        }
    }
}

/// Thread-safe, append-only in-memory sink
///
/// Clones share the same underlying log, so a test can hand one clone to a
/// resolver and keep another for assertions.
#[derive(Clone)]
pub struct MemorySink {
    events: Arc<RwLock<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Filter events by operation
    pub fn filter_op(&self, op: EventOp) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.op == op)
            .collect()
    }

    /// Filter events by emitting module
    pub fn filter_module(&self, module: Module) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.module == module)
            .collect()
    }

    /// Serialize to JSON for persistence/debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.events.write().push(event);
    }
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink").field("len", &self.len()).finish()
    }
}
