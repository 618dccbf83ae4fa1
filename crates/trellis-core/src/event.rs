use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Kind of a graph engine event.
///
/// Only three kinds drive progress; every other wire name is carried through
/// as [`EventKind::Other`] so that unknown events never fail decoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A node (or the whole graph) began executing.
    ChainStart,
    /// A node (or the whole graph) finished executing.
    ChainEnd,
    /// A model emitted a streamed content fragment.
    ModelStream,
    /// Any other event name, kept verbatim.
    Other(String),
}

impl EventKind {
    pub const CHAIN_START: &'static str = "on_chain_start";
    pub const CHAIN_END: &'static str = "on_chain_end";
    pub const MODEL_STREAM: &'static str = "on_chat_model_stream";

    /// Map a wire event name onto a kind.
    pub fn from_wire(name: &str) -> Self {
        match name {
            Self::CHAIN_START => Self::ChainStart,
            Self::CHAIN_END => Self::ChainEnd,
            Self::MODEL_STREAM => Self::ModelStream,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire event name for this kind.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::ChainStart => Self::CHAIN_START,
            Self::ChainEnd => Self::CHAIN_END,
            Self::ModelStream => Self::MODEL_STREAM,
            Self::Other(name) => name.as_str(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One event observed on the stream, reduced to the fields progress
/// tracking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub kind: EventKind,
    /// Correlation id. Only used to group events into batches.
    pub run_id: String,
    /// Emitter name, looked up in the node registry.
    pub name: String,
    /// Streamed content fragment; empty when the event carries none.
    pub content: String,
}

impl EventRecord {
    pub fn new(kind: EventKind, run_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            run_id: run_id.into(),
            name: name.into(),
            content: String::new(),
        }
    }

    pub fn chain_start(run_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(EventKind::ChainStart, run_id, name)
    }

    pub fn chain_end(run_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(EventKind::ChainEnd, run_id, name)
    }

    pub fn model_stream(
        run_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::ModelStream, run_id, name).with_content(content)
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Extract a record from one decoded JSON value.
    ///
    /// Returns `None` when the value has no string `run_id`, since such an
    /// event cannot be batched. Missing `event` or `name` fields degrade to
    /// empty strings and a non-string content fragment becomes empty.
    pub fn from_json(value: &Value) -> Option<Self> {
        let run_id = value.get("run_id")?.as_str()?;
        let kind = EventKind::from_wire(value.get("event").and_then(Value::as_str).unwrap_or(""));
        let name = value.get("name").and_then(Value::as_str).unwrap_or("");
        let content = value
            .pointer("/data/chunk/kwargs/content")
            .and_then(Value::as_str)
            .unwrap_or("");
        Some(Self {
            kind,
            run_id: run_id.to_string(),
            name: name.to_string(),
            content: content.to_string(),
        })
    }

    /// Convert back to the engine's wire shape.
    pub fn to_wire(&self) -> WireEvent {
        let data = (self.kind == EventKind::ModelStream || !self.content.is_empty())
            .then(|| json!({ "chunk": { "kwargs": { "content": self.content } } }));
        WireEvent {
            event: self.kind.as_wire().to_string(),
            run_id: self.run_id.clone(),
            name: self.name.clone(),
            data,
        }
    }
}

/// Event object exactly as the graph engine writes it to the stream:
/// `{event, run_id, name, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub event: String,
    pub run_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&EventRecord> for WireEvent {
    fn from(record: &EventRecord) -> Self {
        record.to_wire()
    }
}
