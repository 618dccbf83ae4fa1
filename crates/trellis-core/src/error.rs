use thiserror::Error;

/// Top-level error type for the Trellis library.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure to recover event objects from a raw chunk.
///
/// These never escape the ingest pipeline; they are logged and the chunk
/// is treated as carrying no events.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed chunk: {detail}")]
    Malformed { detail: String },

    #[error("Unbalanced object starting at byte {offset}")]
    UnbalancedObject { offset: usize },

    #[error("Unexpected text outside an object at byte {offset}")]
    UnexpectedText { offset: usize },

    #[error("Decoded document is not an array of events")]
    NotAnArray,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Registry JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Node '{node}' has an empty display text")]
    EmptyDisplayText { node: String },
}

pub type Result<T> = std::result::Result<T, TrellisError>;
