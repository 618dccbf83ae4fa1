pub mod config;
pub mod error;
pub mod event;
pub mod registry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{RepairStrategy, StreamConfig};
    pub use crate::error::{DecodeError, RegistryError, Result, TrellisError};
    pub use crate::event::{EventKind, EventRecord, WireEvent};
    pub use crate::registry::{NodeMetadata, NodeRegistry};
}
