pub mod machine;
pub mod observer;
pub mod snapshot;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::machine::{ChunkOutcome, ProgressStateMachine, fold_event};
    pub use crate::observer::{GraphStream, IngestReport};
    pub use crate::snapshot::{CompletedNode, ProgressSnapshot};
}
