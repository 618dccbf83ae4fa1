pub mod batch;
pub mod decode;
pub mod repair;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::batch::{EventBatch, batch_events};
    pub use crate::decode::decode;
    pub use crate::repair::{brace_depth_repair, pattern_repair, split_objects};
}
