use serde::{Deserialize, Serialize};

/// How a raw chunk of concatenated event objects is turned into a JSON array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Insert a comma wherever `}` is followed by an object starting with
    /// the `"event"` key, then wrap in brackets.
    Pattern,
    /// Split top-level objects by tracking brace depth, ignoring braces
    /// inside string literals.
    BraceDepth,
    /// Try [`RepairStrategy::Pattern`] first, fall back to
    /// [`RepairStrategy::BraceDepth`].
    #[default]
    Auto,
}

impl std::fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::BraceDepth => write!(f, "brace_depth"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for RepairStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pattern" => Ok(Self::Pattern),
            "brace_depth" => Ok(Self::BraceDepth),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown repair strategy: '{other}'")),
        }
    }
}

pub const DEFAULT_FINISHED_TEXT: &str = "Finished";

/// Configuration for decoding a stream and folding it into progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Repair strategy applied to each raw chunk.
    #[serde(default)]
    pub repair: RepairStrategy,

    /// Status text set when the top-level node ends.
    #[serde(default = "default_finished_text")]
    pub finished_text: String,
}

fn default_finished_text() -> String {
    DEFAULT_FINISHED_TEXT.to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            repair: RepairStrategy::default(),
            finished_text: default_finished_text(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repair(mut self, repair: RepairStrategy) -> Self {
        self.repair = repair;
        self
    }

    pub fn with_finished_text(mut self, text: impl Into<String>) -> Self {
        self.finished_text = text.into();
        self
    }
}
