use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node that finished, with the content it streamed while active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedNode {
    pub node: String,
    /// Display label: the node's formatted name, or its emitter name.
    pub label: String,
    pub message: String,
}

/// Progress of one graph execution, as presented to the user.
///
/// `Default` is the initial state, and the state the machine returns to once
/// the top-level node ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Emitter currently executing.
    pub active_node: Option<String>,
    /// Accumulated streamed content per emitter. Append-only until reset.
    pub node_content: BTreeMap<String, String>,
    /// Non-top-level nodes in completion order.
    pub completed: Vec<CompletedNode>,
    /// True from the first registered start until the top-level node ends.
    pub running: bool,
    /// Whether intermediate progress text should be shown.
    pub visible: bool,
    pub status_text: Option<String>,
    /// Streamed content of the final-output node.
    pub final_output: Option<String>,
}

impl ProgressSnapshot {
    /// Content streamed so far by `node`, or `""`.
    pub fn content_of(&self, node: &str) -> &str {
        self.node_content.get(node).map_or("", String::as_str)
    }

    /// True if this snapshot equals the initial state.
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn append_content(&mut self, node: &str, fragment: &str) {
        match self.node_content.get_mut(node) {
            Some(content) => content.push_str(fragment),
            None => {
                self.node_content.insert(node.to_string(), fragment.to_string());
            }
        }
    }

    pub(crate) fn append_final_output(&mut self, fragment: &str) {
        self.final_output
            .get_or_insert_with(String::new)
            .push_str(fragment);
    }
}
