use std::sync::Arc;

use trellis_core::config::StreamConfig;
use trellis_core::event::{EventKind, EventRecord};
use trellis_core::registry::NodeRegistry;
use trellis_stream::batch::{EventBatch, batch_events};

use crate::snapshot::{CompletedNode, ProgressSnapshot};

/// Fold one event into `state`.
///
/// Chain events only act on registered emitters. Stream events are
/// attributed to the active node rather than to their own emitter (which is
/// usually the model, not a graph node) and are ignored while no node is
/// active.
pub fn fold_event(
    state: &mut ProgressSnapshot,
    event: &EventRecord,
    registry: &NodeRegistry,
    config: &StreamConfig,
) {
    match event.kind {
        EventKind::ChainStart => {
            let Some(meta) = registry.get(&event.name) else {
                return;
            };
            state.active_node = Some(event.name.clone());
            state.running = true;
            state.visible = true;
            state.status_text = Some(meta.display_text.clone());
        }
        EventKind::ChainEnd => {
            let Some(meta) = registry.get(&event.name) else {
                return;
            };
            if meta.is_top_level {
                state.running = false;
                state.visible = false;
                state.status_text = Some(config.finished_text.clone());
            } else {
                let message = state.content_of(&event.name).to_string();
                state.completed.push(CompletedNode {
                    node: event.name.clone(),
                    label: meta.label(&event.name).to_string(),
                    message,
                });
            }
        }
        EventKind::ModelStream => {
            let Some(active) = state.active_node.clone() else {
                return;
            };
            state.append_content(&active, &event.content);
            if registry.is_final_output(&active) {
                state.append_final_output(&event.content);
                state.visible = false;
            }
        }
        EventKind::Other(_) => {}
    }
}

/// True if `event` ends the registered top-level node.
fn ends_graph(event: &EventRecord, registry: &NodeRegistry) -> bool {
    event.kind == EventKind::ChainEnd && registry.is_top_level(&event.name)
}

/// Summary of folding one chunk's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Number of batches folded (and snapshots published for them).
    pub batches: usize,
    /// Whether the chunk ended the top-level node and reset progress.
    pub completed: bool,
}

/// Owns the progress snapshot and folds decoded events into it.
///
/// Every fold produces a new snapshot; previously handed-out snapshots are
/// never mutated.
#[derive(Debug, Clone, Default)]
pub struct ProgressStateMachine {
    config: StreamConfig,
    snapshot: Arc<ProgressSnapshot>,
}

impl ProgressStateMachine {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            snapshot: Arc::default(),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &Arc<ProgressSnapshot> {
        &self.snapshot
    }

    /// Return to the initial snapshot.
    pub fn reset(&mut self) -> Arc<ProgressSnapshot> {
        self.snapshot = Arc::default();
        Arc::clone(&self.snapshot)
    }

    /// Fold a whole batch into a fresh copy of the current snapshot.
    pub fn fold_batch(&mut self, batch: &EventBatch, registry: &NodeRegistry) -> Arc<ProgressSnapshot> {
        let mut next = ProgressSnapshot::clone(&self.snapshot);
        for event in batch {
            fold_event(&mut next, event, registry, &self.config);
        }
        self.snapshot = Arc::new(next);
        Arc::clone(&self.snapshot)
    }

    /// Batch and fold one chunk's records, calling `publish` with the
    /// snapshot after each batch.
    ///
    /// If any record ends the top-level node, progress is reset once after
    /// every batch has been folded, and the reset snapshot is published too.
    pub fn process(
        &mut self,
        records: Vec<EventRecord>,
        registry: &NodeRegistry,
        mut publish: impl FnMut(Arc<ProgressSnapshot>),
    ) -> ChunkOutcome {
        let completed = records.iter().any(|event| ends_graph(event, registry));
        let batches = batch_events(records);

        for batch in &batches {
            tracing::trace!(run_id = batch.run_id(), events = batch.events().len(), "folding batch");
            publish(self.fold_batch(batch, registry));
        }

        if completed {
            tracing::debug!("top-level node ended, resetting progress");
            publish(self.reset());
        }

        ChunkOutcome {
            batches: batches.len(),
            completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::registry::NodeMetadata;

    const GRAPH: &str = "Product Vision Graph";

    fn registry() -> NodeRegistry {
        NodeRegistry::new()
            .with_node(GRAPH, NodeMetadata::new("Analyzing your message").top_level())
            .with_node(
                "extract",
                NodeMetadata::new("Extracting objectives").with_formatted_name("Objectives"),
            )
            .with_node(
                "rewriter",
                NodeMetadata::new("Rewriting the vision").final_output(),
            )
    }

    fn fold_all(events: &[EventRecord]) -> ProgressSnapshot {
        let registry = registry();
        let config = StreamConfig::default();
        let mut state = ProgressSnapshot::default();
        for event in events {
            fold_event(&mut state, event, &registry, &config);
        }
        state
    }

    #[test]
    fn chain_start_activates_node() {
        let state = fold_all(&[EventRecord::chain_start("r1", "extract")]);
        assert_eq!(state.active_node.as_deref(), Some("extract"));
        assert!(state.running);
        assert!(state.visible);
        assert_eq!(state.status_text.as_deref(), Some("Extracting objectives"));
    }

    #[test]
    fn stream_accumulates_on_active_node() {
        let state = fold_all(&[
            EventRecord::chain_start("r1", "extract"),
            EventRecord::model_stream("r2", "ChatOpenAI", "Hel"),
            EventRecord::model_stream("r2", "ChatOpenAI", "lo"),
        ]);
        assert_eq!(state.content_of("extract"), "Hello");
        assert!(!state.node_content.contains_key("ChatOpenAI"));
        assert!(state.final_output.is_none());
        assert!(state.visible);
    }

    #[test]
    fn stream_without_active_node_is_ignored() {
        let state = fold_all(&[EventRecord::model_stream("r2", "ChatOpenAI", "x")]);
        assert!(state.is_initial());
    }

    #[test]
    fn final_output_node_streams_to_final_output() {
        let state = fold_all(&[
            EventRecord::chain_start("r1", "rewriter"),
            EventRecord::model_stream("r2", "ChatOpenAI", "Our "),
            EventRecord::model_stream("r2", "ChatOpenAI", "vision"),
        ]);
        assert_eq!(state.final_output.as_deref(), Some("Our vision"));
        assert_eq!(state.content_of("rewriter"), "Our vision");
        assert!(!state.visible);
        assert!(state.running);
    }

    #[test]
    fn sub_node_end_logs_completion() {
        let state = fold_all(&[
            EventRecord::chain_start("r1", "extract"),
            EventRecord::model_stream("r2", "llm", "goals"),
            EventRecord::chain_end("r1", "extract"),
            EventRecord::chain_start("r3", "rewriter"),
            EventRecord::chain_end("r3", "rewriter"),
        ]);
        assert_eq!(
            state.completed,
            vec![
                CompletedNode {
                    node: "extract".into(),
                    label: "Objectives".into(),
                    message: "goals".into(),
                },
                CompletedNode {
                    node: "rewriter".into(),
                    label: "rewriter".into(),
                    message: String::new(),
                },
            ]
        );
        // Ending a node does not clear the active node.
        assert_eq!(state.active_node.as_deref(), Some("rewriter"));
    }

    #[test]
    fn top_level_end_finishes_without_clearing() {
        let state = fold_all(&[
            EventRecord::chain_start("g", GRAPH),
            EventRecord::chain_start("r1", "extract"),
            EventRecord::model_stream("r2", "llm", "x"),
            EventRecord::chain_end("g", GRAPH),
        ]);
        assert!(!state.running);
        assert!(!state.visible);
        assert_eq!(state.status_text.as_deref(), Some("Finished"));
        assert_eq!(state.content_of("extract"), "x");
        assert!(state.completed.is_empty());
    }

    #[test]
    fn finished_text_is_configurable() {
        let mut state = ProgressSnapshot::default();
        let config = StreamConfig::new().with_finished_text("Done");
        fold_event(&mut state, &EventRecord::chain_end("g", GRAPH), &registry(), &config);
        assert_eq!(state.status_text.as_deref(), Some("Done"));
    }

    #[test]
    fn unregistered_chain_events_are_noops() {
        let state = fold_all(&[
            EventRecord::chain_start("r1", "RunnableSequence"),
            EventRecord::chain_end("r1", "RunnableSequence"),
            EventRecord::new(EventKind::Other("on_tool_start".into()), "r1", "extract"),
        ]);
        assert!(state.is_initial());
    }

    #[test]
    fn fold_batch_does_not_touch_published_snapshot() {
        let registry = registry();
        let mut machine = ProgressStateMachine::default();
        let before = Arc::clone(machine.snapshot());
        let batches = batch_events(vec![EventRecord::chain_start("r1", "extract")]);
        let after = machine.fold_batch(&batches[0], &registry);
        assert!(before.is_initial());
        assert_eq!(after.active_node.as_deref(), Some("extract"));
    }

    #[test]
    fn process_publishes_once_per_batch() {
        let registry = registry();
        let mut machine = ProgressStateMachine::default();
        let mut published = Vec::new();
        let outcome = machine.process(
            vec![
                EventRecord::chain_start("g", GRAPH),
                EventRecord::chain_start("r1", "extract"),
                EventRecord::model_stream("r1", "llm", "a"),
                EventRecord::chain_start("g", "untracked"),
            ],
            &registry,
            |s| published.push(s),
        );
        assert_eq!(outcome, ChunkOutcome { batches: 3, completed: false });
        assert_eq!(published.len(), 3);
        // The second batch is published whole: node switch and content together.
        assert_eq!(published[1].active_node.as_deref(), Some("extract"));
        assert_eq!(published[1].content_of("extract"), "a");
        assert_eq!(published[1].status_text.as_deref(), Some("Extracting objectives"));
    }

    #[test]
    fn process_resets_after_whole_chunk() {
        let registry = registry();
        let mut machine = ProgressStateMachine::default();
        let mut published = Vec::new();
        let outcome = machine.process(
            vec![
                EventRecord::chain_start("g", GRAPH),
                EventRecord::chain_end("g", GRAPH),
                EventRecord::chain_start("r1", "extract"),
                EventRecord::chain_end("r1", "extract"),
            ],
            &registry,
            |s| published.push(s),
        );
        assert!(outcome.completed);
        assert_eq!(outcome.batches, 2);
        // The sub-node completion after the graph end is still folded ...
        assert_eq!(published[1].completed.len(), 1);
        // ... and the final publish is the initial snapshot.
        assert!(published.last().unwrap().is_initial());
        assert!(machine.snapshot().is_initial());
    }

    #[test]
    fn reset_returns_initial_snapshot() {
        let registry = registry();
        let mut machine = ProgressStateMachine::new(StreamConfig::default());
        machine.process(vec![EventRecord::chain_start("r1", "extract")], &registry, |_| {});
        assert!(!machine.snapshot().is_initial());
        assert!(machine.reset().is_initial());
    }
}
