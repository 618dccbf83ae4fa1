//! Caller-facing interface: feed raw chunks in, read or subscribe to
//! progress snapshots.

use std::convert::Infallible;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use trellis_core::config::StreamConfig;
use trellis_core::registry::NodeRegistry;
use trellis_stream::decode::decode;

use crate::machine::ProgressStateMachine;
use crate::snapshot::ProgressSnapshot;

/// What happened while ingesting one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records decoded from the chunk.
    pub records: usize,
    /// Batches folded.
    pub batches: usize,
    /// The chunk ended the top-level node and progress was reset.
    pub completed: bool,
    /// The chunk could not be decoded and was skipped.
    pub decode_failed: bool,
}

/// Progress view of one graph stream.
///
/// Each ingested chunk runs decode, batch and fold to completion before
/// returning. Subscribers receive an immutable snapshot after every batch;
/// a snapshot, once published, never changes.
#[derive(Debug)]
pub struct GraphStream {
    machine: ProgressStateMachine,
    tx: watch::Sender<Arc<ProgressSnapshot>>,
}

impl GraphStream {
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default())
    }

    pub fn with_config(config: StreamConfig) -> Self {
        let machine = ProgressStateMachine::new(config);
        let (tx, _rx) = watch::channel(Arc::clone(machine.snapshot()));
        Self { machine, tx }
    }

    pub fn config(&self) -> &StreamConfig {
        self.machine.config()
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<ProgressSnapshot> {
        Arc::clone(self.machine.snapshot())
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ProgressSnapshot>> {
        self.tx.subscribe()
    }

    /// Start over with the initial snapshot, e.g. before a new stream.
    pub fn reset(&mut self) {
        let snapshot = self.machine.reset();
        self.tx.send_replace(snapshot);
    }

    /// Decode one raw chunk and fold its events into progress.
    ///
    /// Never fails: an undecodable chunk is logged and leaves progress as it
    /// was.
    pub fn ingest(&mut self, chunk: &str, registry: &NodeRegistry) -> IngestReport {
        let records = match decode(chunk, self.machine.config().repair) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    strategy = %self.machine.config().repair,
                    chunk_len = chunk.len(),
                    "failed to decode stream chunk"
                );
                tracing::debug!(chunk, "undecodable chunk");
                return IngestReport {
                    decode_failed: true,
                    ..IngestReport::default()
                };
            }
        };

        let count = records.len();
        let tx = &self.tx;
        let outcome = self.machine.process(records, registry, |snapshot| {
            tx.send_replace(snapshot);
        });

        if outcome.completed {
            tracing::info!(events = count, "graph finished");
        }
        tracing::debug!(events = count, batches = outcome.batches, "ingested chunk");

        IngestReport {
            records: count,
            batches: outcome.batches,
            completed: outcome.completed,
            decode_failed: false,
        }
    }

    /// A chunk callback bound to `registry`, for sources that push chunks.
    pub fn on_chunk<'a>(&'a mut self, registry: &'a NodeRegistry) -> impl FnMut(&str) + 'a {
        move |chunk| {
            self.ingest(chunk, registry);
        }
    }

    /// Ingest every chunk of `chunks` in order until the source ends.
    ///
    /// Returns the number of chunks ingested.
    pub async fn drive<S>(&mut self, chunks: S, registry: &NodeRegistry) -> usize
    where
        S: Stream<Item = String>,
    {
        let result = self
            .drive_with(chunks, registry, |_, _, _| Ok::<(), Infallible>(()))
            .await;
        match result {
            Ok(count) => count,
            Err(never) => match never {},
        }
    }

    /// Like [`GraphStream::drive`], calling `on_ingested` after each chunk
    /// with its index, its report and the snapshot it left behind.
    ///
    /// Stops at the first error returned by `on_ingested`.
    pub async fn drive_with<S, F, E>(
        &mut self,
        chunks: S,
        registry: &NodeRegistry,
        mut on_ingested: F,
    ) -> Result<usize, E>
    where
        S: Stream<Item = String>,
        F: FnMut(usize, IngestReport, &ProgressSnapshot) -> Result<(), E>,
    {
        let mut chunks = std::pin::pin!(chunks);
        let mut count = 0;
        while let Some(chunk) = chunks.next().await {
            let report = self.ingest(&chunk, registry);
            on_ingested(count, report, self.machine.snapshot().as_ref())?;
            count += 1;
        }
        Ok(count)
    }
}

impl Default for GraphStream {
    fn default() -> Self {
        Self::new()
    }
}
