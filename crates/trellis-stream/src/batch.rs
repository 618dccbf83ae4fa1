use trellis_core::event::EventRecord;

/// A maximal run of consecutive events sharing one `run_id`.
///
/// Never empty. Batches are folded atomically so that a node transition
/// carried by several events is observed all at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    events: Vec<EventRecord>,
}

impl EventBatch {
    fn new(first: EventRecord) -> Self {
        Self {
            events: vec![first],
        }
    }

    /// The correlation id shared by every event in the batch.
    pub fn run_id(&self) -> &str {
        &self.events[0].run_id
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventRecord> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<EventRecord> {
        self.events
    }

    fn accepts(&self, record: &EventRecord) -> bool {
        self.events
            .last()
            .is_some_and(|last| last.run_id == record.run_id)
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Group records into batches of consecutive equal `run_id`s.
///
/// Single pass, order preserving. Runs of the same id separated by another
/// id stay separate batches.
pub fn batch_events(records: impl IntoIterator<Item = EventRecord>) -> Vec<EventBatch> {
    let mut batches = Vec::new();
    let mut open: Option<EventBatch> = None;

    for record in records {
        if let Some(batch) = open.as_mut().filter(|b| b.accepts(&record)) {
            batch.events.push(record);
            continue;
        }
        if let Some(done) = open.replace(EventBatch::new(record)) {
            batches.push(done);
        }
    }

    batches.extend(open);
    batches
}
