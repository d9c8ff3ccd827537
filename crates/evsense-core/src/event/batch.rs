// Evsense Batch Event Collection
// Bounded per-tick collector handed to the context as its event sink

use crate::event::{EventSink, InputEvent};

/// Events produced during one processing tick.
///
/// Capacity is bounded; once full, further events are counted and dropped
/// so a chattering device cannot grow the queue without limit.
#[derive(Debug, Clone)]
pub struct EventBatch {
    events: Vec<InputEvent>,
    limit: usize,
    dropped: usize,
}

impl EventBatch {
    /// Create a new empty batch
    pub fn new() -> Self {
        Self::with_limit(batch_config::DEFAULT_LIMIT)
    }

    /// Create a batch that holds at most `limit` events
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.clamp(1, batch_config::MAX_BATCH_SIZE);
        Self {
            events: Vec::with_capacity(limit.min(batch_config::DEFAULT_LIMIT)),
            limit,
            dropped: 0,
        }
    }

    /// Get the number of events in the batch
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events refused since the last drain
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[InputEvent] {
        &self.events
    }

    /// Take every collected event and reset the drop counter
    pub fn drain(&mut self) -> std::vec::Drain<'_, InputEvent> {
        self.dropped = 0;
        self.events.drain(..)
    }
}

impl Default for EventBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBatch {
    fn push_event(&mut self, event: InputEvent) {
        if self.events.len() < self.limit {
            self.events.push(event);
        } else {
            self.dropped += 1;
        }
    }
}

impl AsRef<[InputEvent]> for EventBatch {
    fn as_ref(&self) -> &[InputEvent] {
        &self.events
    }
}

/// Batch size configuration
pub mod batch_config {
    /// Default number of events collected per tick
    pub const DEFAULT_LIMIT: usize = 256;

    /// Upper bound on any batch limit
    pub const MAX_BATCH_SIZE: usize = 4096;
}
