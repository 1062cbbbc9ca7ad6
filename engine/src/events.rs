//! Engine event bus.
//!
//! Bounded ring buffer of structured events with monotonically increasing
//! sequence numbers. Publishing never blocks and never fails; a subscriber
//! that falls more than `capacity` events behind simply misses the oldest
//! ones. Consumers poll with [`EventBus::since`].

use std::collections::VecDeque;

use agentcasino_types::EventRecord;

pub const DEFAULT_EVENT_CAPACITY: usize = 1_024;

#[derive(Debug)]
pub struct EventBus {
    capacity: usize,
    next_seq: u64,
    buffer: VecDeque<(u64, EventRecord)>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            buffer: VecDeque::new(),
        }
    }

    /// Append an event; returns its sequence number.
    pub fn publish(&mut self, record: EventRecord) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back((seq, record));
        seq
    }

    /// Events with sequence number >= `from`, oldest first.
    pub fn since(&self, from: u64) -> Vec<(u64, EventRecord)> {
        self.buffer
            .iter()
            .filter(|(seq, _)| *seq >= from)
            .cloned()
            .collect()
    }

    /// Sequence number the next published event will get.
    pub fn head(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
