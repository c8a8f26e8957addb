use std::cmp::Reverse;
use std::collections::binary_heap::BinaryHeap;

use crate::core::support::simulation_time::SimulationTime;

use super::event::Event;

/// A queue of [`Event`]s ordered by their times. Events with equal times are returned in the
/// order they were scheduled.
#[derive(Debug)]
pub struct EventQueue {
    queue: BinaryHeap<Reverse<QueuedEvent>>,
    next_sequence: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Push a new [`Event`] on to the queue. The event may be earlier than events that were
    /// already popped.
    pub fn schedule(&mut self, event: Event) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.queue.push(Reverse(QueuedEvent { sequence, event }));
    }

    /// Pop the earliest [`Event`] from the queue. Returns `None` once the queue is empty.
    // not an `Iterator` since the queue may be refilled after it's drained
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Event> {
        self.queue.pop().map(|x| x.0.event)
    }

    /// The time of the next [`Event`] (the time of the earliest event in the queue).
    pub fn next_event_time(&self) -> Option<SimulationTime> {
        self.queue.peek().map(|x| x.0.event.time())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// An event along with its insertion order. Ordered by `(time, sequence)` only, so the order
/// is total and doesn't depend on the event's other fields.
#[derive(Debug)]
struct QueuedEvent {
    sequence: u64,
    event: Event,
}

impl QueuedEvent {
    fn key(&self) -> (SimulationTime, u64) {
        (self.event.time(), self.sequence)
    }
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}
