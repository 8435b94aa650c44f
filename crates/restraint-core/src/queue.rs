use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A scheduled entry: which entity fires, and when.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
    pub id: usize,
    pub time: f64,
}

/// Min-ordered queue of `(entity id, scheduled time)` events with a
/// monotonic clock.
///
/// Earlier times pop first; ties break toward the lower id so identically
/// timed events replay in a stable order. Several entries may share an id:
/// consumers detect the stale ones by comparing the popped time against the
/// entity's current schedule and discard them.
#[derive(Clone, Debug)]
pub struct TimeQueue {
    heap: BinaryHeap<Reverse<(OrderedFloat<f64>, usize)>>,
    time: f64,
    base_time: f64,
}

impl TimeQueue {
    /// An empty queue whose clock starts (and resets) at `base_time`.
    pub fn new(base_time: f64) -> Self {
        Self {
            heap: BinaryHeap::new(),
            time: base_time,
            base_time,
        }
    }

    /// Schedule `id` to fire at absolute time `time`.
    pub fn insert(&mut self, id: usize, time: f64) {
        debug_assert!(time >= self.time, "scheduled time precedes the clock");
        self.heap.push(Reverse((OrderedFloat(time), id)));
    }

    /// Remove and return the earliest event, advancing the clock to its time.
    pub fn next(&mut self) -> Option<Event> {
        let Reverse((time, id)) = self.heap.pop()?;
        self.time = time.into_inner();
        Some(Event {
            id,
            time: self.time,
        })
    }

    /// The time of the most recently popped event (the base time before any pop).
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop all pending events and return the clock to the base time.
    pub fn reset(&mut self) {
        self.heap.clear();
        self.time = self.base_time;
    }
}
