//! Lock-free queue of sizing decisions.
//!
//! The policy runs inside stop-the-world pauses and may not allocate or
//! block, so decisions are recorded as `Copy` events in a preallocated
//! ring and drained by the collector between safepoints.

use crossbeam_queue::ArrayQueue;

/// Which knob a decision moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyEventKind {
    EdenResized,
    SurvivorResized,
    PromoResized,
    OldGenResized,
    TenuringThresholdChanged,
}

/// One sizing decision. `previous`/`current` are bytes, except for
/// tenuring-threshold changes where they are ages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyEvent {
    pub kind: PolicyEventKind,
    /// Total collection count when the decision was made.
    pub collection: u64,
    pub previous: u64,
    pub current: u64,
}

/// Result of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    Ok,
    /// Queue above 80% capacity; the collector should drain soon.
    HighWaterMark,
    /// Queue full; the event was dropped. Sizing never stalls on
    /// observability backpressure.
    Full,
}

/// Fixed-capacity decision queue.
pub struct PolicyEventQueue {
    queue: ArrayQueue<PolicyEvent>,
    capacity: usize,
    high_water_mark: usize,
}

impl PolicyEventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            capacity,
            high_water_mark: (capacity * 80) / 100,
        }
    }

    pub fn enqueue(&self, event: PolicyEvent) -> EnqueueResult {
        match self.queue.push(event) {
            Ok(()) => {
                if self.queue.len() >= self.high_water_mark {
                    EnqueueResult::HighWaterMark
                } else {
                    EnqueueResult::Ok
                }
            }
            Err(_) => EnqueueResult::Full,
        }
    }

    /// Drain all pending events. Allocates, so only call outside the
    /// collection callbacks.
    pub fn drain(&self) -> Vec<PolicyEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.queue.pop() {
            events.push(event);
        }
        events
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
