//! Engine-level scenario and property tests, plus shared test fixtures.


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::accounting::{AccountingSnapshot, GcCause};
use crate::policy::AdaptiveSizePolicy;
use crate::timer::NanoClock;

pub(crate) const MIB: u64 = 1024 * 1024;

/// Hand-driven clock shared by a policy's timers and the test body.
pub(crate) struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    pub(crate) fn advance(&self, nanos: u64) {
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub(crate) fn advance_seconds(&self, seconds: f64) {
        self.advance((seconds * 1e9) as u64);
    }
}

impl NanoClock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Relaxed)
    }
}

/// Run one full collection: mutator runs for `mutator_seconds`, the
/// collection pauses for `pause_seconds`, then ends with `accounting`.
pub(crate) fn run_collection(
    policy: &mut AdaptiveSizePolicy,
    clock: &Arc<ManualClock>,
    complete: bool,
    mutator_seconds: f64,
    pause_seconds: f64,
    accounting: &AccountingSnapshot,
) {
    clock.advance_seconds(mutator_seconds);
    policy.on_collection_begin(complete, accounting);
    clock.advance_seconds(pause_seconds);
    policy.on_collection_end(complete, GcCause::OnAllocation, accounting);
}
