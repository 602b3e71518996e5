//! The adaptive sizing policy engine.
//!
//! After every collection the engine folds the collector's accounting
//! snapshot into its averages and estimators, then re-targets the eden,
//! survivor, and old spaces and the tenuring threshold, trading mutator
//! throughput against footprint.
//!
//! # Architecture
//!
//! ```text
//! Timers ──┐
//! Snapshot ┼→ [AdaptiveSizePolicy] ─→ GenerationSizes + tenuring threshold
//! Usage  ──┘          │
//!                     └─→ PolicyEventQueue (drained between safepoints)
//! ```
//!
//! Everything runs inside stop-the-world callbacks: no locking, no heap
//! allocation, no blocking. The only state readable from uninterruptible
//! contexts is the pair of collection counters behind [`Self::gc_count`].

mod sizing;

pub use sizing::expansion_significantly_reduces_cost;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::accounting::{AccountingSnapshot, GcCause, HeapUsage};
use crate::averages::{AdaptivePaddedAverage, AdaptiveWeightedAverage};
use crate::config::{ConfigError, SizingConfig};
use crate::estimator::ReciprocalLeastSquares;
use crate::events::{EnqueueResult, PolicyEvent, PolicyEventKind, PolicyEventQueue};
use crate::spaces::GenerationSizes;
use crate::timer::{nanos_to_seconds, IntervalTimer, MonotonicClock, NanoClock};
use crate::tunables::{
    ADAPTIVE_SIZE_MAJOR_GC_DECAY_TIME_SCALE, ADAPTIVE_SIZE_POLICY_READY_THRESHOLD,
    ADAPTIVE_SIZE_POLICY_WEIGHT, ADAPTIVE_TIME_WEIGHT,
    CONSECUTIVE_MINOR_TO_MAJOR_COLLECTION_PAUSE_TIME_RATIO, PAUSE_PADDING, PROMOTED_PADDING,
    SURVIVOR_PADDING, TENURED_GEN_SIZE_SUPPLEMENT_DECAY, YOUNG_GEN_SIZE_SUPPLEMENT_DECAY,
};

const EVENT_QUEUE_CAPACITY: usize = 256;

/// Adaptive generation-sizing policy for a generational stop-the-world
/// collector.
pub struct AdaptiveSizePolicy {
    config: SizingConfig,
    sizes: GenerationSizes,

    minor_timer: IntervalTimer,
    major_timer: IntervalTimer,

    // Collection counters are atomics so `gc_count` is a pair of plain
    // loads, callable from signal-like contexts. They are only written
    // at safepoints.
    minor_count: AtomicU64,
    major_count: AtomicU64,
    minor_count_since_major_collection: u64,
    young_gen_policy_is_ready: bool,
    old_size_exceeded_in_previous_collection: bool,

    // Startup growth boosts in percentage points; halve geometrically.
    young_gen_size_increment_supplement: u64,
    old_gen_size_increment_supplement: u64,
    // Expansions applied so far; gate the cost estimators.
    young_gen_change_for_minor_throughput: u32,
    old_gen_change_for_major_throughput: u32,

    // Mutator intervals are kept in nanoseconds and converted to seconds
    // only where they are folded into an average.
    latest_minor_mutator_interval_nanos: u64,
    latest_major_mutator_interval_nanos: u64,

    avg_minor_gc_cost: AdaptiveWeightedAverage,
    avg_major_gc_cost: AdaptiveWeightedAverage,
    avg_minor_pause: AdaptivePaddedAverage,
    avg_major_pause: AdaptivePaddedAverage,
    avg_major_interval_seconds: AdaptiveWeightedAverage,
    avg_survived: AdaptivePaddedAverage,
    avg_promoted: AdaptivePaddedAverage,
    avg_old_live: AdaptiveWeightedAverage,
    minor_cost_estimator: ReciprocalLeastSquares,
    major_cost_estimator: ReciprocalLeastSquares,

    events: PolicyEventQueue,
    events_dropped: u64,
}

impl AdaptiveSizePolicy {
    pub fn new(config: SizingConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        config: SizingConfig,
        clock: Arc<dyn NanoClock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let sizes = GenerationSizes::new(&config);
        let mut minor_timer = IntervalTimer::new(clock.clone());
        let mut major_timer = IntervalTimer::new(clock);
        // Both timers start out measuring mutator time.
        minor_timer.open();
        major_timer.open();
        Ok(Self {
            sizes,
            minor_timer,
            major_timer,
            minor_count: AtomicU64::new(0),
            major_count: AtomicU64::new(0),
            minor_count_since_major_collection: 0,
            young_gen_policy_is_ready: false,
            old_size_exceeded_in_previous_collection: false,
            young_gen_size_increment_supplement: config.young_generation_size_supplement,
            old_gen_size_increment_supplement: config.tenured_generation_size_supplement,
            young_gen_change_for_minor_throughput: 0,
            old_gen_change_for_major_throughput: 0,
            latest_minor_mutator_interval_nanos: 0,
            latest_major_mutator_interval_nanos: 0,
            avg_minor_gc_cost: AdaptiveWeightedAverage::new(ADAPTIVE_TIME_WEIGHT),
            avg_major_gc_cost: AdaptiveWeightedAverage::new(ADAPTIVE_TIME_WEIGHT),
            avg_minor_pause: AdaptivePaddedAverage::new(ADAPTIVE_TIME_WEIGHT, PAUSE_PADDING),
            avg_major_pause: AdaptivePaddedAverage::new(ADAPTIVE_TIME_WEIGHT, PAUSE_PADDING),
            avg_major_interval_seconds: AdaptiveWeightedAverage::new(ADAPTIVE_TIME_WEIGHT),
            avg_survived: AdaptivePaddedAverage::new(
                ADAPTIVE_SIZE_POLICY_WEIGHT,
                SURVIVOR_PADDING,
            ),
            avg_promoted: AdaptivePaddedAverage::with_no_negative_deviation(
                ADAPTIVE_SIZE_POLICY_WEIGHT,
                PROMOTED_PADDING,
            ),
            avg_old_live: AdaptiveWeightedAverage::new(ADAPTIVE_SIZE_POLICY_WEIGHT),
            minor_cost_estimator: ReciprocalLeastSquares::new(ADAPTIVE_TIME_WEIGHT),
            major_cost_estimator: ReciprocalLeastSquares::new(ADAPTIVE_TIME_WEIGHT),
            events: PolicyEventQueue::new(EVENT_QUEUE_CAPACITY),
            events_dropped: 0,
            config,
        })
    }

    pub fn name(&self) -> &'static str {
        "adaptive"
    }

    /// Should the collection that just ran incrementally be followed by a
    /// complete (young + old) collection?
    ///
    /// Incremental collection is always attempted first; a complete one
    /// follows only when the old generation overflowed its target, the
    /// accumulated minor pauses outweigh a major pause, or the projected
    /// promotion will not fit the old generation's free space.
    pub fn should_collect_completely(
        &self,
        following_incremental_collection: bool,
        usage: &HeapUsage,
    ) -> bool {
        if !following_incremental_collection {
            return false;
        }
        if self.old_size_exceeded_in_previous_collection {
            debug!("complete collection: old generation exceeded its target last cycle");
            return true;
        }
        let accumulated_minor_pauses =
            self.minor_count_since_major_collection as f64 * self.avg_minor_pause.average();
        let pause_ratio = f64::from(CONSECUTIVE_MINOR_TO_MAJOR_COLLECTION_PAUSE_TIME_RATIO);
        if accumulated_minor_pauses >= pause_ratio * self.avg_major_pause.padded_average() {
            debug!(
                accumulated_minor_pauses,
                "complete collection: consecutive minor pauses outweigh a major pause"
            );
            return true;
        }
        let projected_promotion =
            (self.avg_promoted.padded_average() as u64).min(usage.young_used_bytes);
        let old_free = self.sizes.old_size.saturating_sub(usage.old_used_bytes);
        if projected_promotion > old_free {
            debug!(
                projected_promotion,
                old_free, "complete collection: promotion will not fit the old generation"
            );
            return true;
        }
        false
    }

    /// Called when the mutator has been stopped and the collection is
    /// about to run.
    pub fn on_collection_begin(&mut self, complete: bool, accounting: &AccountingSnapshot) {
        if complete {
            self.major_timer.close();
            self.latest_major_mutator_interval_nanos = self.major_timer.measured_nanos();
        } else {
            self.minor_timer.close();
            self.latest_minor_mutator_interval_nanos = self.minor_timer.measured_nanos();
        }
        if accounting.young_chunk_bytes > 0 {
            self.sizes.avg_young_aligned_chunk_fraction.sample(
                accounting.young_aligned_chunk_bytes as f64
                    / accounting.young_chunk_bytes as f64,
            );
        }
        // The same timer now measures the pause.
        let timer = self.timer_for(complete);
        timer.reset();
        timer.open();
    }

    /// Called when the collection has finished, before the mutator
    /// resumes. Updates all statistics and re-targets the spaces.
    pub fn on_collection_end(
        &mut self,
        complete: bool,
        cause: GcCause,
        accounting: &AccountingSnapshot,
    ) {
        let should_sample = cause == GcCause::OnAllocation || self.config.with_system_gc;
        if complete {
            self.major_timer.close();
            update_collection_end_averages(
                &mut self.avg_major_gc_cost,
                &mut self.avg_major_pause,
                &mut self.major_cost_estimator,
                Some(&mut self.avg_major_interval_seconds),
                self.major_timer.measured_nanos(),
                self.latest_major_mutator_interval_nanos,
                self.sizes.promo_size,
                should_sample,
            );
            self.major_count.fetch_add(1, Ordering::Relaxed);
            self.minor_count_since_major_collection = 0;
        } else {
            self.minor_timer.close();
            update_collection_end_averages(
                &mut self.avg_minor_gc_cost,
                &mut self.avg_minor_pause,
                &mut self.minor_cost_estimator,
                None,
                self.minor_timer.measured_nanos(),
                self.latest_minor_mutator_interval_nanos,
                self.sizes.eden_size,
                should_sample,
            );
            self.minor_count.fetch_add(1, Ordering::Relaxed);
            self.minor_count_since_major_collection += 1;
        }
        self.young_gen_policy_is_ready = self.minor_count.load(Ordering::Relaxed)
            >= u64::from(ADAPTIVE_SIZE_POLICY_READY_THRESHOLD);

        // The same timer now measures the next mutator interval.
        let timer = self.timer_for(complete);
        timer.reset();
        timer.open();

        let old_live = accounting.old_generation_after_chunk_bytes;
        self.old_size_exceeded_in_previous_collection = old_live > self.sizes.old_size;

        // Survivor chunk accounting may undercount the space the next
        // collection needs; the padded averages absorb that.
        self.avg_survived.sample(accounting.survived_bytes() as f64);
        self.avg_promoted.sample(accounting.tenured_object_bytes as f64);

        self.compute_survivor_space_size_and_threshold(accounting.survivor_overflowed());
        self.compute_eden_space_size();
        if complete {
            self.compute_old_gen_space_size(old_live);
        }
        self.decay_supplemental_growth(complete);
    }

    /// Total number of collections. A pair of relaxed loads; safe from
    /// uninterruptible contexts, callers tolerate tearing between the
    /// two counters.
    pub fn gc_count(&self) -> u64 {
        self.minor_count.load(Ordering::Relaxed) + self.major_count.load(Ordering::Relaxed)
    }

    pub fn eden_size(&self) -> u64 {
        self.sizes.eden_size
    }

    pub fn survivor_size(&self) -> u64 {
        self.sizes.survivor_size
    }

    pub fn promo_size(&self) -> u64 {
        self.sizes.promo_size
    }

    pub fn old_size(&self) -> u64 {
        self.sizes.old_size
    }

    pub fn tenuring_threshold(&self) -> u32 {
        self.sizes.tenuring_threshold
    }

    /// Fraction of young-generation bytes in aligned chunks, for the
    /// allocator.
    pub fn young_gen_aligned_chunk_fraction(&self) -> f64 {
        self.sizes.young_aligned_chunk_fraction()
    }

    /// Drain pending sizing decisions. Allocates; call between
    /// safepoints only.
    pub fn drain_events(&self) -> Vec<PolicyEvent> {
        self.events.drain()
    }

    /// Decisions lost to a full event queue.
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped
    }

    /// Fraction of time spent in minor collections, clamped non-negative.
    pub fn minor_gc_cost(&self) -> f64 {
        self.avg_minor_gc_cost.average().max(0.0)
    }

    /// Fraction of time spent in major collections, clamped non-negative.
    pub fn major_gc_cost(&self) -> f64 {
        self.avg_major_gc_cost.average().max(0.0)
    }

    /// Combined collection cost, capped at 1.
    pub fn gc_cost(&self) -> f64 {
        (self.minor_gc_cost() + self.major_gc_cost()).min(1.0)
    }

    fn timer_for(&mut self, complete: bool) -> &mut IntervalTimer {
        if complete {
            &mut self.major_timer
        } else {
            &mut self.minor_timer
        }
    }

    /// Time since the last major collection, read without disturbing the
    /// running measurement.
    fn seconds_since_major_gc(&mut self) -> f64 {
        self.major_timer.close();
        let nanos = self.major_timer.measured_nanos();
        self.major_timer.open();
        nanos_to_seconds(nanos)
    }

    /// Combined cost with the major contribution faded out once major
    /// collections have become rare relative to their average interval.
    fn decaying_gc_cost(&mut self) -> f64 {
        let major_cost = self.major_gc_cost();
        let mut decayed_major_cost = major_cost;
        let average_interval = self.avg_major_interval_seconds.average();
        if self.config.decay_major_gc_cost && average_interval > 0.0 {
            let seconds_since_major = self.seconds_since_major_gc();
            let horizon =
                f64::from(ADAPTIVE_SIZE_MAJOR_GC_DECAY_TIME_SCALE) * average_interval;
            if seconds_since_major > horizon {
                decayed_major_cost =
                    major_cost.min(major_cost * horizon / seconds_since_major);
            }
        }
        (self.minor_gc_cost() + decayed_major_cost).min(1.0)
    }

    fn adjusted_mutator_cost(&mut self) -> f64 {
        1.0 - self.decaying_gc_cost()
    }

    fn decay_supplemental_growth(&mut self, complete: bool) {
        let minor_count = self.minor_count.load(Ordering::Relaxed);
        let major_count = self.major_count.load(Ordering::Relaxed);
        if complete && major_count % TENURED_GEN_SIZE_SUPPLEMENT_DECAY == 0 {
            self.old_gen_size_increment_supplement /= 2;
        } else if !complete
            && minor_count >= u64::from(ADAPTIVE_SIZE_POLICY_READY_THRESHOLD)
            && minor_count % YOUNG_GEN_SIZE_SUPPLEMENT_DECAY == 0
        {
            self.young_gen_size_increment_supplement /= 2;
        }
    }

    fn emit(&mut self, kind: PolicyEventKind, previous: u64, current: u64) {
        if previous == current {
            return;
        }
        debug!(?kind, previous, current, "sizing decision");
        let event = PolicyEvent {
            kind,
            collection: self.gc_count(),
            previous,
            current,
        };
        if matches!(self.events.enqueue(event), EnqueueResult::Full) {
            self.events_dropped = self.events_dropped.saturating_add(1);
        }
    }

    #[cfg(test)]
    pub(crate) fn minor_collection_count(&self) -> u64 {
        self.minor_count.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn major_collection_count(&self) -> u64 {
        self.major_count.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn is_ready(&self) -> bool {
        self.young_gen_policy_is_ready
    }

    #[cfg(test)]
    pub(crate) fn young_supplement(&self) -> u64 {
        self.young_gen_size_increment_supplement
    }

    #[cfg(test)]
    pub(crate) fn old_supplement(&self) -> u64 {
        self.old_gen_size_increment_supplement
    }

    #[cfg(test)]
    pub(crate) fn minor_expansions(&self) -> u32 {
        self.young_gen_change_for_minor_throughput
    }
}

/// Fold one collection's timing into the cost/pause averages and the cost
/// estimator for that collection kind.
///
/// Only allocation-triggered collections (or all of them, when configured
/// with system GC adaptation) are representative and get sampled. The
/// pause is always recorded; the cost only when both pause and mutator
/// interval are positive; the estimator always receives the `(size, cost)`
/// point, with zero cost standing in when no cost could be computed.
#[allow(clippy::too_many_arguments)]
fn update_collection_end_averages(
    cost_average: &mut AdaptiveWeightedAverage,
    pause_average: &mut AdaptivePaddedAverage,
    cost_estimator: &mut ReciprocalLeastSquares,
    interval_average: Option<&mut AdaptiveWeightedAverage>,
    pause_nanos: u64,
    mutator_nanos: u64,
    size_bytes: u64,
    should_sample: bool,
) {
    if !should_sample {
        return;
    }
    let pause_seconds = nanos_to_seconds(pause_nanos);
    let mutator_seconds = nanos_to_seconds(mutator_nanos);
    pause_average.sample(pause_seconds);
    let mut collection_cost = 0.0;
    if pause_seconds > 0.0 && mutator_seconds > 0.0 {
        let interval_seconds = mutator_seconds + pause_seconds;
        collection_cost = pause_seconds / interval_seconds;
        cost_average.sample(collection_cost);
        if let Some(interval_average) = interval_average {
            interval_average.sample(interval_seconds);
        }
    }
    cost_estimator.sample(size_bytes as f64, collection_cost);
}
