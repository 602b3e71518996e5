//! Calibration constants for the adaptive sizing policy.
//!
//! These defaults were tuned against generational stop-the-world collectors
//! and are fixed; the few knobs that make sense to override at heap
//! initialization live on [`crate::config::SizingConfig`] instead.

use static_assertions::const_assert;

/// Weight for the exponential averages of time-derived quantities
/// (pauses, costs, intervals). Also the history length of the
/// reciprocal cost estimators.
pub const ADAPTIVE_TIME_WEIGHT: u32 = 25;

/// Weight for the exponential averages of byte-derived quantities
/// (survived, promoted, old live).
pub const ADAPTIVE_SIZE_POLICY_WEIGHT: u32 = 10;

/// Number of minor collections before the young-generation policy is
/// considered warmed up.
pub const ADAPTIVE_SIZE_POLICY_READY_THRESHOLD: u32 = 5;

/// Number of expansions applied to a generation before its cost estimator
/// is trusted; until then expansion is assumed to help.
pub const ADAPTIVE_SIZE_POLICY_INITIALIZING_STEPS: u32 = 5;

/// Divisor applied to the growth increment when shrinking for footprint.
/// Shrinking deliberately moves slower than growing.
pub const ADAPTIVE_SIZE_DECREMENT_SCALE_FACTOR: u64 = 4;

/// Tolerance, in percent, between minor and major collection cost before
/// the tenuring threshold is moved.
pub const THRESHOLD_TOLERANCE_PERCENT: u32 = 10;

/// Padding multiplier on the survived-bytes average.
pub const SURVIVOR_PADDING: u32 = 3;

/// Padding multiplier on the promoted-bytes average.
pub const PROMOTED_PADDING: u32 = 3;

/// Padding multiplier on the pause-time averages.
pub const PAUSE_PADDING: u32 = 1;

/// Tenuring threshold a fresh policy starts with.
pub const INITIAL_TENURING_THRESHOLD: u32 = 7;

/// Ratio of mutator time to collection time the policy aims for.
/// A ratio of 19 yields a mutator utilization goal of 0.95.
pub const GC_TIME_RATIO: u32 = 19;

/// Mutator utilization the policy drives toward: `1 - 1/(1+GC_TIME_RATIO)`.
pub const THROUGHPUT_GOAL: f64 = 1.0 - 1.0 / (1.0 + GC_TIME_RATIO as f64);

/// Percentage growth step for the eden space.
pub const YOUNG_GENERATION_SIZE_INCREMENT: u64 = 10;

/// Percentage growth step for the old-generation promotion budget.
pub const TENURED_GENERATION_SIZE_INCREMENT: u64 = 10;

/// Default startup boost, in percentage points, added to the young growth
/// increment. Decays geometrically.
pub const YOUNG_GENERATION_SIZE_SUPPLEMENT: u64 = 0;

/// Default startup boost, in percentage points, added to the tenured growth
/// increment. Decays geometrically.
pub const TENURED_GENERATION_SIZE_SUPPLEMENT: u64 = 0;

/// The young supplement halves every this many minor collections once the
/// policy is ready.
pub const YOUNG_GEN_SIZE_SUPPLEMENT_DECAY: u64 = 8;

/// The tenured supplement halves every this many major collections.
pub const TENURED_GEN_SIZE_SUPPLEMENT_DECAY: u64 = 2;

/// Major cost is decayed once no major collection has happened for this
/// multiple of the average major interval.
pub const ADAPTIVE_SIZE_MAJOR_GC_DECAY_TIME_SCALE: u32 = 10;

/// An expansion is worthwhile only if the fractional throughput gain is at
/// least this fraction of the fractional size gain.
pub const ADAPTIVE_SIZE_ESTIMATOR_MIN_SIZE_THROUGHPUT_TRADEOFF: f64 = 0.80;

/// Accumulated minor pause time must reach this multiple of the padded major
/// pause before consecutive minor collections force a complete one.
pub const CONSECUTIVE_MINOR_TO_MAJOR_COLLECTION_PAUSE_TIME_RATIO: u32 = 2;

const_assert!(ADAPTIVE_TIME_WEIGHT > 0);
const_assert!(ADAPTIVE_SIZE_POLICY_WEIGHT > 0);
const_assert!(ADAPTIVE_SIZE_POLICY_READY_THRESHOLD > 0);
const_assert!(ADAPTIVE_SIZE_DECREMENT_SCALE_FACTOR > 0);
const_assert!(GC_TIME_RATIO > 0);
const_assert!(INITIAL_TENURING_THRESHOLD >= 1);
const_assert!(YOUNG_GEN_SIZE_SUPPLEMENT_DECAY > 0);
const_assert!(TENURED_GEN_SIZE_SUPPLEMENT_DECAY > 0);
const_assert!(ADAPTIVE_SIZE_MAJOR_GC_DECAY_TIME_SCALE > 0);
