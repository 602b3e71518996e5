//! Space re-targeting: survivor/tenuring, eden, and old generation.
//!
//! Growth and shrink decisions share one shape: grow by a percentage
//! increment (scaled by how much of the total cost this generation is
//! responsible for) while the mutator misses the throughput goal, shrink
//! by a quarter-increment once it is met. The reciprocal cost estimators
//! veto expansions whose predicted throughput gain does not pay for the
//! extra footprint.

use super::AdaptiveSizePolicy;
use crate::estimator::ReciprocalLeastSquares;
use crate::events::PolicyEventKind;
use crate::tunables::{
    ADAPTIVE_SIZE_DECREMENT_SCALE_FACTOR, ADAPTIVE_SIZE_ESTIMATOR_MIN_SIZE_THROUGHPUT_TRADEOFF,
    ADAPTIVE_SIZE_POLICY_INITIALIZING_STEPS, TENURED_GENERATION_SIZE_INCREMENT,
    THRESHOLD_TOLERANCE_PERCENT, THROUGHPUT_GOAL, YOUNG_GENERATION_SIZE_INCREMENT,
};

impl AdaptiveSizePolicy {
    /// Re-target the survivor space and move the tenuring threshold
    /// toward whichever collection kind is cheaper.
    pub(crate) fn compute_survivor_space_size_and_threshold(
        &mut self,
        is_survivor_overflow: bool,
    ) {
        if !self.young_gen_policy_is_ready {
            return;
        }
        let mut decrement_threshold = false;
        let mut increment_threshold = false;
        if is_survivor_overflow {
            // Overflowed survivors already spilled into the old
            // generation; promote earlier rather than copy repeatedly.
            decrement_threshold = true;
        } else {
            let tolerance = 1.0 + f64::from(THRESHOLD_TOLERANCE_PERCENT) / 100.0;
            if self.minor_gc_cost() > self.major_gc_cost() * tolerance {
                decrement_threshold = true;
            } else if self.major_gc_cost() > self.minor_gc_cost() * tolerance {
                increment_threshold = true;
            }
        }

        let survivor_limit = self.config.align_down(self.config.max_survivor_size);
        let mut target = self
            .config
            .align_up(self.avg_survived.padded_average() as u64)
            .max(self.config.min_space_size);
        if target > survivor_limit {
            target = survivor_limit;
            decrement_threshold = true;
        }
        let previous_survivor = self.sizes.survivor_size;
        self.sizes.survivor_size = target;
        self.emit(PolicyEventKind::SurvivorResized, previous_survivor, target);

        let previous_threshold = self.sizes.tenuring_threshold;
        let threshold = if decrement_threshold {
            previous_threshold.saturating_sub(1).max(1)
        } else if increment_threshold {
            (previous_threshold + 1).min(self.config.max_tenuring_threshold())
        } else {
            previous_threshold
        };
        self.sizes.tenuring_threshold = threshold;
        self.emit(
            PolicyEventKind::TenuringThresholdChanged,
            u64::from(previous_threshold),
            u64::from(threshold),
        );
    }

    /// Re-target the eden space for throughput or footprint.
    pub(crate) fn compute_eden_space_size(&mut self) {
        let eden = self.sizes.eden_size;
        let use_estimator = self.config.use_cost_estimators
            && self.young_gen_change_for_minor_throughput
                > ADAPTIVE_SIZE_POLICY_INITIALIZING_STEPS;
        let mut expansion_reduces_cost =
            !use_estimator || self.minor_cost_estimator.slope(eden as f64) <= 0.0;
        let adjusted_mutator_cost = self.adjusted_mutator_cost();
        let gc_cost = self.gc_cost();

        let mut desired = eden;
        if expansion_reduces_cost && adjusted_mutator_cost < THROUGHPUT_GOAL && gc_cost > 0.0 {
            let increment = self.space_increment(
                eden,
                self.young_gen_size_increment_supplement + YOUNG_GENERATION_SIZE_INCREMENT,
            );
            // Grow in proportion to the share of cost minor collections
            // are responsible for.
            let scaled = (self.minor_gc_cost() / gc_cost * increment as f64) as u64;
            expansion_reduces_cost = !use_estimator
                || expansion_significantly_reduces_cost(
                    &self.minor_cost_estimator,
                    eden as f64,
                    scaled as f64,
                );
            if expansion_reduces_cost {
                desired = self.config.align_up(eden.saturating_add(scaled)).max(eden);
                self.young_gen_change_for_minor_throughput += 1;
            }
        }
        if !expansion_reduces_cost
            || (self.config.footprint_goal_enabled
                && self.young_gen_policy_is_ready
                && adjusted_mutator_cost >= THROUGHPUT_GOAL)
        {
            desired = self.shrink_for_footprint(
                eden,
                YOUNG_GENERATION_SIZE_INCREMENT,
                eden.saturating_add(self.sizes.promo_size),
            );
        }

        desired = desired.max(self.config.min_space_size);
        let eden_limit = self.config.align_down(self.config.max_eden_size);
        if desired > eden_limit {
            // At the cap, hold rather than shrink; tenuring-threshold
            // pressure moves the excess work to the old generation.
            desired = eden_limit.max(eden);
        }
        self.emit(PolicyEventKind::EdenResized, eden, desired);
        self.sizes.eden_size = desired;
    }

    /// Re-target the promotion budget and the old-generation size after a
    /// complete collection.
    pub(crate) fn compute_old_gen_space_size(&mut self, old_live: u64) {
        self.avg_old_live.sample(old_live as f64);
        let average_old_live = self.avg_old_live.average() as u64;
        let headroom = self.config.max_old_size.saturating_sub(average_old_live);
        let promo_limit = self
            .config
            .align_down(headroom.max(self.sizes.promo_size));

        let promo = self.sizes.promo_size;
        let use_estimator = self.config.use_cost_estimators
            && self.old_gen_change_for_major_throughput > ADAPTIVE_SIZE_POLICY_INITIALIZING_STEPS;
        let mut expansion_reduces_cost =
            !use_estimator || self.major_cost_estimator.slope(promo as f64) <= 0.0;
        let adjusted_mutator_cost = self.adjusted_mutator_cost();
        let gc_cost = self.gc_cost();

        let mut desired = promo;
        if expansion_reduces_cost && adjusted_mutator_cost < THROUGHPUT_GOAL && gc_cost > 0.0 {
            let increment = self.space_increment(
                promo,
                self.old_gen_size_increment_supplement + TENURED_GENERATION_SIZE_INCREMENT,
            );
            let scaled = (self.major_gc_cost() / gc_cost * increment as f64) as u64;
            expansion_reduces_cost = !use_estimator
                || expansion_significantly_reduces_cost(
                    &self.major_cost_estimator,
                    promo as f64,
                    scaled as f64,
                );
            if expansion_reduces_cost {
                desired = self.config.align_up(promo.saturating_add(scaled)).max(promo);
                self.old_gen_change_for_major_throughput += 1;
            }
        }
        if !expansion_reduces_cost
            || (self.config.footprint_goal_enabled
                && self.young_gen_policy_is_ready
                && adjusted_mutator_cost >= THROUGHPUT_GOAL)
        {
            desired = self.shrink_for_footprint(
                promo,
                TENURED_GENERATION_SIZE_INCREMENT,
                self.sizes.eden_size.saturating_add(promo),
            );
        }

        desired = desired.max(self.config.min_space_size);
        let new_promo = desired.min(promo_limit);
        self.emit(PolicyEventKind::PromoResized, promo, new_promo);
        self.sizes.promo_size = new_promo;

        let padded_promoted = self.avg_promoted.padded_average() as u64;
        let previous_old = self.sizes.old_size;
        let target = self.config.align_up(
            old_live
                .saturating_add(new_promo)
                .saturating_add(padded_promoted),
        );
        let old_size = target.clamp(
            self.config.min_space_size,
            self.config.align_down(self.config.max_old_size),
        );
        self.emit(PolicyEventKind::OldGenResized, previous_old, old_size);
        self.sizes.old_size = old_size;
    }

    /// Quarter-increment shrink, scaled by this space's share of the
    /// combined young + promotion footprint.
    fn shrink_for_footprint(&self, current: u64, percent: u64, total: u64) -> u64 {
        let change =
            self.space_increment(current, percent) / ADAPTIVE_SIZE_DECREMENT_SCALE_FACTOR;
        let change = scale_down(change, current, total);
        self.config.align_up(current.saturating_sub(change))
    }

    /// `percent`% of `current`, rounded up to the alignment unit.
    fn space_increment(&self, current: u64, percent: u64) -> u64 {
        self.config.align_up(current.saturating_mul(percent) / 100)
    }
}

/// Scale `change` by `part / total`; zero change when the total is empty.
fn scale_down(change: u64, part: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (change as f64 * (part as f64 / total as f64)) as u64
}

/// Does the estimator predict that growing a space from `current_size` by
/// `expansion_bytes` buys enough throughput to be worth the footprint?
///
/// The fractional throughput gain must be at least
/// [`ADAPTIVE_SIZE_ESTIMATOR_MIN_SIZE_THROUGHPUT_TRADEOFF`] of the
/// fractional size gain.
pub fn expansion_significantly_reduces_cost(
    fit: &ReciprocalLeastSquares,
    current_size: f64,
    expansion_bytes: f64,
) -> bool {
    let current_throughput = 1.0 - fit.estimate(current_size);
    if current_size == 0.0 || current_throughput == 0.0 {
        return false;
    }
    let expanded_size = current_size + expansion_bytes;
    let expanded_throughput = 1.0 - fit.estimate(expanded_size);
    if current_size >= expanded_size || current_throughput >= expanded_throughput {
        return false;
    }
    let required_gain = (expanded_size / current_size - 1.0)
        * ADAPTIVE_SIZE_ESTIMATOR_MIN_SIZE_THROUGHPUT_TRADEOFF;
    let estimated_gain = expanded_throughput / current_throughput - 1.0;
    estimated_gain >= required_gain
}
