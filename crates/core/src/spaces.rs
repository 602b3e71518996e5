//! Generation-size state shared between sizing policies.
//!
//! Simpler policies (fixed-proportion, never-collect) carry the same
//! fields, so they live in a value object the adaptive engine embeds
//! rather than on the engine itself.

use crate::averages::AdaptiveWeightedAverage;
use crate::config::SizingConfig;
use crate::tunables::{ADAPTIVE_TIME_WEIGHT, INITIAL_TENURING_THRESHOLD};

/// Current target sizes and tenuring threshold.
#[derive(Debug, Clone)]
pub struct GenerationSizes {
    pub(crate) eden_size: u64,
    pub(crate) survivor_size: u64,
    pub(crate) promo_size: u64,
    pub(crate) old_size: u64,
    pub(crate) tenuring_threshold: u32,
    /// Fraction of young-generation bytes held in aligned chunks;
    /// sampled here, consumed by the allocator.
    pub(crate) avg_young_aligned_chunk_fraction: AdaptiveWeightedAverage,
}

impl GenerationSizes {
    pub fn new(config: &SizingConfig) -> Self {
        Self {
            eden_size: config.initial_eden_size,
            survivor_size: config.initial_survivor_size,
            promo_size: config.initial_promo_size,
            old_size: config.initial_old_size,
            tenuring_threshold: INITIAL_TENURING_THRESHOLD
                .clamp(1, config.max_tenuring_threshold()),
            avg_young_aligned_chunk_fraction: AdaptiveWeightedAverage::new(
                ADAPTIVE_TIME_WEIGHT,
            ),
        }
    }

    pub fn eden_size(&self) -> u64 {
        self.eden_size
    }

    pub fn survivor_size(&self) -> u64 {
        self.survivor_size
    }

    pub fn promo_size(&self) -> u64 {
        self.promo_size
    }

    pub fn old_size(&self) -> u64 {
        self.old_size
    }

    pub fn tenuring_threshold(&self) -> u32 {
        self.tenuring_threshold
    }

    pub fn young_aligned_chunk_fraction(&self) -> f64 {
        self.avg_young_aligned_chunk_fraction.average()
    }
}
