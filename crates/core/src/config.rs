use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tunables::{TENURED_GENERATION_SIZE_SUPPLEMENT, YOUNG_GENERATION_SIZE_SUPPLEMENT};

/// Size parameters and behavior flags the policy is created with.
///
/// All byte values must be multiples of `alignment`. The configuration is
/// validated once when the policy is constructed; a policy value therefore
/// never operates on out-of-range parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Space alignment unit in bytes. Must be a power of two.
    pub alignment: u64,
    /// Smallest size any space may be sized to.
    pub min_space_size: u64,
    pub max_eden_size: u64,
    pub max_survivor_size: u64,
    pub max_old_size: u64,
    /// Number of survivor spaces; the tenuring threshold may range up to
    /// one past this.
    pub max_survivor_spaces: u32,
    pub initial_eden_size: u64,
    pub initial_survivor_size: u64,
    pub initial_promo_size: u64,
    pub initial_old_size: u64,
    /// Consult the reciprocal cost estimators once a generation has seen
    /// enough expansions.
    #[serde(default = "default_true")]
    pub use_cost_estimators: bool,
    /// Shrink spaces when the mutator already meets the throughput goal.
    #[serde(default = "default_true")]
    pub footprint_goal_enabled: bool,
    /// Also adapt on explicitly requested collections, not just
    /// allocation-triggered ones.
    #[serde(default)]
    pub with_system_gc: bool,
    /// Decay the major cost contribution when major collections become rare.
    #[serde(default = "default_true")]
    pub decay_major_gc_cost: bool,
    /// Startup boost in percentage points on the young growth increment.
    #[serde(default = "default_young_supplement")]
    pub young_generation_size_supplement: u64,
    /// Startup boost in percentage points on the tenured growth increment.
    #[serde(default = "default_tenured_supplement")]
    pub tenured_generation_size_supplement: u64,
}

fn default_true() -> bool {
    true
}

fn default_young_supplement() -> u64 {
    YOUNG_GENERATION_SIZE_SUPPLEMENT
}

fn default_tenured_supplement() -> u64 {
    TENURED_GENERATION_SIZE_SUPPLEMENT
}

const MIB: u64 = 1024 * 1024;

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            alignment: MIB,
            min_space_size: MIB,
            max_eden_size: 1024 * MIB,
            max_survivor_size: 256 * MIB,
            max_old_size: 4096 * MIB,
            max_survivor_spaces: 15,
            initial_eden_size: 64 * MIB,
            initial_survivor_size: 8 * MIB,
            initial_promo_size: 64 * MIB,
            initial_old_size: 192 * MIB,
            use_cost_estimators: true,
            footprint_goal_enabled: true,
            with_system_gc: false,
            decay_major_gc_cost: true,
            young_generation_size_supplement: YOUNG_GENERATION_SIZE_SUPPLEMENT,
            tenured_generation_size_supplement: TENURED_GENERATION_SIZE_SUPPLEMENT,
        }
    }
}

/// Rejections from [`SizingConfig::validate`].
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ConfigError {
    #[error("alignment must be a nonzero power of two, got {0}")]
    #[diagnostic(code(tenura::config::alignment))]
    BadAlignment(u64),

    #[error("{name} ({value} bytes) is not a multiple of the {alignment}-byte alignment")]
    #[diagnostic(code(tenura::config::unaligned))]
    Unaligned {
        name: &'static str,
        value: u64,
        alignment: u64,
    },

    #[error("{name} ({value} bytes) is below the minimum space size of {min} bytes")]
    #[diagnostic(code(tenura::config::below_minimum))]
    BelowMinimum {
        name: &'static str,
        value: u64,
        min: u64,
    },

    #[error("{name} ({value} bytes) exceeds its limit of {limit} bytes")]
    #[diagnostic(code(tenura::config::above_limit))]
    AboveLimit {
        name: &'static str,
        value: u64,
        limit: u64,
    },
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alignment == 0 || !self.alignment.is_power_of_two() {
            return Err(ConfigError::BadAlignment(self.alignment));
        }
        let aligned = [
            ("min_space_size", self.min_space_size),
            ("initial_eden_size", self.initial_eden_size),
            ("initial_survivor_size", self.initial_survivor_size),
            ("initial_promo_size", self.initial_promo_size),
            ("initial_old_size", self.initial_old_size),
        ];
        for (name, value) in aligned {
            if !self.is_aligned(value) {
                return Err(ConfigError::Unaligned {
                    name,
                    value,
                    alignment: self.alignment,
                });
            }
        }
        if self.min_space_size == 0 {
            return Err(ConfigError::BelowMinimum {
                name: "min_space_size",
                value: 0,
                min: self.alignment,
            });
        }
        // Every space must be able to hold at least the minimum size.
        let limits = [
            ("max_eden_size", self.max_eden_size),
            ("max_survivor_size", self.max_survivor_size),
            ("max_old_size", self.max_old_size),
        ];
        for (name, value) in limits {
            if self.align_down(value) < self.min_space_size {
                return Err(ConfigError::BelowMinimum {
                    name,
                    value,
                    min: self.min_space_size,
                });
            }
        }
        let initials = [
            ("initial_eden_size", self.initial_eden_size, self.max_eden_size),
            (
                "initial_survivor_size",
                self.initial_survivor_size,
                self.max_survivor_size,
            ),
            ("initial_promo_size", self.initial_promo_size, self.max_old_size),
            ("initial_old_size", self.initial_old_size, self.max_old_size),
        ];
        for (name, value, limit) in initials {
            if value < self.min_space_size {
                return Err(ConfigError::BelowMinimum {
                    name,
                    value,
                    min: self.min_space_size,
                });
            }
            if value > limit {
                return Err(ConfigError::AboveLimit { name, value, limit });
            }
        }
        Ok(())
    }

    /// Largest tenuring threshold: one past the number of survivor spaces.
    pub fn max_tenuring_threshold(&self) -> u32 {
        self.max_survivor_spaces + 1
    }

    pub fn is_aligned(&self, value: u64) -> bool {
        value & (self.alignment - 1) == 0
    }

    /// Round up to the alignment unit, saturating at the largest aligned
    /// value instead of wrapping.
    pub fn align_up(&self, value: u64) -> u64 {
        let mask = self.alignment - 1;
        value.saturating_add(mask) & !mask
    }

    pub fn align_down(&self, value: u64) -> u64 {
        value & !(self.alignment - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SizingConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_alignment() {
        let config = SizingConfig {
            alignment: 3 * MIB,
            ..SizingConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BadAlignment(3 * MIB)));
    }

    #[test]
    fn rejects_unaligned_initial_size() {
        let config = SizingConfig {
            initial_eden_size: 64 * MIB + 1,
            ..SizingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Unaligned { name: "initial_eden_size", .. })
        ));
    }

    #[test]
    fn rejects_initial_size_above_limit() {
        let config = SizingConfig {
            initial_eden_size: 2048 * MIB,
            ..SizingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::AboveLimit { name: "initial_eden_size", .. })
        ));
    }

    #[test]
    fn alignment_helpers() {
        let config = SizingConfig::default();
        assert_eq!(config.align_up(1), MIB);
        assert_eq!(config.align_up(MIB), MIB);
        assert_eq!(config.align_down(MIB + 1), MIB);
        assert!(config.is_aligned(3 * MIB));
        assert!(!config.is_aligned(MIB + 512));
        // Near the top of the range alignment saturates instead of wrapping.
        assert_eq!(config.align_up(u64::MAX), u64::MAX & !(MIB - 1));
    }

    #[test]
    fn parses_with_flag_defaults() {
        let json = r#"{
            "alignment": 1048576,
            "min_space_size": 1048576,
            "max_eden_size": 104857600,
            "max_survivor_size": 10485760,
            "max_old_size": 209715200,
            "max_survivor_spaces": 15,
            "initial_eden_size": 10485760,
            "initial_survivor_size": 1048576,
            "initial_promo_size": 10485760,
            "initial_old_size": 20971520
        }"#;
        let config: SizingConfig = serde_json::from_str(json).unwrap();
        assert!(config.use_cost_estimators);
        assert!(config.footprint_goal_enabled);
        assert!(!config.with_system_gc);
        assert_eq!(config.young_generation_size_supplement, 0);
        assert!(config.validate().is_ok());
    }
}
