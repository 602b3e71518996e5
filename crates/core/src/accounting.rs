//! Value objects the collector hands to the policy at collection
//! boundaries. The policy never reaches into the heap itself.

use serde::{Deserialize, Serialize};

/// What triggered a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcCause {
    /// An allocation could not be satisfied. Only these collections are
    /// representative of steady-state behavior, so only they feed the
    /// cost averages (unless configured otherwise).
    OnAllocation,
    /// Explicitly requested by the program.
    ExplicitRequest,
    /// Requested by diagnostic tooling.
    Diagnostic,
}

/// Live-byte accounting captured by the collector.
///
/// The young/aligned-chunk occupancy fields are current at collection
/// begin; the survived, promoted, and old-generation fields describe the
/// state after the preceding collection phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountingSnapshot {
    /// Bytes in all young-generation chunks.
    pub young_chunk_bytes: u64,
    /// Bytes in the aligned subset of young-generation chunks.
    pub young_aligned_chunk_bytes: u64,
    /// Young occupancy when the collection started.
    pub young_chunk_bytes_before: u64,
    /// Bytes in survivor-space chunks after the collection.
    pub survivor_chunk_bytes: u64,
    /// Bytes of survivor objects that did not fit the survivor space and
    /// spilled into the old generation.
    pub survivor_overflow_object_bytes: u64,
    /// Bytes promoted to the old generation by reaching the tenuring age.
    pub tenured_object_bytes: u64,
    /// Old-generation live bytes after the collection.
    pub old_generation_after_chunk_bytes: u64,
}

impl AccountingSnapshot {
    /// The survivor space overflowed if any survivor bytes spilled.
    pub fn survivor_overflowed(&self) -> bool {
        self.survivor_overflow_object_bytes > 0
    }

    /// Bytes that survived the young collection, wherever they landed.
    pub fn survived_bytes(&self) -> u64 {
        self.survivor_chunk_bytes
            .saturating_add(self.survivor_overflow_object_bytes)
    }
}

/// Current occupancy, consumed by the complete-collection decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapUsage {
    pub young_used_bytes: u64,
    pub old_used_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_derived_from_spilled_bytes() {
        let mut snapshot = AccountingSnapshot::default();
        assert!(!snapshot.survivor_overflowed());
        snapshot.survivor_overflow_object_bytes = 1;
        assert!(snapshot.survivor_overflowed());
    }

    #[test]
    fn survived_bytes_saturate() {
        let snapshot = AccountingSnapshot {
            survivor_chunk_bytes: u64::MAX,
            survivor_overflow_object_bytes: u64::MAX,
            ..AccountingSnapshot::default()
        };
        assert_eq!(snapshot.survived_bytes(), u64::MAX);
    }
}
