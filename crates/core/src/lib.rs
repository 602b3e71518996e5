//! Adaptive sizing policy for a generational, stop-the-world garbage
//! collector.
//!
//! After each collection the policy decides whether the next collection
//! should be incremental or complete, re-targets the eden, survivor, and
//! old spaces, and moves the tenuring threshold, balancing mutator
//! throughput against memory footprint. The collection machinery itself
//! (scavenging, allocation, safepoints) lives with the embedding
//! collector and talks to the policy through the value objects in
//! [`accounting`].

pub mod accounting;
pub mod averages;
pub mod config;
pub mod estimator;
pub mod events;
pub mod policy;
pub mod spaces;
pub mod timer;
pub mod tunables;

#[cfg(test)]
mod tests;

pub use accounting::{AccountingSnapshot, GcCause, HeapUsage};
pub use averages::{AdaptivePaddedAverage, AdaptiveWeightedAverage};
pub use config::{ConfigError, SizingConfig};
pub use estimator::ReciprocalLeastSquares;
pub use events::{EnqueueResult, PolicyEvent, PolicyEventKind, PolicyEventQueue};
pub use policy::{expansion_significantly_reduces_cost, AdaptiveSizePolicy};
pub use spaces::GenerationSizes;
pub use timer::{IntervalTimer, MonotonicClock, NanoClock};
