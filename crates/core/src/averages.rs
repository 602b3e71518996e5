//! Exponential moving averages used by the sizing policy.
//!
//! Both averages warm up by weighting early samples as a plain arithmetic
//! mean, so the estimate is exact while few samples exist and only then
//! transitions to exponential decay.

/// Exponential moving average with an integer weight.
///
/// With weight `W`, each new sample contributes `1/W` of the new average
/// once warmed up. During warm-up (fewer than `W` samples seen) the
/// effective weight is the sample count, making the average exact.
#[derive(Debug, Clone)]
pub struct AdaptiveWeightedAverage {
    weight: u32,
    seen: u32,
    average: f64,
}

impl AdaptiveWeightedAverage {
    pub fn new(weight: u32) -> Self {
        debug_assert!(weight > 0);
        Self {
            weight,
            seen: 0,
            average: 0.0,
        }
    }

    /// Fold a new sample into the average.
    pub fn sample(&mut self, value: f64) {
        let count = self.seen.saturating_add(1);
        let effective = count.min(self.weight);
        self.average =
            ((effective - 1) as f64 * self.average + value) / effective as f64;
        self.seen = count;
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn count(&self) -> u32 {
        self.seen
    }
}

/// Weighted average plus a deviation-scaled padding, giving an upper
/// estimate of future samples.
///
/// The deviation is itself a weighted average of `|x - mean|`, recorded
/// after the mean absorbs the sample. With `no_negative_deviation`,
/// samples below the mean contribute zero deviation; used where only
/// upward surprises matter (promoted bytes).
#[derive(Debug, Clone)]
pub struct AdaptivePaddedAverage {
    mean: AdaptiveWeightedAverage,
    deviation: AdaptiveWeightedAverage,
    padding: u32,
    no_negative_deviation: bool,
}

impl AdaptivePaddedAverage {
    pub fn new(weight: u32, padding: u32) -> Self {
        Self {
            mean: AdaptiveWeightedAverage::new(weight),
            deviation: AdaptiveWeightedAverage::new(weight),
            padding,
            no_negative_deviation: false,
        }
    }

    pub fn with_no_negative_deviation(weight: u32, padding: u32) -> Self {
        Self {
            no_negative_deviation: true,
            ..Self::new(weight, padding)
        }
    }

    pub fn sample(&mut self, value: f64) {
        self.mean.sample(value);
        let mean = self.mean.average();
        let deviation = if self.no_negative_deviation && value < mean {
            0.0
        } else {
            (value - mean).abs()
        };
        self.deviation.sample(deviation);
    }

    pub fn average(&self) -> f64 {
        self.mean.average()
    }

    pub fn deviation(&self) -> f64 {
        self.deviation.average()
    }

    /// Mean plus `padding` deviations.
    pub fn padded_average(&self) -> f64 {
        self.mean.average() + self.padding as f64 * self.deviation.average()
    }
}
