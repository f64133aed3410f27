//! Latency samples and append-only sample sets.

use std::time::Duration;

/// A single latency measurement. Created once per probe, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySample(Duration);

impl LatencySample {
    /// Wrap a measured round-trip latency.
    pub fn new(latency: Duration) -> Self {
        Self(latency)
    }

    /// The measured latency.
    pub fn latency(&self) -> Duration {
        self.0
    }

    /// The measured latency in seconds.
    pub fn seconds(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl From<Duration> for LatencySample {
    fn from(latency: Duration) -> Self {
        Self::new(latency)
    }
}

/// An ordered, append-only sequence of latency samples.
///
/// Grows monotonically within a measurement round. Statistics are
/// recomputed on demand; sets are small (tens of samples), so caching
/// would buy nothing.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<LatencySample>,
}

impl SampleSet {
    /// Create an empty sample set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample.
    pub fn push(&mut self, sample: LatencySample) {
        self.samples.push(sample);
    }

    /// Number of samples collected.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples have been collected.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The raw samples in collection order.
    pub fn samples(&self) -> &[LatencySample] {
        &self.samples
    }

    /// Sample mean in seconds. Zero for an empty set.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(LatencySample::seconds).sum();
        sum / self.samples.len() as f64
    }

    /// Unbiased sample variance in seconds squared (ddof = 1).
    ///
    /// Zero when fewer than two samples are present.
    pub fn variance(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ss: f64 = self
            .samples
            .iter()
            .map(|s| {
                let d = s.seconds() - mean;
                d * d
            })
            .sum();
        ss / (n - 1) as f64
    }

    /// Sample standard deviation in seconds.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl FromIterator<Duration> for SampleSet {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().map(LatencySample::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of_secs(values: &[f64]) -> SampleSet {
        values.iter().map(|&v| Duration::from_secs_f64(v)).collect()
    }

    #[test]
    fn empty_set_statistics() {
        let set = SampleSet::new();
        assert!(set.is_empty());
        assert_eq!(set.mean(), 0.0);
        assert_eq!(set.variance(), 0.0);
    }

    #[test]
    fn mean_and_variance() {
        let set = set_of_secs(&[1.0, 2.0, 3.0, 4.0]);
        assert!((set.mean() - 2.5).abs() < 1e-12);
        // Unbiased variance of {1,2,3,4} is 5/3.
        assert!((set.variance() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_sample_has_zero_variance() {
        let set = set_of_secs(&[0.25]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.variance(), 0.0);
        assert!((set.mean() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn append_only_growth() {
        let mut set = SampleSet::with_capacity(4);
        for i in 1..=4u64 {
            set.push(LatencySample::new(Duration::from_millis(i * 10)));
            assert_eq!(set.len(), i as usize);
        }
        assert_eq!(set.samples()[0].latency(), Duration::from_millis(10));
    }
}
