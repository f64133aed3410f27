//! Baseline estimation and the noise-floor profile.

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::payload::ConditionSource;
use crate::probe::TimingProbe;
use crate::statistics::SampleSet;
use crate::transport::Transport;

/// Sigma multiplier for the noise bound (3-sigma rule).
pub const NOISE_SIGMA: f64 = 3.0;

/// Collect `n` baseline probes using a condition known to be false.
///
/// No delay is induced; the samples characterize ambient network noise.
/// Composition into a [`BaselineProfile`] is the caller's responsibility.
pub fn collect<T: Transport>(
    probe: &mut TimingProbe<T>,
    conditions: &dyn ConditionSource,
    n: usize,
    delay: Duration,
) -> Result<SampleSet> {
    let condition = conditions.always_false();
    let mut samples = SampleSet::with_capacity(n);
    for _ in 0..n {
        samples.push(probe.probe_condition(&condition, delay)?);
    }
    debug!(
        samples = samples.len(),
        mean_s = samples.mean(),
        std_s = samples.std_dev(),
        "baseline collected"
    );
    Ok(samples)
}

/// Ambient noise characterization for one session.
///
/// Owned by the calibrator, then shared read-only with every worker for
/// the remainder of the session. Recomputed only on explicit
/// recalibration, never implicitly mid-extraction.
#[derive(Debug, Clone)]
pub struct BaselineProfile {
    samples: SampleSet,
    mean: f64,
    std_dev: f64,
    noise_bound: f64,
}

impl BaselineProfile {
    /// Derive a profile from collected baseline samples.
    ///
    /// Requires at least two samples; a significance test cannot trust a
    /// thinner baseline.
    pub fn from_samples(samples: SampleSet) -> Result<Self> {
        if samples.len() < 2 {
            return Err(Error::InsufficientSamples {
                observations: samples.len(),
            });
        }
        let mean = samples.mean();
        let std_dev = samples.std_dev();
        Ok(Self {
            samples,
            mean,
            std_dev,
            noise_bound: mean + NOISE_SIGMA * std_dev,
        })
    }

    /// The underlying no-delay samples.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Baseline mean latency in seconds.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Baseline standard deviation in seconds.
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// The noise bound in seconds: `mean + 3 * stddev`. Delayed means
    /// must exceed this for a delay to count as genuine.
    pub fn noise_bound(&self) -> f64 {
        self.noise_bound
    }
}
