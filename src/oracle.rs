//! The character oracle: boolean predicates answered by timing.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use crate::baseline::BaselineProfile;
use crate::calibrate::DelayConfig;
use crate::error::{Error, Result};
use crate::payload::ConditionSource;
use crate::probe::TimingProbe;
use crate::statistics::{welch_one_sided, LatencySample, SampleSet};
use crate::transport::Transport;

/// Outcome of one predicate evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    /// Whether the predicate holds (a significant delay was observed).
    pub holds: bool,
    /// One-sided p-value of the underlying significance test.
    pub p_value: f64,
}

/// Evaluates boolean predicates against the target by measuring timing.
///
/// Collects a configurable number of samples per evaluation to average
/// out per-probe jitter, then delegates the verdict to the significance
/// tester against the session baseline. Each worker owns its oracle; the
/// baseline profile and delay config are shared read-only.
pub struct CharacterOracle<T: Transport> {
    probe: TimingProbe<T>,
    conditions: Arc<dyn ConditionSource>,
    baseline: Arc<BaselineProfile>,
    delay: DelayConfig,
    retries: usize,
    deadline: Option<Instant>,
}

impl<T: Transport> CharacterOracle<T> {
    /// Assemble an oracle from calibrated session state.
    pub fn new(
        probe: TimingProbe<T>,
        conditions: Arc<dyn ConditionSource>,
        baseline: Arc<BaselineProfile>,
        delay: DelayConfig,
        retries: usize,
    ) -> Self {
        Self {
            probe,
            conditions,
            baseline,
            delay,
            retries,
            deadline: None,
        }
    }

    /// Abort with [`Error::DeadlineExceeded`] instead of issuing any
    /// probe at or past `deadline`. The probe in flight always
    /// completes; the check runs between probes.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Network probes issued by this oracle, one increment per probe
    /// (not per evaluation), including retried attempts.
    pub fn queries(&self) -> u64 {
        self.probe.queries()
    }

    /// Evaluate an arbitrary boolean condition.
    ///
    /// The verdict requires the same two criteria as calibration:
    /// Welch significance against the session baseline AND the sample
    /// mean clearing the baseline's 3-sigma noise bound. Significance
    /// alone fires at rate alpha on false conditions, which a
    /// multi-position extraction evaluates by the dozens.
    ///
    /// Never substitutes a default verdict: if the probes fail after the
    /// retry budget, the error propagates.
    pub fn evaluate(&mut self, condition: &str) -> Result<Verdict> {
        let mut samples = SampleSet::with_capacity(self.delay.samples_per_test);
        for _ in 0..self.delay.samples_per_test {
            samples.push(self.sample_with_retry(condition)?);
        }

        let significance =
            welch_one_sided(&samples, self.baseline.samples(), self.delay.confidence)?;
        let margin_ok = samples.mean() > self.baseline.noise_bound();
        Ok(Verdict {
            holds: significance.significant && margin_ok,
            p_value: significance.p_value,
        })
    }

    /// "Is the ordinal of the character at `position` >= `boundary`?"
    pub fn ordinal_ge(&mut self, position: usize, boundary: u32) -> Result<Verdict> {
        let condition = self.conditions.ordinal_ge(position, boundary);
        self.evaluate(&condition)
    }

    /// "Does the ordinal of the character at `position` equal `value`?"
    pub fn ordinal_eq(&mut self, position: usize, value: u32) -> Result<Verdict> {
        let condition = self.conditions.ordinal_eq(position, value);
        self.evaluate(&condition)
    }

    /// "Does the string end at or before `position`?"
    pub fn is_terminator(&mut self, position: usize) -> Result<Verdict> {
        let condition = self.conditions.is_terminator(position);
        self.evaluate(&condition)
    }

    fn sample_with_retry(&mut self, condition: &str) -> Result<LatencySample> {
        let mut attempt = 0;
        loop {
            // Checked before every attempt, retries included; the probe
            // in flight always completes.
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(Error::DeadlineExceeded);
                }
            }
            match self.probe.probe_condition(condition, self.delay.delay) {
                Ok(sample) => return Ok(sample),
                Err(error) if attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, retries = self.retries, %error, "probe failed, retrying");
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}
