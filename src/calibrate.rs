//! Delay calibration against live network conditions.
//!
//! Searches an ascending sequence of candidate delays for the smallest
//! one that is reliably distinguishable from baseline noise. Two criteria
//! must both hold, with the 3-sigma noise-floor margin as the binding
//! acceptance criterion and Welch's test as a secondary confirmation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::baseline::{self, BaselineProfile};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::payload::ConditionSource;
use crate::probe::TimingProbe;
use crate::statistics::{estimate_required_samples, welch_one_sided, SampleSet};
use crate::transport::Transport;

/// The calibrated delay and test parameters for one session.
///
/// Immutable once calibrated; shared read-only by all workers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DelayConfig {
    /// The smallest reliably-detectable delay.
    pub delay: Duration,
    /// Confidence level used for significance tests.
    pub confidence: f64,
    /// Probes collected per predicate evaluation.
    pub samples_per_test: usize,
}

/// Select the smallest reliably-detectable delay from the configured
/// candidates.
///
/// First characterizes the noise floor with `config.baseline_samples`
/// no-delay probes, then walks the candidates ascending. For each
/// candidate, `samples_per_test` probes are gathered with the delay armed
/// (condition true) and the same number without (condition false); the
/// candidate is accepted iff its delayed mean clears the baseline noise
/// bound AND Welch's test confirms significance against the matched
/// no-delay samples.
///
/// Fails with [`Error::CalibrationFailed`] if no candidate qualifies; the
/// caller may retry with larger candidates or abort. Extraction against
/// an uncalibrated oracle is defined as unsafe.
pub fn calibrate<T: Transport>(
    probe: &mut TimingProbe<T>,
    conditions: &dyn ConditionSource,
    config: &Config,
) -> Result<(DelayConfig, BaselineProfile)> {
    let samples = baseline::collect(probe, conditions, config.baseline_samples, Duration::ZERO)?;
    let profile = BaselineProfile::from_samples(samples)?;
    info!(
        mean_s = profile.mean(),
        noise_bound_s = profile.noise_bound(),
        "baseline profile established"
    );

    let mut candidates = config.candidate_delays.clone();
    candidates.sort_unstable();

    let armed = conditions.always_true();
    for candidate in &candidates {
        // A zero delay can never exceed the noise bound.
        if candidate.is_zero() {
            continue;
        }

        let mut delayed = SampleSet::with_capacity(config.samples_per_test);
        for _ in 0..config.samples_per_test {
            delayed.push(probe.probe_condition(&armed, *candidate)?);
        }
        let matched = baseline::collect(probe, conditions, config.samples_per_test, *candidate)?;

        // Binding criterion: the delayed mean must clear the noise floor.
        let margin_ok = delayed.mean() > profile.noise_bound();
        let significance = welch_one_sided(&delayed, &matched, config.confidence)?;
        debug!(
            candidate_s = candidate.as_secs_f64(),
            delayed_mean_s = delayed.mean(),
            margin_ok,
            significant = significance.significant,
            p_value = significance.p_value,
            "candidate evaluated"
        );

        if margin_ok && significance.significant {
            info!(
                delay_s = candidate.as_secs_f64(),
                p_value = significance.p_value,
                "calibrated delay selected"
            );
            return Ok((
                DelayConfig {
                    delay: *candidate,
                    confidence: config.confidence,
                    samples_per_test: config.samples_per_test,
                },
                profile,
            ));
        }
    }

    warn!(
        candidates = candidates.len(),
        "no candidate delay cleared both acceptance criteria"
    );
    if let Some(largest) = candidates.iter().rev().find(|c| !c.is_zero()) {
        let suggested = estimate_required_samples(
            largest.as_secs_f64(),
            profile.std_dev(),
            config.samples_per_test,
        );
        warn!(
            samples_per_test = config.samples_per_test,
            suggested_samples = suggested,
            "noise may be surmountable with more samples per test"
        );
    }
    Err(Error::CalibrationFailed {
        candidates: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::PayloadTemplate;
    use crate::sim::{SimConditions, SimTarget};

    fn probe_for(target: &SimTarget) -> TimingProbe<&SimTarget> {
        TimingProbe::new(target, PayloadTemplate::new("{condition};{delay}").unwrap())
    }

    #[test]
    fn selects_smallest_detectable_candidate() {
        // Baseline mean 0.05s, stddev ~0.01s: noise bound ~0.08s. The
        // smallest candidate (0.1s) already clears it.
        let target = SimTarget::new("secret")
            .latency(Duration::from_millis(50), Duration::from_millis(17))
            .seed(7);
        let mut probe = probe_for(&target);

        let config = Config::default().candidate_delays(vec![
            Duration::from_millis(100),
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_secs(2),
        ]);

        let (delay_config, profile) =
            calibrate(&mut probe, &SimConditions, &config).unwrap();
        assert_eq!(delay_config.delay, Duration::from_millis(100));
        assert!(profile.noise_bound() > profile.mean());
        // Candidates were probed in ascending order and the first hit won:
        // 10 baseline + 5 delayed + 5 matched.
        assert_eq!(probe.queries(), 20);
    }

    #[test]
    fn skips_candidates_below_the_noise_floor() {
        // Jitter so large that a 10ms delay drowns in it.
        let target = SimTarget::new("secret")
            .latency(Duration::from_millis(50), Duration::from_millis(40))
            .seed(11);
        let mut probe = probe_for(&target);

        let config = Config::default().candidate_delays(vec![
            Duration::from_millis(10),
            Duration::from_secs(2),
        ]);

        let (delay_config, _) = calibrate(&mut probe, &SimConditions, &config).unwrap();
        assert_eq!(delay_config.delay, Duration::from_secs(2));
    }

    #[test]
    fn fails_when_no_candidate_qualifies() {
        let target = SimTarget::new("secret")
            .latency(Duration::from_millis(50), Duration::from_millis(30))
            .seed(3);
        let mut probe = probe_for(&target);

        // Every candidate is inside the noise.
        let config = Config::default().candidate_delays(vec![
            Duration::ZERO,
            Duration::from_millis(1),
            Duration::from_millis(2),
        ]);

        let err = calibrate(&mut probe, &SimConditions, &config).unwrap_err();
        assert!(matches!(err, Error::CalibrationFailed { candidates: 3 }));
    }

    #[test]
    fn zero_delay_is_never_selected() {
        // Even a noiseless target must not calibrate to zero.
        let target = SimTarget::new("secret")
            .latency(Duration::from_millis(50), Duration::ZERO)
            .seed(1);
        let mut probe = probe_for(&target);

        let config = Config::default()
            .candidate_delays(vec![Duration::ZERO, Duration::from_millis(200)]);

        let (delay_config, _) = calibrate(&mut probe, &SimConditions, &config).unwrap();
        assert_eq!(delay_config.delay, Duration::from_millis(200));
    }
}
