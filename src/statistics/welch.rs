//! One-sided Welch's t-test for latency sample sets.
//!
//! Welch's variant handles unequal variances and unequal sample sizes,
//! both routine when comparing a handful of probe timings against a
//! larger baseline. The alternative hypothesis is always "candidate mean
//! exceeds baseline mean": an induced delay can only slow responses down.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{Error, Result};
use crate::statistics::SampleSet;

/// Outcome of a significance test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Significance {
    /// True iff the candidate mean significantly exceeds the baseline
    /// mean at the requested confidence.
    pub significant: bool,
    /// One-sided p-value of the comparison.
    pub p_value: f64,
}

/// Test whether `candidate` is significantly slower than `baseline`.
///
/// Pure function of the two sample sets: identical inputs yield identical
/// `(verdict, p_value)` pairs. The verdict is true iff
/// `p_value < 1 - confidence`.
///
/// Both sets must hold at least two observations; otherwise
/// [`Error::InsufficientSamples`] is returned. When both sets have zero
/// variance the test degenerates to strict inequality of the sample
/// means (p-value 0 or 1).
pub fn welch_one_sided(
    candidate: &SampleSet,
    baseline: &SampleSet,
    confidence: f64,
) -> Result<Significance> {
    for set in [candidate, baseline] {
        if set.len() < 2 {
            return Err(Error::InsufficientSamples {
                observations: set.len(),
            });
        }
    }

    let alpha = 1.0 - confidence;
    let (mc, mb) = (candidate.mean(), baseline.mean());
    let (vc, vb) = (candidate.variance(), baseline.variance());
    let (nc, nb) = (candidate.len() as f64, baseline.len() as f64);

    // Degenerate case: no spread in either set. A t-statistic is
    // undefined, so fall back to strict inequality of the means.
    let se2 = vc / nc + vb / nb;
    if se2 <= 0.0 {
        let p_value = if mc > mb { 0.0 } else { 1.0 };
        return Ok(Significance {
            significant: p_value < alpha,
            p_value,
        });
    }

    let t = (mc - mb) / se2.sqrt();

    // Welch-Satterthwaite degrees of freedom. At least one variance is
    // nonzero here, so the denominator is strictly positive, and with
    // n >= 2 per set the result is >= 1.
    let df = se2 * se2 / ((vc / nc).powi(2) / (nc - 1.0) + (vb / nb).powi(2) / (nb - 1.0));

    let p_value = match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 1.0 - dist.cdf(t),
        // df is strictly positive; if the distribution still cannot be
        // built, apply the degenerate mean comparison.
        Err(_) => {
            if mc > mb {
                0.0
            } else {
                1.0
            }
        }
    };

    Ok(Significance {
        significant: p_value < alpha,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn set_of_secs(values: &[f64]) -> SampleSet {
        values.iter().map(|&v| Duration::from_secs_f64(v)).collect()
    }

    #[test]
    fn clear_delay_is_significant() {
        let baseline = set_of_secs(&[0.050, 0.052, 0.048, 0.051, 0.049]);
        let delayed = set_of_secs(&[2.050, 2.048, 2.052, 2.049, 2.051]);

        let sig = welch_one_sided(&delayed, &baseline, 0.95).unwrap();
        assert!(sig.significant);
        assert!(sig.p_value < 0.001);
    }

    #[test]
    fn identical_distributions_are_not_significant() {
        let baseline = set_of_secs(&[0.050, 0.052, 0.048, 0.051, 0.049]);
        let same = set_of_secs(&[0.049, 0.051, 0.050, 0.048, 0.052]);

        let sig = welch_one_sided(&same, &baseline, 0.95).unwrap();
        assert!(!sig.significant);
    }

    #[test]
    fn slower_baseline_is_never_significant() {
        // One-sided alternative: candidate faster than baseline must not
        // register as a delay.
        let baseline = set_of_secs(&[1.0, 1.01, 0.99, 1.02]);
        let faster = set_of_secs(&[0.1, 0.11, 0.09, 0.12]);

        let sig = welch_one_sided(&faster, &baseline, 0.95).unwrap();
        assert!(!sig.significant);
        assert!(sig.p_value > 0.95);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let baseline = set_of_secs(&[0.05, 0.06, 0.055, 0.052]);
        let candidate = set_of_secs(&[0.2, 0.21, 0.19, 0.2]);

        let first = welch_one_sided(&candidate, &baseline, 0.95).unwrap();
        for _ in 0..10 {
            let again = welch_one_sided(&candidate, &baseline, 0.95).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn zero_variance_falls_back_to_mean_inequality() {
        let baseline = set_of_secs(&[0.05, 0.05, 0.05]);
        let delayed = set_of_secs(&[1.05, 1.05, 1.05]);

        let sig = welch_one_sided(&delayed, &baseline, 0.95).unwrap();
        assert!(sig.significant);
        assert_eq!(sig.p_value, 0.0);

        let equal = set_of_secs(&[0.05, 0.05, 0.05]);
        let sig = welch_one_sided(&equal, &baseline, 0.95).unwrap();
        assert!(!sig.significant);
        assert_eq!(sig.p_value, 1.0);
    }

    #[test]
    fn rejects_undersized_sample_sets() {
        let baseline = set_of_secs(&[0.05, 0.06]);
        let single = set_of_secs(&[0.2]);

        let err = welch_one_sided(&single, &baseline, 0.95).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { observations: 1 }));

        let err = welch_one_sided(&baseline, &single, 0.95).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { observations: 1 }));
    }
}
