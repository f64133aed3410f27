//! Sample-size estimation for a target effect.

use statrs::distribution::{ContinuousCDF, Normal};

/// Estimate the number of probes needed to detect `effect_size` against
/// noise of `baseline_std`, at 95% confidence and 80% power.
///
/// Two-sample power approximation: `n = 2 (z_alpha + z_beta)^2 (sigma / delta)^2`,
/// rounded up and floored at `min_samples`. A zero-noise baseline needs
/// no extra samples beyond the floor.
pub fn estimate_required_samples(effect_size: f64, baseline_std: f64, min_samples: usize) -> usize {
    if baseline_std <= 0.0 || effect_size <= 0.0 {
        return min_samples;
    }

    let (z_alpha, z_beta) = match Normal::new(0.0, 1.0) {
        Ok(normal) => (normal.inverse_cdf(0.95), normal.inverse_cdf(0.80)),
        // Unreachable: the unit normal parameters are always valid.
        Err(_) => return min_samples,
    };

    let ratio = baseline_std / effect_size;
    let n = 2.0 * (z_alpha + z_beta).powi(2) * ratio * ratio;
    (n.ceil() as usize).max(min_samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_noise_needs_only_the_floor() {
        assert_eq!(estimate_required_samples(1.0, 0.0, 5), 5);
    }

    #[test]
    fn smaller_effects_need_more_samples() {
        let large = estimate_required_samples(2.0, 0.05, 2);
        let small = estimate_required_samples(0.1, 0.05, 2);
        assert!(small > large);
    }

    #[test]
    fn noisier_baselines_need_more_samples() {
        let quiet = estimate_required_samples(0.5, 0.01, 2);
        let noisy = estimate_required_samples(0.5, 0.2, 2);
        assert!(noisy > quiet);
    }

    #[test]
    fn respects_minimum() {
        // Effect far above noise: formula yields ~0, floor applies.
        assert_eq!(estimate_required_samples(10.0, 0.001, 5), 5);
    }
}
