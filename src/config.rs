//! Session configuration.

use std::time::Duration;

use crate::extract::Domain;

/// Configuration for a calibration and extraction session.
///
/// Immutable once a session has been calibrated; shared read-only by all
/// workers. Build with [`Config::default`] and the setter methods.
#[derive(Debug, Clone)]
pub struct Config {
    /// Confidence level for significance tests (default: 0.95).
    pub confidence: f64,

    /// Probes collected to characterize baseline noise (default: 10).
    pub baseline_samples: usize,

    /// Probes collected per predicate evaluation (default: 5).
    pub samples_per_test: usize,

    /// Candidate delays tried in ascending order during calibration
    /// (default: 0.5s to 5s in 0.5s steps).
    pub candidate_delays: Vec<Duration>,

    /// Additional attempts for a failed probe before the error
    /// propagates (default: 3).
    pub probe_retries: usize,

    /// Minimum interval between consecutive probes, applied per worker
    /// (default: none).
    pub min_probe_interval: Option<Duration>,

    /// Session deadline; extraction stops after the current probe once
    /// exceeded, preserving partial results (default: none).
    pub deadline: Option<Duration>,

    /// Ordinal domain searched per character (default: printable ASCII,
    /// 32..=126).
    pub domain: Domain,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            baseline_samples: 10,
            samples_per_test: 5,
            candidate_delays: (1..=10).map(|i| Duration::from_millis(i * 500)).collect(),
            probe_retries: 3,
            min_probe_interval: None,
            deadline: None,
            domain: Domain::default(),
        }
    }
}

impl Config {
    /// Set the confidence level for significance tests.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the number of baseline probes.
    pub fn baseline_samples(mut self, n: usize) -> Self {
        self.baseline_samples = n;
        self
    }

    /// Set the number of probes per predicate evaluation.
    pub fn samples_per_test(mut self, n: usize) -> Self {
        self.samples_per_test = n;
        self
    }

    /// Set the candidate delay sequence tried during calibration.
    pub fn candidate_delays(mut self, delays: Vec<Duration>) -> Self {
        self.candidate_delays = delays;
        self
    }

    /// Set the per-probe retry budget.
    pub fn probe_retries(mut self, retries: usize) -> Self {
        self.probe_retries = retries;
        self
    }

    /// Set the minimum per-worker interval between probes.
    pub fn min_probe_interval(mut self, interval: Duration) -> Self {
        self.min_probe_interval = Some(interval);
        self
    }

    /// Set the session deadline.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the ordinal search domain.
    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.confidence, 0.95);
        assert_eq!(config.baseline_samples, 10);
        assert_eq!(config.samples_per_test, 5);
        assert_eq!(config.candidate_delays.len(), 10);
        assert_eq!(config.candidate_delays[0], Duration::from_millis(500));
        assert_eq!(config.candidate_delays[9], Duration::from_secs(5));
    }

    #[test]
    fn builder_setters() {
        let config = Config::default()
            .confidence(0.99)
            .samples_per_test(7)
            .probe_retries(1)
            .deadline(Duration::from_secs(60));

        assert_eq!(config.confidence, 0.99);
        assert_eq!(config.samples_per_test, 7);
        assert_eq!(config.probe_retries, 1);
        assert_eq!(config.deadline, Some(Duration::from_secs(60)));
    }
}
