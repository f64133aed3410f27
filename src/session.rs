//! Calibrated extraction sessions.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::baseline::BaselineProfile;
use crate::calibrate::{self, DelayConfig};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract;
use crate::oracle::CharacterOracle;
use crate::payload::{ConditionSource, PayloadTemplate};
use crate::probe::TimingProbe;
use crate::result::{CharacterResult, ExtractionResult, Failure};
use crate::transport::Transport;

/// A calibrated session against one target.
///
/// Construction runs calibration; an uncalibrated session cannot exist,
/// so extraction can never run with an unverified delay. The calibrated
/// state (baseline profile, delay config) is immutable for the session's
/// lifetime and shared read-only by workers.
pub struct Session<T: Transport> {
    transport: Arc<T>,
    conditions: Arc<dyn ConditionSource>,
    template: PayloadTemplate,
    config: Config,
    delay: DelayConfig,
    baseline: Arc<BaselineProfile>,
    calibration_queries: u64,
}

impl<T: Transport> Session<T> {
    /// Calibrate against the target and return a session ready to
    /// extract.
    ///
    /// Fails with [`Error::CalibrationFailed`] if no candidate delay is
    /// reliably distinguishable from baseline noise.
    pub fn calibrate(
        transport: T,
        conditions: Arc<dyn ConditionSource>,
        template: PayloadTemplate,
        config: Config,
    ) -> Result<Self> {
        let transport = Arc::new(transport);
        let mut probe = TimingProbe::new(Arc::clone(&transport), template.clone())
            .with_min_interval(config.min_probe_interval);

        let (delay, baseline) = calibrate::calibrate(&mut probe, conditions.as_ref(), &config)?;
        Ok(Self {
            transport,
            conditions,
            template,
            config,
            delay,
            baseline: Arc::new(baseline),
            calibration_queries: probe.queries(),
        })
    }

    /// The delay selected by calibration.
    pub fn delay_config(&self) -> DelayConfig {
        self.delay
    }

    /// The session's baseline noise profile.
    pub fn baseline(&self) -> &BaselineProfile {
        &self.baseline
    }

    /// Network probes spent on calibration (not counted against
    /// extraction totals).
    pub fn calibration_queries(&self) -> u64 {
        self.calibration_queries
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn oracle(&self, deadline: Option<Instant>) -> CharacterOracle<Arc<T>> {
        let probe = TimingProbe::new(Arc::clone(&self.transport), self.template.clone())
            .with_min_interval(self.config.min_probe_interval);
        CharacterOracle::new(
            probe,
            Arc::clone(&self.conditions),
            Arc::clone(&self.baseline),
            self.delay,
            self.config.probe_retries,
        )
        .with_deadline(deadline)
    }

    /// Extract up to `max_length` characters sequentially.
    ///
    /// Stops at the terminator, at `max_length`, at the configured
    /// deadline (checked before every probe; the probe in flight always
    /// completes) or on an unrecoverable probe failure. Partial results
    /// are always returned with explicit markers.
    pub fn extract(&self, max_length: usize) -> ExtractionResult {
        let started = Instant::now();
        let deadline = self.config.deadline.map(|d| started + d);
        let mut oracle = self.oracle(deadline);
        let mut characters: Vec<CharacterResult> = Vec::new();
        let mut failure = None;

        for position in 0..max_length {
            match extract::extract_character(&mut oracle, position, self.config.domain) {
                Ok(result) => {
                    let done = result.is_terminator();
                    characters.push(result);
                    if done {
                        break;
                    }
                }
                Err(Error::DeadlineExceeded) => {
                    warn!(position, "deadline exceeded, stopping extraction");
                    failure = Some(Failure::DeadlineExceeded);
                    break;
                }
                Err(Error::Transport(error)) => {
                    warn!(position, %error, "probe failed beyond the retry budget");
                    failure = Some(Failure::Transport {
                        position,
                        reason: error.to_string(),
                    });
                    break;
                }
                Err(error) => {
                    warn!(position, %error, "extraction aborted");
                    failure = Some(Failure::Aborted {
                        position,
                        reason: error.to_string(),
                    });
                    break;
                }
            }
        }

        let result = ExtractionResult::assemble(
            characters,
            oracle.queries(),
            started.elapsed(),
            max_length,
            failure,
        );
        info!(
            value = %result.value,
            queries = result.queries,
            complete = result.is_complete(),
            "extraction finished"
        );
        result
    }
}
