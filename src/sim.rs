//! Deterministic simulated timing oracle.
//!
//! Stands in for a real target during tests and benchmarks: it holds a
//! secret string, answers the condition grammar emitted by
//! [`SimConditions`], and reports synthetic latencies (base + seeded
//! jitter + the armed delay when the condition holds) without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TransportError;
use crate::payload::{ConditionSource, PayloadTemplate};
use crate::transport::Transport;

/// Condition source speaking the simulated target's grammar.
///
/// Emits `true`, `false`, `ord(p)>=b`, `ord(p)==v` and `end(p)`; pair it
/// with [`SimTarget::template`].
#[derive(Debug, Clone, Copy)]
pub struct SimConditions;

impl ConditionSource for SimConditions {
    fn always_true(&self) -> String {
        "true".to_string()
    }

    fn always_false(&self) -> String {
        "false".to_string()
    }

    fn ordinal_ge(&self, position: usize, boundary: u32) -> String {
        format!("ord({position})>={boundary}")
    }

    fn ordinal_eq(&self, position: usize, value: u32) -> String {
        format!("ord({position})=={value}")
    }

    fn is_terminator(&self, position: usize) -> String {
        format!("end({position})")
    }
}

/// A simulated vulnerable target.
#[derive(Debug)]
pub struct SimTarget {
    secret: String,
    base_latency: Duration,
    jitter: Duration,
    rng: Mutex<StdRng>,
    probes: AtomicU64,
    fail_after: Option<u64>,
}

impl SimTarget {
    /// Create a target guarding `secret`, with zero base latency and no
    /// jitter.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_latency: Duration::ZERO,
            jitter: Duration::ZERO,
            rng: Mutex::new(StdRng::seed_from_u64(0)),
            probes: AtomicU64::new(0),
            fail_after: None,
        }
    }

    /// Set the base round-trip latency and a uniform jitter bound; each
    /// probe's latency is `base + U(-jitter, +jitter)`, clamped at zero.
    pub fn latency(mut self, base: Duration, jitter: Duration) -> Self {
        self.base_latency = base;
        self.jitter = jitter;
        self
    }

    /// Seed the jitter generator for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Inject a permanent transport fault after `n` successful probes.
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Total probes served (including failed attempts).
    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::SeqCst)
    }

    /// The payload template matching this target's wire format.
    pub fn template() -> PayloadTemplate {
        // Validated at construction; the literal is well-formed.
        match PayloadTemplate::new("{condition};{delay}") {
            Ok(template) => template,
            Err(_) => unreachable!("static template is valid"),
        }
    }

    fn condition_holds(&self, condition: &str) -> Result<bool, TransportError> {
        let parse_err = || TransportError::Failed {
            reason: format!("simulated target cannot parse condition {condition:?}"),
        };

        match condition {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                if let Some(rest) = condition.strip_prefix("end(") {
                    let position: usize = rest
                        .strip_suffix(')')
                        .and_then(|p| p.parse().ok())
                        .ok_or_else(parse_err)?;
                    Ok(position >= self.secret.len())
                } else if let Some(rest) = condition.strip_prefix("ord(") {
                    let (position, op_and_value) =
                        rest.split_once(')').ok_or_else(parse_err)?;
                    let position: usize = position.parse().map_err(|_| parse_err())?;
                    let ordinal = self.secret.as_bytes().get(position).map(|&b| u32::from(b));

                    if let Some(boundary) = op_and_value.strip_prefix(">=") {
                        let boundary: u32 = boundary.parse().map_err(|_| parse_err())?;
                        Ok(ordinal.is_some_and(|o| o >= boundary))
                    } else if let Some(value) = op_and_value.strip_prefix("==") {
                        let value: u32 = value.parse().map_err(|_| parse_err())?;
                        Ok(ordinal.is_some_and(|o| o == value))
                    } else {
                        Err(parse_err())
                    }
                } else {
                    Err(parse_err())
                }
            }
        }
    }

    fn jitter_secs(&self) -> f64 {
        let bound = self.jitter.as_secs_f64();
        if bound == 0.0 {
            return 0.0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(-bound..=bound)
    }
}

impl Transport for SimTarget {
    fn probe(&self, payload: &str) -> Result<Duration, TransportError> {
        let served = self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if served >= limit {
                return Err(TransportError::Failed {
                    reason: "injected fault".to_string(),
                });
            }
        }

        let (condition, delay) = payload.split_once(';').ok_or_else(|| {
            TransportError::Failed {
                reason: format!("simulated target cannot parse payload {payload:?}"),
            }
        })?;
        let delay: f64 = delay.parse().map_err(|_| TransportError::Failed {
            reason: format!("simulated target cannot parse delay {delay:?}"),
        })?;

        let mut latency = self.base_latency.as_secs_f64() + self.jitter_secs();
        if self.condition_holds(condition)? {
            latency += delay;
        }
        Ok(Duration::from_secs_f64(latency.max(0.0)))
    }
}
