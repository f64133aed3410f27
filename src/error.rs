//! Error taxonomy for calibration and extraction.

use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the inference engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A network probe failed after exhausting its retry budget.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A significance test was invoked with fewer than two observations
    /// in one of its sample sets.
    #[error("insufficient samples for significance test: got {observations}, need at least 2")]
    InsufficientSamples {
        /// Number of observations in the offending sample set.
        observations: usize,
    },

    /// No candidate delay cleared both the noise floor and the
    /// significance test during calibration.
    #[error("calibration failed: none of the {candidates} candidate delays was reliably detectable")]
    CalibrationFailed {
        /// Number of candidate delays that were tried.
        candidates: usize,
    },

    /// The session deadline elapsed before the next probe was issued.
    #[error("session deadline exceeded")]
    DeadlineExceeded,

    /// The session ended with unresolved positions (deadline reached or
    /// a worker's probes failed).
    #[error("extraction incomplete: {} position(s) unresolved", unresolved.len())]
    Incomplete {
        /// Positions that were never resolved, in ascending order.
        unresolved: Vec<usize>,
    },

    /// A payload template failed validation.
    #[error("invalid payload template: {reason}")]
    InvalidTemplate {
        /// What was wrong with the template.
        reason: String,
    },

    /// Binary search bounds crossed at entry. Unreachable under correct
    /// use; fatal if observed.
    #[error("binary search bounds crossed on entry: low {low} > high {high}")]
    InvariantViolation {
        /// Lower bound at entry.
        low: u32,
        /// Upper bound at entry.
        high: u32,
    },
}

/// Failure of a single network probe.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be completed.
    #[error("probe request failed: {reason}")]
    Failed {
        /// Human-readable cause.
        reason: String,
    },

    /// The request exceeded the transport's timeout.
    #[error("probe timed out after {after:?}")]
    Timeout {
        /// Configured timeout that was exceeded.
        after: Duration,
    },
}
