//! Statistical primitives for timing analysis.
//!
//! The significance test is deliberately isolated behind a narrow pure
//! interface so it can be unit-tested and swapped independently of the
//! network and scheduling layers.

mod power;
mod sample;
mod welch;

pub use power::estimate_required_samples;
pub use sample::{LatencySample, SampleSet};
pub use welch::{welch_one_sided, Significance};
