//! Transport capability boundary.
//!
//! The inference core needs exactly one thing from the network: send a
//! fully-rendered payload, report how long the round trip took, or fail
//! loudly. Protocol details live behind [`Transport`]; the bundled HTTP
//! implementation is one choice, the deterministic simulated target in
//! [`crate::sim`] is another.

use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;

/// A single-probe transport: one blocking round trip per call.
///
/// Implementations must be safe for concurrent invocation; each worker
/// calls `probe` from its own thread. No internal retries, no caching,
/// and failures are never swallowed.
pub trait Transport: Send + Sync {
    /// Issue one probe carrying `payload` and return the elapsed
    /// round-trip latency.
    fn probe(&self, payload: &str) -> Result<Duration, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn probe(&self, payload: &str) -> Result<Duration, TransportError> {
        (**self).probe(payload)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn probe(&self, payload: &str) -> Result<Duration, TransportError> {
        (**self).probe(payload)
    }
}

#[cfg(feature = "http")]
pub mod http {
    //! Blocking HTTP transport.

    use std::time::{Duration, Instant};

    use tracing::debug;

    use super::Transport;
    use crate::error::TransportError;

    /// Default per-request timeout, matching the original tooling.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Probes a target endpoint with the payload in a query parameter.
    ///
    /// Latency is measured around the full request, headers through body,
    /// since a server-side delay holds the response open end to end.
    pub struct HttpTransport {
        client: reqwest::blocking::Client,
        url: String,
        param: String,
        timeout: Duration,
    }

    impl HttpTransport {
        /// Create a transport probing `url` with the payload sent as the
        /// query parameter `param`.
        pub fn new(url: impl Into<String>, param: impl Into<String>) -> Result<Self, TransportError> {
            Self::with_timeout(url, param, DEFAULT_TIMEOUT)
        }

        /// Create a transport with an explicit per-request timeout.
        ///
        /// The timeout bounds the worst-case probe: it must comfortably
        /// exceed the calibrated delay or true conditions will read as
        /// transport failures.
        pub fn with_timeout(
            url: impl Into<String>,
            param: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self, TransportError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| TransportError::Failed {
                    reason: format!("failed to build HTTP client: {e}"),
                })?;
            Ok(Self {
                client,
                url: url.into(),
                param: param.into(),
                timeout,
            })
        }
    }

    impl Transport for HttpTransport {
        fn probe(&self, payload: &str) -> Result<Duration, TransportError> {
            let started = Instant::now();
            let response = self
                .client
                .get(&self.url)
                .query(&[(self.param.as_str(), payload)])
                .send()
                .map_err(|e| {
                    if e.is_timeout() {
                        TransportError::Timeout { after: self.timeout }
                    } else {
                        TransportError::Failed {
                            reason: e.to_string(),
                        }
                    }
                })?;

            // Drain the body so the measurement covers the full response.
            let status = response.status();
            let _ = response.bytes().map_err(|e| TransportError::Failed {
                reason: format!("failed to read response body: {e}"),
            })?;

            let elapsed = started.elapsed();
            debug!(%status, ?elapsed, "probe completed");
            Ok(elapsed)
        }
    }
}
