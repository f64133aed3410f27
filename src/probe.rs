//! The timing oracle: one network probe per call.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::TransportError;
use crate::payload::PayloadTemplate;
use crate::statistics::LatencySample;
use crate::transport::Transport;

/// Issues single probes and counts them.
///
/// Each worker owns its probe: the query counter and rate-limiter state
/// are exclusively owned and merged only at join time, so the network
/// path has no shared critical section.
#[derive(Debug)]
pub struct TimingProbe<T: Transport> {
    transport: T,
    template: PayloadTemplate,
    min_interval: Option<Duration>,
    last_probe: Option<Instant>,
    queries: u64,
}

impl<T: Transport> TimingProbe<T> {
    /// Create a probe over `transport` rendering `template`.
    pub fn new(transport: T, template: PayloadTemplate) -> Self {
        Self {
            transport,
            template,
            min_interval: None,
            last_probe: None,
            queries: 0,
        }
    }

    /// Enforce a minimum interval between consecutive probes from this
    /// worker.
    pub fn with_min_interval(mut self, interval: Option<Duration>) -> Self {
        self.min_interval = interval;
        self
    }

    /// Network probes issued so far, including failed attempts.
    pub fn queries(&self) -> u64 {
        self.queries
    }

    /// Issue one probe for `condition` with `delay` armed in the payload.
    ///
    /// Synchronous, single round trip, no retries; transport failures
    /// propagate. The query counter increments for every attempt.
    pub fn probe_condition(
        &mut self,
        condition: &str,
        delay: Duration,
    ) -> Result<LatencySample, TransportError> {
        if let (Some(min), Some(last)) = (self.min_interval, self.last_probe) {
            let since = last.elapsed();
            if since < min {
                std::thread::sleep(min - since);
            }
        }

        let payload = self.template.render(condition, delay);
        self.queries += 1;
        self.last_probe = Some(Instant::now());

        let latency = self.transport.probe(&payload)?;
        trace!(condition, ?latency, "probe");
        Ok(LatencySample::new(latency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    struct Recording {
        payloads: Mutex<Vec<String>>,
        calls: AtomicU64,
    }

    impl Transport for Recording {
        fn probe(&self, payload: &str) -> Result<Duration, TransportError> {
            self.payloads.lock().unwrap().push(payload.to_string());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Duration::from_millis(5))
        }
    }

    #[test]
    fn probe_renders_and_counts() {
        let transport = Recording {
            payloads: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
        };
        let template = PayloadTemplate::new("c={condition};d={delay}").unwrap();
        let mut probe = TimingProbe::new(&transport, template);

        let sample = probe
            .probe_condition("1=1", Duration::from_millis(1500))
            .unwrap();
        assert_eq!(sample.latency(), Duration::from_millis(5));
        assert_eq!(probe.queries(), 1);
        assert_eq!(
            transport.payloads.lock().unwrap().as_slice(),
            &["c=1=1;d=1.5".to_string()]
        );

        probe.probe_condition("1=0", Duration::ZERO).unwrap();
        assert_eq!(probe.queries(), 2);
    }

    #[test]
    fn min_interval_spaces_probes() {
        let transport = Recording {
            payloads: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
        };
        let template = PayloadTemplate::new("{condition}").unwrap();
        let mut probe = TimingProbe::new(&transport, template)
            .with_min_interval(Some(Duration::from_millis(20)));

        let started = Instant::now();
        probe.probe_condition("1=0", Duration::ZERO).unwrap();
        probe.probe_condition("1=0", Duration::ZERO).unwrap();
        probe.probe_condition("1=0", Duration::ZERO).unwrap();

        // Two enforced gaps of >= 20ms between three probes.
        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }
}
