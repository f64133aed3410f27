//! Parallel extraction across positions.
//!
//! Positions are independent predicates, so they parallelize naturally:
//! each worker owns its probe (query counter, rate limiter) and works a
//! round-robin slice of positions, sharing only the read-only calibrated
//! state. Results merge positionally at join, so the output is identical
//! to a sequential run apart from wall-clock time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::extract;
use crate::result::{CharacterResult, ExtractionResult, Failure};
use crate::session::Session;
use crate::transport::Transport;

enum WorkerEvent {
    Character(CharacterResult),
    Failed { position: usize, error: Error },
    DeadlineHit,
    Finished { queries: u64 },
}

impl<T: Transport> Session<T> {
    /// Extract up to `max_length` characters with `workers` threads.
    ///
    /// A worker that resolves the terminator publishes its position so
    /// the others stop probing past it; a worker whose probes fail
    /// records the failure and exits without disturbing the rest. The
    /// merged result is positionally identical to [`Session::extract`].
    pub fn extract_parallel(&self, max_length: usize, workers: usize) -> ExtractionResult {
        let workers = workers.max(1).min(max_length.max(1));
        if workers <= 1 {
            return self.extract(max_length);
        }

        let started = Instant::now();
        let deadline = self.config().deadline.map(|d| started + d);
        let domain = self.config().domain;

        // Lowest terminator position seen so far; positions beyond it
        // are skipped.
        let terminator_floor = AtomicUsize::new(usize::MAX);
        let (tx, rx) = mpsc::channel::<WorkerEvent>();

        thread::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                let terminator_floor = &terminator_floor;
                scope.spawn(move || {
                    let mut oracle = self.oracle(deadline);
                    for position in (worker..max_length).step_by(workers) {
                        if position > terminator_floor.load(Ordering::SeqCst) {
                            continue;
                        }

                        match extract::extract_character(&mut oracle, position, domain) {
                            Ok(result) => {
                                if result.is_terminator() {
                                    terminator_floor.fetch_min(position, Ordering::SeqCst);
                                }
                                if tx.send(WorkerEvent::Character(result)).is_err() {
                                    break;
                                }
                            }
                            Err(Error::DeadlineExceeded) => {
                                warn!(worker, position, "deadline exceeded, worker stopping");
                                let _ = tx.send(WorkerEvent::DeadlineHit);
                                break;
                            }
                            Err(error) => {
                                warn!(worker, position, %error, "worker stopping on error");
                                let _ = tx.send(WorkerEvent::Failed { position, error });
                                break;
                            }
                        }
                    }
                    debug!(worker, queries = oracle.queries(), "worker finished");
                    let _ = tx.send(WorkerEvent::Finished {
                        queries: oracle.queries(),
                    });
                });
            }
            drop(tx);

            let mut characters = Vec::new();
            let mut failures: Vec<(usize, Error)> = Vec::new();
            let mut deadline_hit = false;
            let mut queries = 0u64;
            for event in rx {
                match event {
                    WorkerEvent::Character(result) => characters.push(result),
                    WorkerEvent::Failed { position, error } => failures.push((position, error)),
                    WorkerEvent::DeadlineHit => deadline_hit = true,
                    WorkerEvent::Finished { queries: n } => queries += n,
                }
            }

            failures.sort_by_key(|(position, _)| *position);
            let failure = failures
                .iter()
                .find(|(_, error)| matches!(error, Error::Transport(_)))
                .or(failures.first())
                .map(|(position, error)| match error {
                    Error::Transport(inner) => Failure::Transport {
                        position: *position,
                        reason: inner.to_string(),
                    },
                    other => Failure::Aborted {
                        position: *position,
                        reason: other.to_string(),
                    },
                })
                .or(if deadline_hit {
                    Some(Failure::DeadlineExceeded)
                } else {
                    None
                });

            let result = ExtractionResult::assemble(
                characters,
                queries,
                started.elapsed(),
                max_length,
                failure,
            );
            info!(
                workers,
                value = %result.value,
                queries = result.queries,
                complete = result.is_complete(),
                "parallel extraction finished"
            );
            result
        })
    }
}
