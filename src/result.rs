//! Extraction result types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The recovered value at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterValue {
    /// A recovered character.
    Char(char),
    /// End-of-string sentinel.
    Terminator,
}

/// One recovered character position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterResult {
    /// Zero-indexed position within the secret.
    pub position: usize,
    /// Recovered character or the terminator sentinel.
    pub value: CharacterValue,
    /// p-value of the decisive predicate for this position.
    pub p_value: f64,
    /// Network probes spent on this position.
    pub queries: u64,
}

impl CharacterResult {
    /// True if this position held the end-of-string sentinel.
    pub fn is_terminator(&self) -> bool {
        matches!(self.value, CharacterValue::Terminator)
    }
}

/// Why an extraction ended without fully resolving the target string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    /// A probe failed after exhausting its retries.
    Transport {
        /// Position being extracted when the transport gave out.
        position: usize,
        /// Human-readable cause.
        reason: String,
    },
    /// The session deadline was reached.
    DeadlineExceeded,
    /// Extraction aborted for a non-transport reason.
    Aborted {
        /// Position being extracted when the session aborted.
        position: usize,
        /// Human-readable cause.
        reason: String,
    },
}

/// Result of extracting a string, possibly partial.
///
/// Partial results are always returned with explicit markers; nothing is
/// silently truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// The recovered string: the contiguous character prefix starting at
    /// position 0.
    pub value: String,
    /// Per-position results, sorted by position, with any characters
    /// speculatively resolved past the terminator discarded.
    pub characters: Vec<CharacterResult>,
    /// Total network probes issued during extraction.
    pub queries: u64,
    /// Wall-clock time spent extracting.
    pub elapsed: Duration,
    /// Positions that should have been resolved but were not, ascending.
    pub unresolved: Vec<usize>,
    /// Why the extraction ended early, if it did.
    pub failure: Option<Failure>,
}

impl ExtractionResult {
    /// True if the string was fully resolved (terminator found or
    /// `max_length` reached with every position recovered).
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.unresolved.is_empty()
    }

    /// Convert a partial result into the error taxonomy.
    pub fn check(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::Incomplete {
                unresolved: self.unresolved.clone(),
            })
        }
    }

    /// Merge per-position results into a final, positionally-sorted
    /// result.
    ///
    /// Determines the effective string length as the position of the
    /// first terminator with no unresolved gap below it; characters past
    /// a terminator are discarded. Positions below the effective length
    /// (or below the first claimed terminator / `max_length` when the
    /// prefix has gaps) that are missing are reported as unresolved.
    pub(crate) fn assemble(
        mut characters: Vec<CharacterResult>,
        queries: u64,
        elapsed: Duration,
        max_length: usize,
        failure: Option<Failure>,
    ) -> Self {
        characters.sort_by_key(|c| c.position);

        // Walk the contiguous prefix from position 0.
        let mut value = String::new();
        let mut accepted_terminator = None;
        let mut expected = 0usize;
        for result in &characters {
            if result.position != expected {
                break;
            }
            match result.value {
                CharacterValue::Char(c) => {
                    value.push(c);
                    expected += 1;
                }
                CharacterValue::Terminator => {
                    accepted_terminator = Some(result.position);
                    break;
                }
            }
        }

        let (limit, unresolved) = match accepted_terminator {
            Some(position) => (position, Vec::new()),
            None => {
                // A terminator past a gap still bounds the length that
                // matters; otherwise everything up to max_length does.
                let bound = characters
                    .iter()
                    .find(|r| r.is_terminator())
                    .map(|r| r.position)
                    .unwrap_or(max_length);
                let resolved: Vec<usize> = characters.iter().map(|r| r.position).collect();
                let unresolved = (0..bound)
                    .filter(|p| resolved.binary_search(p).is_err())
                    .collect();
                (bound, unresolved)
            }
        };

        characters.retain(|r| r.position <= limit);

        // A deadline that a worker observed after everything had
        // already resolved leaves nothing incomplete to report.
        let failure = match failure {
            Some(Failure::DeadlineExceeded) if unresolved.is_empty() => None,
            other => other,
        };

        Self {
            value,
            characters,
            queries,
            elapsed,
            unresolved,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(position: usize, c: char) -> CharacterResult {
        CharacterResult {
            position,
            value: CharacterValue::Char(c),
            p_value: 0.001,
            queries: 8,
        }
    }

    fn term(position: usize) -> CharacterResult {
        CharacterResult {
            position,
            value: CharacterValue::Terminator,
            p_value: 0.001,
            queries: 1,
        }
    }

    #[test]
    fn assemble_out_of_order_results() {
        let results = vec![ch(2, 'c'), ch(0, 'a'), term(3), ch(1, 'b')];
        let merged =
            ExtractionResult::assemble(results, 40, Duration::from_secs(1), 10, None);

        assert_eq!(merged.value, "abc");
        assert!(merged.is_complete());
        assert_eq!(merged.characters.len(), 4);
        assert_eq!(
            merged.characters.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn speculative_results_past_terminator_are_discarded() {
        let results = vec![ch(0, 'h'), ch(1, 'i'), term(2), ch(3, 'x'), ch(5, 'y')];
        let merged = ExtractionResult::assemble(results, 50, Duration::ZERO, 10, None);

        assert_eq!(merged.value, "hi");
        assert!(merged.is_complete());
        assert!(merged.characters.iter().all(|r| r.position <= 2));
    }

    #[test]
    fn gap_below_terminator_is_unresolved() {
        // Position 1 missing: the terminator at 3 cannot be accepted yet.
        let results = vec![ch(0, 'a'), ch(2, 'c'), term(3)];
        let merged = ExtractionResult::assemble(results, 30, Duration::ZERO, 10, None);

        assert_eq!(merged.value, "a");
        assert_eq!(merged.unresolved, vec![1]);
        assert!(!merged.is_complete());
        assert!(merged.check().is_err());
    }

    #[test]
    fn no_terminator_counts_gaps_up_to_max_length() {
        let results = vec![ch(0, 'a'), ch(1, 'b')];
        let merged = ExtractionResult::assemble(results, 20, Duration::ZERO, 5, None);

        assert_eq!(merged.value, "ab");
        assert_eq!(merged.unresolved, vec![2, 3, 4]);
        assert!(!merged.is_complete());
    }

    #[test]
    fn full_length_without_terminator_is_complete() {
        let results = vec![ch(0, 'a'), ch(1, 'b'), ch(2, 'c')];
        let merged = ExtractionResult::assemble(results, 24, Duration::ZERO, 3, None);

        assert_eq!(merged.value, "abc");
        assert!(merged.is_complete());
    }

    #[test]
    fn deadline_after_full_resolution_is_not_a_failure() {
        let results = vec![ch(0, 'a'), ch(1, 'b'), term(2)];
        let merged = ExtractionResult::assemble(
            results,
            80,
            Duration::ZERO,
            10,
            Some(Failure::DeadlineExceeded),
        );

        assert_eq!(merged.value, "ab");
        assert!(merged.failure.is_none());
        assert!(merged.is_complete());
        assert!(merged.check().is_ok());
    }

    #[test]
    fn deadline_with_unresolved_positions_is_kept() {
        let results = vec![ch(0, 'a')];
        let merged = ExtractionResult::assemble(
            results,
            40,
            Duration::ZERO,
            3,
            Some(Failure::DeadlineExceeded),
        );

        assert_eq!(merged.failure, Some(Failure::DeadlineExceeded));
        assert_eq!(merged.unresolved, vec![1, 2]);
        assert!(!merged.is_complete());
    }

    #[test]
    fn serializes_round_trip() {
        let merged = ExtractionResult::assemble(
            vec![ch(0, 'a'), term(1)],
            9,
            Duration::from_millis(1234),
            10,
            Some(Failure::DeadlineExceeded),
        );
        let json = serde_json::to_string(&merged).unwrap();
        let back: ExtractionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, merged.value);
        assert_eq!(back.failure, merged.failure);
        assert_eq!(back.elapsed, merged.elapsed);
    }
}
