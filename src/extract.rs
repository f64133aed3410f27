//! Character extraction by binary search over the ordinal domain.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::oracle::{CharacterOracle, Verdict};
use crate::result::{CharacterResult, CharacterValue};
use crate::transport::Transport;

/// Inclusive ordinal range searched for each character.
///
/// Defaults to printable ASCII. Characters outside the domain cannot be
/// recovered and will resolve as terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Smallest ordinal considered, inclusive.
    pub low: u32,
    /// Largest ordinal considered, inclusive.
    pub high: u32,
}

impl Default for Domain {
    fn default() -> Self {
        // Printable ASCII: space through tilde.
        Self { low: 32, high: 126 }
    }
}

impl Domain {
    /// Number of ordinals in the domain.
    pub fn size(&self) -> u32 {
        self.high.saturating_sub(self.low) + 1
    }
}

/// Resolve one character position with the predicate oracle.
///
/// Checks the terminator predicate first, then binary-searches the
/// ordinal domain with "ordinal >= boundary" predicates. A position whose
/// ordinal lies outside the domain, and a position past the end of the
/// string, both resolve to [`CharacterValue::Terminator`]; a domain of
/// size `n` costs at most `ceil(log2(n + 1))` predicate evaluations after
/// the terminator check.
pub fn extract_character<T: Transport>(
    oracle: &mut CharacterOracle<T>,
    position: usize,
    domain: Domain,
) -> Result<CharacterResult> {
    if domain.low > domain.high {
        return Err(Error::InvariantViolation {
            low: domain.low,
            high: domain.high,
        });
    }

    let start = oracle.queries();

    let terminator = oracle.is_terminator(position)?;
    if terminator.holds {
        debug!(position, "terminator found");
        return Ok(CharacterResult {
            position,
            value: CharacterValue::Terminator,
            p_value: terminator.p_value,
            queries: oracle.queries() - start,
        });
    }

    let (answer, p_value) = search(domain, |boundary| {
        let verdict = oracle.ordinal_ge(position, boundary)?;
        trace!(position, boundary, holds = verdict.holds, "boundary probed");
        Ok(verdict)
    })?;

    let value = if answer < i64::from(domain.low) {
        // Every "ordinal >= low" probe came back false: nothing in the
        // domain matches, which is indistinguishable from end-of-string.
        CharacterValue::Terminator
    } else {
        match u32::try_from(answer).ok().and_then(char::from_u32) {
            Some(c) => CharacterValue::Char(c),
            None => CharacterValue::Terminator,
        }
    };
    debug!(position, ?value, "position resolved");

    Ok(CharacterResult {
        position,
        value,
        p_value,
        queries: oracle.queries() - start,
    })
}

/// Resolve one character position by linear scan with equality predicates.
///
/// Costs up to one evaluation per domain ordinal instead of the binary
/// search's logarithmic bound. Useful as a cross-check when the target's
/// comparison semantics are suspect (collations that reorder ordinals
/// break the binary search's monotonicity assumption but not equality).
pub fn extract_character_linear<T: Transport>(
    oracle: &mut CharacterOracle<T>,
    position: usize,
    domain: Domain,
) -> Result<CharacterResult> {
    if domain.low > domain.high {
        return Err(Error::InvariantViolation {
            low: domain.low,
            high: domain.high,
        });
    }

    let start = oracle.queries();

    let terminator = oracle.is_terminator(position)?;
    if terminator.holds {
        return Ok(CharacterResult {
            position,
            value: CharacterValue::Terminator,
            p_value: terminator.p_value,
            queries: oracle.queries() - start,
        });
    }

    for ordinal in domain.low..=domain.high {
        let verdict = oracle.ordinal_eq(position, ordinal)?;
        if verdict.holds {
            if let Some(c) = char::from_u32(ordinal) {
                return Ok(CharacterResult {
                    position,
                    value: CharacterValue::Char(c),
                    p_value: verdict.p_value,
                    queries: oracle.queries() - start,
                });
            }
        }
    }

    // No ordinal matched; treat as end-of-string.
    Ok(CharacterResult {
        position,
        value: CharacterValue::Terminator,
        p_value: terminator.p_value,
        queries: oracle.queries() - start,
    })
}

/// Binary search driven by a "ordinal >= boundary" predicate.
///
/// Returns the largest ordinal for which the predicate holds, or
/// `domain.low - 1` if it holds nowhere, along with the p-value of the
/// decisive evaluation (the last true verdict, or the last verdict when
/// none were true).
fn search(
    domain: Domain,
    mut ordinal_ge: impl FnMut(u32) -> Result<Verdict>,
) -> Result<(i64, f64)> {
    let mut low = i64::from(domain.low);
    let mut high = i64::from(domain.high);
    let mut p_value = 1.0;
    let mut last_p = 1.0;

    while low <= high {
        let mid = (low + high) / 2;
        // mid is within [domain.low, domain.high] here.
        let verdict = ordinal_ge(mid as u32)?;
        last_p = verdict.p_value;
        if verdict.holds {
            p_value = verdict.p_value;
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    if high < i64::from(domain.low) {
        p_value = last_p;
    }
    Ok((high, p_value))
}
