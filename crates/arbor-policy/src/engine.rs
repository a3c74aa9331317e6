//! Rule application.
//!
//! Rules are applied as a fold over the ordered collection: each rule receives
//! the value produced by the previous one, and the first rule returning `None`
//! stops the fold. The same routine serves whole-resource filtering and
//! per-record redaction.
//!
//! # Example
//!
//! ```ignore
//! use arbor_policy::engine::{apply, redact_records};
//!
//! // Resource level: is this resource visible at all?
//! let visible = apply(resource, &resource_rules, &user, &context);
//!
//! // Record level: redact a stream of records read from the resource.
//! let redacted: Vec<Record> = redact_records(records, &record_rules, &user, &context).collect();
//! ```

use arbor_core::{Context, User};

use crate::rules::Rules;

// =============================================================================
// Rule Outcome
// =============================================================================

/// Result of running a value through a rule collection.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome<T> {
    /// Every rule passed; carries the (possibly transformed) value.
    Allowed(T),
    /// A rule returned `None`; later rules were not evaluated.
    Denied {
        /// Name of the rule that denied.
        rule: String,
    },
}

impl<T> RuleOutcome<T> {
    /// Returns `true` if every rule passed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Name of the denying rule, if any.
    #[must_use]
    pub fn denied_by(&self) -> Option<&str> {
        match self {
            Self::Allowed(_) => None,
            Self::Denied { rule } => Some(rule.as_str()),
        }
    }

    /// Drop the denial detail.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Allowed(value) => Some(value),
            Self::Denied { .. } => None,
        }
    }
}

// =============================================================================
// Application
// =============================================================================

/// Run `value` through `rules` in order, reporting which rule denied.
pub fn evaluate<T>(value: T, rules: &Rules<T>, user: &User, context: &Context) -> RuleOutcome<T> {
    let mut current = value;

    for (name, rule) in rules.iter() {
        match rule.apply(current, user, context) {
            Some(next) => {
                tracing::trace!(rule = name, "Rule passed");
                current = next;
            }
            None => {
                tracing::trace!(
                    rule = name,
                    user = %user.id,
                    purpose = context.purpose(),
                    "Rule denied"
                );
                return RuleOutcome::Denied {
                    rule: name.to_string(),
                };
            }
        }
    }

    RuleOutcome::Allowed(current)
}

/// Run `value` through `rules` in order.
///
/// Returns `None` as soon as one rule denies, otherwise the final value. An
/// empty collection passes the value through unchanged.
pub fn apply<T>(value: T, rules: &Rules<T>, user: &User, context: &Context) -> Option<T> {
    evaluate(value, rules, user, context).into_option()
}

/// Apply `rules` to every record of a stream, dropping denied records.
pub fn redact_records<'a, T, I>(
    records: I,
    rules: &'a Rules<T>,
    user: &'a User,
    context: &'a Context,
) -> impl Iterator<Item = T> + 'a
where
    I: IntoIterator<Item = T>,
    I::IntoIter: 'a,
    T: 'a,
{
    records
        .into_iter()
        .filter_map(move |record| apply(record, rules, user, context))
}
