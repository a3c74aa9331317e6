//! Rule abstraction.
//!
//! A rule is a pure function `(value, user, context) -> Option<value>`:
//! `None` denies (or redacts) the value, `Some(v)` lets it through, possibly
//! transformed. Resource-level rules take a [`Resource`](arbor_core::Resource),
//! record-level rules take a [`Record`](crate::policy::Record).
//!
//! Closures become rules through [`rule_fn`] and [`predicate_fn`]:
//!
//! ```ignore
//! use arbor_policy::rule::{predicate_fn, rule_fn};
//!
//! let purpose_is_testing = predicate_fn(|_: &Resource, _, ctx: &Context| ctx.purpose() == "testing");
//! let strip_salary = rule_fn(|mut record: Record, _, _| {
//!     record.as_object_mut()?.remove("salary");
//!     Some(record)
//! });
//! ```

use std::sync::Arc;

use arbor_core::{Context, User};

/// A named access or redaction function over values of type `T`.
///
/// Implementations must be deterministic for a given input. A panic inside
/// `apply` is not caught anywhere in this crate and reaches the caller.
pub trait Rule<T>: Send + Sync {
    /// Apply the rule, returning `None` to deny.
    fn apply(&self, value: T, user: &User, context: &Context) -> Option<T>;
}

/// Shared handle to a rule, as stored in [`Rules`](crate::rules::Rules).
pub type SharedRule<T> = Arc<dyn Rule<T>>;

/// Rule backed by a transforming closure.
#[derive(Clone)]
pub struct FnRule<F>(F);

impl<T, F> Rule<T> for FnRule<F>
where
    F: Fn(T, &User, &Context) -> Option<T> + Send + Sync,
{
    fn apply(&self, value: T, user: &User, context: &Context) -> Option<T> {
        (self.0)(value, user, context)
    }
}

/// Wrap a closure as a transforming rule.
pub fn rule_fn<T, F>(f: F) -> FnRule<F>
where
    F: Fn(T, &User, &Context) -> Option<T> + Send + Sync,
{
    FnRule(f)
}

/// Rule backed by a boolean check; passes the value through unchanged when
/// the check holds.
#[derive(Clone)]
pub struct PredicateRule<F>(F);

impl<T, F> Rule<T> for PredicateRule<F>
where
    F: Fn(&T, &User, &Context) -> bool + Send + Sync,
{
    fn apply(&self, value: T, user: &User, context: &Context) -> Option<T> {
        (self.0)(&value, user, context).then_some(value)
    }
}

/// Wrap a closure as a predicate rule.
pub fn predicate_fn<T, F>(f: F) -> PredicateRule<F>
where
    F: Fn(&T, &User, &Context) -> bool + Send + Sync,
{
    PredicateRule(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_fn_transforms() {
        let double = rule_fn(|n: i32, _: &User, _: &Context| Some(n * 2));
        let user = User::new("alice");
        let context = Context::new("fun");

        assert_eq!(double.apply(21, &user, &context), Some(42));
    }

    #[test]
    fn test_predicate_passes_value_through() {
        let only_testing =
            predicate_fn(|_: &i32, _: &User, ctx: &Context| ctx.purpose() == "testing");
        let user = User::new("alice");

        assert_eq!(only_testing.apply(7, &user, &Context::new("testing")), Some(7));
        assert_eq!(only_testing.apply(7, &user, &Context::new("fun")), None);
    }

    #[test]
    fn test_rules_are_object_safe() {
        let rule: SharedRule<String> =
            Arc::new(predicate_fn(|v: &String, _: &User, _: &Context| !v.is_empty()));
        let user = User::new("alice");
        let context = Context::new("fun");

        assert_eq!(
            rule.apply("data".to_string(), &user, &context),
            Some("data".to_string())
        );
        assert_eq!(rule.apply(String::new(), &user, &context), None);
    }
}
