//! Ordered, named rule collections.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::rule::{Rule, SharedRule};

/// Message reported by a collection nothing was ever added to.
pub const NO_RULES_SET: &str = "no rules set";

/// An ordered mapping from rule name to rule.
///
/// Iteration follows first insertion. Inserting a name that is already
/// present replaces the rule but keeps its original position, so the last
/// write wins. The [`message`](Rules::message) lists every contribution in
/// insertion order, replaced ones included.
pub struct Rules<T> {
    rules: IndexMap<String, SharedRule<T>>,
    contributions: Vec<String>,
}

impl<T> Rules<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: IndexMap::new(),
            contributions: Vec::new(),
        }
    }

    /// Builder-style variant of [`insert`](Rules::insert).
    #[must_use]
    pub fn with_rule(mut self, name: impl Into<String>, rule: impl Rule<T> + 'static) -> Self {
        self.insert(name, Arc::new(rule));
        self
    }

    /// Insert or replace the rule stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, rule: SharedRule<T>) {
        let name = name.into();
        self.contributions.push(name.clone());
        self.rules.insert(name, rule);
    }

    /// Merge every rule of `other` into this collection, in `other`'s order.
    ///
    /// The message gains all of `other`'s contributions, including names
    /// `other` itself replaced.
    pub fn merge(&mut self, other: &Rules<T>) {
        for (name, rule) in &other.rules {
            self.rules.insert(name.clone(), Arc::clone(rule));
        }
        self.contributions.extend(other.contributions.iter().cloned());
    }

    /// Human-readable summary: contributing rule names joined by `", "`.
    pub fn message(&self) -> String {
        if self.contributions.is_empty() {
            NO_RULES_SET.to_string()
        } else {
            self.contributions.join(", ")
        }
    }

    pub fn get(&self, name: &str) -> Option<&SharedRule<T>> {
        self.rules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Rule names in application order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedRule<T>)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for Rules<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Rules<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            contributions: self.contributions.clone(),
        }
    }
}

/// Two collections are equal when they hold the same rule instances under the
/// same names, in the same order, with the same message.
impl<T> PartialEq for Rules<T> {
    fn eq(&self, other: &Self) -> bool {
        self.contributions == other.contributions
            && self.rules.len() == other.rules.len()
            && self
                .rules
                .iter()
                .zip(&other.rules)
                .all(|((a_name, a_rule), (b_name, b_rule))| {
                    a_name == b_name && std::ptr::addr_eq(Arc::as_ptr(a_rule), Arc::as_ptr(b_rule))
                })
    }
}

impl<T> fmt::Debug for Rules<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rules")
            .field("names", &self.rules.keys().collect::<Vec<_>>())
            .field("message", &self.message())
            .finish()
    }
}
