//! Policy: an owner plus resource-level and record-level rules.

use arbor_core::{Resource, User};

use crate::rule::Rule;
use crate::rules::Rules;

/// Application-defined data record a record-level rule inspects or redacts.
pub type Record = serde_json::Value;

/// Rules attached to one resource or one data type.
///
/// A policy is replaced wholesale when written to a store; merging across the
/// hierarchy only happens at read time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Policy {
    owner: User,
    resource_rules: Rules<Resource>,
    record_rules: Rules<Record>,
}

impl Policy {
    #[must_use]
    pub fn new(owner: User) -> Self {
        Self {
            owner,
            resource_rules: Rules::new(),
            record_rules: Rules::new(),
        }
    }

    /// Add a rule deciding whole-resource visibility.
    #[must_use]
    pub fn resource_level_rule(
        mut self,
        name: impl Into<String>,
        rule: impl Rule<Resource> + 'static,
    ) -> Self {
        self.resource_rules = self.resource_rules.with_rule(name, rule);
        self
    }

    /// Add a rule deciding per-record redaction.
    #[must_use]
    pub fn record_level_rule(
        mut self,
        name: impl Into<String>,
        rule: impl Rule<Record> + 'static,
    ) -> Self {
        self.record_rules = self.record_rules.with_rule(name, rule);
        self
    }

    #[must_use]
    pub fn with_resource_rules(mut self, rules: Rules<Resource>) -> Self {
        self.resource_rules = rules;
        self
    }

    #[must_use]
    pub fn with_record_rules(mut self, rules: Rules<Record>) -> Self {
        self.record_rules = rules;
        self
    }

    pub fn owner(&self) -> &User {
        &self.owner
    }

    pub fn resource_rules(&self) -> &Rules<Resource> {
        &self.resource_rules
    }

    pub fn record_rules(&self) -> &Rules<Record> {
        &self.record_rules
    }
}
