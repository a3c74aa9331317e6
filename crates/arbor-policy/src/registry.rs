//! Rule registry.
//!
//! Maps rule identifiers, as written in configuration, to statically compiled
//! constructors. Resource-level and record-level rules live in separate
//! tables since the same identifier may build different rules at each level.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arbor_core::Resource;

use crate::PolicyResult;
use crate::builtin::{
    AuthorisationRule, MaskFieldsRule, PassThroughRule, PurposeRule, RedactFieldsRule, RoleRule,
    SerialisedFormatRule,
};
use crate::error::PolicyError;
use crate::policy::Record;
use crate::rule::SharedRule;

/// Parameters passed to a rule constructor.
pub type RuleParams = BTreeMap<String, String>;

/// Builds a rule from its parameters.
pub type RuleConstructor<T> = Box<dyn Fn(&RuleParams) -> PolicyResult<SharedRule<T>> + Send + Sync>;

/// Identifiers of the built-in rules.
pub mod ids {
    pub const PASS_THROUGH: &str = "pass-through";
    pub const SERIALISED_FORMAT: &str = "serialised-format";
    pub const PURPOSE: &str = "purpose";
    pub const ROLE: &str = "role";
    pub const AUTH: &str = "auth";
    pub const REDACT_FIELDS: &str = "redact-fields";
    pub const MASK_FIELDS: &str = "mask-fields";
}

/// Explicit table of rule constructors.
///
/// The registry is a plain value owned by whoever builds policies from
/// configuration; nothing is registered globally.
pub struct RuleRegistry {
    resource_rules: BTreeMap<String, RuleConstructor<Resource>>,
    record_rules: BTreeMap<String, RuleConstructor<Record>>,
}

impl RuleRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resource_rules: BTreeMap::new(),
            record_rules: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in rule.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        registry.register_resource_rule(ids::PASS_THROUGH, |_| Ok(Arc::new(PassThroughRule)));
        registry.register_resource_rule(ids::SERIALISED_FORMAT, |params| {
            let format = required(ids::SERIALISED_FORMAT, params, "format")?;
            Ok(Arc::new(SerialisedFormatRule::new(format)))
        });
        registry.register_resource_rule(ids::PURPOSE, |params| {
            Ok(Arc::new(PurposeRule::new(required(ids::PURPOSE, params, "purpose")?)))
        });
        registry.register_resource_rule(ids::ROLE, |params| {
            Ok(Arc::new(RoleRule::new(required(ids::ROLE, params, "role")?)))
        });
        registry.register_resource_rule(ids::AUTH, |params| {
            Ok(Arc::new(AuthorisationRule::new(required(ids::AUTH, params, "auth")?)))
        });

        registry.register_record_rule(ids::PASS_THROUGH, |_| Ok(Arc::new(PassThroughRule)));
        registry.register_record_rule(ids::PURPOSE, |params| {
            Ok(Arc::new(PurposeRule::new(required(ids::PURPOSE, params, "purpose")?)))
        });
        registry.register_record_rule(ids::ROLE, |params| {
            Ok(Arc::new(RoleRule::new(required(ids::ROLE, params, "role")?)))
        });
        registry.register_record_rule(ids::AUTH, |params| {
            Ok(Arc::new(AuthorisationRule::new(required(ids::AUTH, params, "auth")?)))
        });
        registry.register_record_rule(ids::REDACT_FIELDS, |params| {
            let mut rule = RedactFieldsRule::new(field_list(ids::REDACT_FIELDS, params)?);
            if let Some(role) = params.get("exempt_role") {
                rule = rule.exempt_role(role.as_str());
            }
            Ok(Arc::new(rule))
        });
        registry.register_record_rule(ids::MASK_FIELDS, |params| {
            let mut rule = MaskFieldsRule::new(field_list(ids::MASK_FIELDS, params)?);
            if let Some(mask) = params.get("mask") {
                rule = rule.mask(mask.as_str());
            }
            Ok(Arc::new(rule))
        });

        registry
    }

    /// Register a resource-level rule constructor, replacing any existing one.
    pub fn register_resource_rule<F>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(&RuleParams) -> PolicyResult<SharedRule<Resource>> + Send + Sync + 'static,
    {
        self.resource_rules.insert(id.into(), Box::new(constructor));
    }

    /// Register a record-level rule constructor, replacing any existing one.
    pub fn register_record_rule<F>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(&RuleParams) -> PolicyResult<SharedRule<Record>> + Send + Sync + 'static,
    {
        self.record_rules.insert(id.into(), Box::new(constructor));
    }

    /// Build the resource-level rule registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRule` if nothing is registered under `id`, or the
    /// constructor's error if `params` are invalid.
    pub fn build_resource_rule(
        &self,
        id: &str,
        params: &RuleParams,
    ) -> PolicyResult<SharedRule<Resource>> {
        let constructor = self
            .resource_rules
            .get(id)
            .ok_or_else(|| PolicyError::unknown_rule("resource", id))?;
        constructor(params)
    }

    /// Build the record-level rule registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRule` if nothing is registered under `id`, or the
    /// constructor's error if `params` are invalid.
    pub fn build_record_rule(&self, id: &str, params: &RuleParams) -> PolicyResult<SharedRule<Record>> {
        let constructor = self
            .record_rules
            .get(id)
            .ok_or_else(|| PolicyError::unknown_rule("record", id))?;
        constructor(params)
    }

    pub fn resource_rule_ids(&self) -> impl Iterator<Item = &str> {
        self.resource_rules.keys().map(String::as_str)
    }

    pub fn record_rule_ids(&self) -> impl Iterator<Item = &str> {
        self.record_rules.keys().map(String::as_str)
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("resource_rules", &self.resource_rules.keys().collect::<Vec<_>>())
            .field("record_rules", &self.record_rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A parameter that must be present and non-blank.
///
/// # Errors
///
/// Returns `InvalidRuleParams` naming the missing key.
pub fn required<'a>(id: &str, params: &'a RuleParams, key: &str) -> PolicyResult<&'a str> {
    match params.get(key).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(PolicyError::invalid_rule_params(
            id,
            format!("missing required parameter '{key}'"),
        )),
    }
}

/// The comma-separated `fields` parameter, trimmed, with blanks dropped.
fn field_list(id: &str, params: &RuleParams) -> PolicyResult<Vec<String>> {
    let fields: Vec<String> = required(id, params, "fields")?
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect();

    if fields.is_empty() {
        return Err(PolicyError::invalid_rule_params(id, "no fields listed"));
    }
    Ok(fields)
}
