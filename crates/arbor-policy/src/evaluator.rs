//! Access evaluation.
//!
//! The evaluator combines the [`HierarchyResolver`] with the rule engine to
//! answer the two questions callers ask:
//!
//! - which of these resources may this user see, for this purpose?
//! - which record rules must a reader apply while streaming each resource?
//!
//! It also exposes the administrative writes, passed straight to the store.
//!
//! # Example
//!
//! ```ignore
//! use arbor_policy::evaluator::AccessEvaluator;
//!
//! let evaluator = AccessEvaluator::new(store);
//! let visible = evaluator.can_access(&user, &context, resources)?;
//! let record_rules = evaluator.get_policy(visible, &user, &context)?;
//! ```

use indexmap::IndexMap;
use serde_json::json;

use arbor_core::{Context, Resource, ResourceId, User};

use crate::PolicyResult;
use crate::engine::{self, RuleOutcome};
use crate::policy::{Policy, Record};
use crate::resolver::{HierarchyResolver, RecordLevel, ResourceLevel};
use crate::rules::Rules;
use crate::storage::{DynPolicyStore, PolicyStore};

// =============================================================================
// Access Decision
// =============================================================================

/// Outcome of checking one resource.
#[derive(Debug, Clone)]
pub enum AccessDecision {
    /// Access is granted; carries the resource as transformed by the rules.
    Allow(Resource),
    /// Access is denied with a reason.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// Returns `true` if access was denied.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// Get the deny reason if access was denied.
    #[must_use]
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Deny(reason) => Some(reason),
            Self::Allow(_) => None,
        }
    }

    /// The granted resource, if any.
    #[must_use]
    pub fn into_resource(self) -> Option<Resource> {
        match self {
            Self::Allow(resource) => Some(resource),
            Self::Deny(_) => None,
        }
    }
}

// =============================================================================
// Deny Reason
// =============================================================================

/// Reason for access denial.
#[derive(Debug, Clone, PartialEq)]
pub struct DenyReason {
    /// Error code for programmatic handling.
    pub code: &'static str,

    /// Human-readable error message.
    pub message: String,

    /// Additional details about the denial.
    pub details: Option<serde_json::Value>,
}

impl DenyReason {
    /// Code used when no policy is known for the resource.
    pub const NO_POLICY: &'static str = "no-policy";

    /// Code used when one of the applicable rules denied.
    pub const RULE_DENIED: &'static str = "rule-denied";

    /// Create a denial reason for a resource without any policy.
    #[must_use]
    pub fn no_policy(resource: &ResourceId) -> Self {
        Self {
            code: Self::NO_POLICY,
            message: format!("No policy is known for resource {resource}"),
            details: None,
        }
    }

    /// Create a denial reason naming the rule that denied.
    #[must_use]
    pub fn rule_denied(resource: &ResourceId, rule: &str) -> Self {
        Self {
            code: Self::RULE_DENIED,
            message: format!("Rule '{rule}' denied access to resource {resource}"),
            details: Some(json!({ "rule": rule })),
        }
    }
}

// =============================================================================
// Access Evaluator
// =============================================================================

/// Answers access questions from the current contents of a policy store.
///
/// Every read operation is a pure function of the store contents and its
/// arguments; the only writes are [`set_resource_policy`] and
/// [`set_type_policy`].
///
/// [`set_resource_policy`]: AccessEvaluator::set_resource_policy
/// [`set_type_policy`]: AccessEvaluator::set_type_policy
#[derive(Clone)]
pub struct AccessEvaluator {
    resolver: HierarchyResolver,
    store: DynPolicyStore,
}

impl AccessEvaluator {
    /// Create an evaluator over `store`.
    #[must_use]
    pub fn new(store: DynPolicyStore) -> Self {
        Self {
            resolver: HierarchyResolver::new(store.clone()),
            store,
        }
    }

    /// The resolver used for rule lookup.
    #[must_use]
    pub fn resolver(&self) -> &HierarchyResolver {
        &self.resolver
    }

    /// Decide whether `user` may see `resource` for the context's purpose.
    ///
    /// # Errors
    ///
    /// Returns an error if the hierarchy is malformed or the store fails.
    pub fn check_access(
        &self,
        user: &User,
        context: &Context,
        resource: Resource,
    ) -> PolicyResult<AccessDecision> {
        let resource_type = resource.resource_type().unwrap_or_default();
        let Some(rules) = self
            .resolver
            .applicable_rules::<ResourceLevel>(&resource, resource_type)?
        else {
            tracing::warn!(
                resource = %resource.id(),
                user = %user.id,
                purpose = context.purpose(),
                "Access denied: no policy found"
            );
            return Ok(AccessDecision::Deny(DenyReason::no_policy(resource.id())));
        };

        let resource_id = resource.id().clone();
        match engine::evaluate(resource, &rules, user, context) {
            RuleOutcome::Allowed(resource) => {
                tracing::debug!(
                    resource = %resource_id,
                    user = %user.id,
                    purpose = context.purpose(),
                    rules = %rules.message(),
                    "Access granted"
                );
                Ok(AccessDecision::Allow(resource))
            }
            RuleOutcome::Denied { rule } => {
                tracing::debug!(
                    resource = %resource_id,
                    user = %user.id,
                    purpose = context.purpose(),
                    rule = %rule,
                    "Access denied by rule"
                );
                Ok(AccessDecision::Deny(DenyReason::rule_denied(
                    &resource_id,
                    &rule,
                )))
            }
        }
    }

    /// Filter `resources` down to those `user` may see, preserving order.
    ///
    /// Resources without any policy are dropped. Granted resources are
    /// returned as transformed by their rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any hierarchy is malformed or the store fails.
    pub fn can_access<I>(
        &self,
        user: &User,
        context: &Context,
        resources: I,
    ) -> PolicyResult<Vec<Resource>>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut accessible = Vec::new();
        for resource in resources {
            if let AccessDecision::Allow(resource) = self.check_access(user, context, resource)? {
                accessible.push(resource);
            }
        }
        Ok(accessible)
    }

    /// Record-level rules for each resource, keyed in input order.
    ///
    /// Resources with no policy are omitted. `user` and `context` identify the
    /// request; the returned rules are applied per record by the reader.
    ///
    /// # Errors
    ///
    /// Returns an error if any hierarchy is malformed or the store fails.
    pub fn get_policy<I>(
        &self,
        resources: I,
        user: &User,
        context: &Context,
    ) -> PolicyResult<IndexMap<Resource, Rules<Record>>>
    where
        I: IntoIterator<Item = Resource>,
    {
        let mut policies = IndexMap::new();
        for resource in resources {
            let resource_type = resource.resource_type().unwrap_or_default();
            match self
                .resolver
                .applicable_rules::<RecordLevel>(&resource, resource_type)?
            {
                Some(rules) => {
                    policies.insert(resource, rules);
                }
                None => {
                    tracing::debug!(
                        resource = %resource.id(),
                        user = %user.id,
                        purpose = context.purpose(),
                        "Omitting resource without policy"
                    );
                }
            }
        }
        Ok(policies)
    }

    /// Replace the policy attached to exactly `resource`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn set_resource_policy(&self, resource: &Resource, policy: Policy) -> PolicyResult<Policy> {
        tracing::info!(
            resource = %resource.id(),
            owner = %policy.owner().id,
            resource_rules = %policy.resource_rules().message(),
            record_rules = %policy.record_rules().message(),
            "Setting resource policy"
        );
        Ok(self.store.set_by_resource(resource, policy)?)
    }

    /// Replace the policy attached to data type `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn set_type_policy(&self, resource_type: &str, policy: Policy) -> PolicyResult<Policy> {
        tracing::info!(
            resource_type,
            owner = %policy.owner().id,
            resource_rules = %policy.resource_rules().message(),
            record_rules = %policy.record_rules().message(),
            "Setting type policy"
        );
        Ok(self.store.set_by_type(resource_type, policy)?)
    }

    /// The policy stored at exactly `resource`, without traversal.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_direct_policy(&self, resource: &Resource) -> PolicyResult<Option<Policy>> {
        self.resolver.get_direct_policy(resource)
    }

    /// The policy stored for data type `resource_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_type_policy(&self, resource_type: &str) -> PolicyResult<Option<Policy>> {
        Ok(self.store.get_by_type(resource_type)?)
    }
}

impl std::fmt::Debug for AccessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEvaluator")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
