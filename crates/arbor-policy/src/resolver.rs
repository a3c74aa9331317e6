//! Hierarchical policy resolution.
//!
//! The resolver computes the effective rules for a resource by walking its
//! ancestor chain from the root down to the resource itself, merging the
//! rules of every policy found on the way, and finally overlaying the policy
//! registered for the resource's data type.
//!
//! # Merge Order
//!
//! 1. Root system policy
//! 2. Each directory policy, outermost first
//! 3. The resource's own policy
//! 4. The type policy (resource level only)
//!
//! A rule name seen later overwrites an earlier rule with the same name, in
//! place. The message lists contributions in the same order.
//!
//! # Example
//!
//! ```ignore
//! use arbor_policy::resolver::{HierarchyResolver, RecordLevel, ResourceLevel};
//!
//! let resolver = HierarchyResolver::new(store);
//! match resolver.applicable_rules::<ResourceLevel>(&file, "TestObj1")? {
//!     Some(rules) => println!("{}", rules.message()),
//!     None => println!("no policy known for {}", file.id()),
//! }
//! ```

use std::fmt;

use arbor_core::Resource;

use crate::PolicyResult;
use crate::policy::{Policy, Record};
use crate::rules::Rules;
use crate::storage::{DynPolicyStore, PolicyStore};

// =============================================================================
// Rule Levels
// =============================================================================

/// Selects which rule collection of a [`Policy`] a resolution reads.
pub trait RuleLevel {
    /// The value type the level's rules operate on.
    type Value;

    /// Level name used in logs and errors.
    const NAME: &'static str;

    /// Whether the type policy's rules are merged at this level.
    const MERGES_TYPE_RULES: bool;

    /// The level's rules within `policy`.
    fn rules(policy: &Policy) -> &Rules<Self::Value>;
}

/// Whole-resource visibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLevel;

/// Per-record redaction rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLevel;

impl RuleLevel for ResourceLevel {
    type Value = Resource;
    const NAME: &'static str = "resource";
    const MERGES_TYPE_RULES: bool = true;

    fn rules(policy: &Policy) -> &Rules<Resource> {
        policy.resource_rules()
    }
}

impl RuleLevel for RecordLevel {
    type Value = Record;
    const NAME: &'static str = "record";
    const MERGES_TYPE_RULES: bool = false;

    fn rules(policy: &Policy) -> &Rules<Record> {
        policy.record_rules()
    }
}

// =============================================================================
// Hierarchy Resolver
// =============================================================================

/// Merges policies along a resource's ancestor chain.
///
/// Resolution is a pure function of the store contents: repeated calls
/// against an unchanged store return identical rules, order and message.
#[derive(Clone)]
pub struct HierarchyResolver {
    store: DynPolicyStore,
}

impl HierarchyResolver {
    /// Create a resolver reading from `store`.
    #[must_use]
    pub fn new(store: DynPolicyStore) -> Self {
        Self { store }
    }

    /// Compute the rules applying to `resource` at level `L`.
    ///
    /// `resource_type` selects the type policy; an empty string skips the
    /// type lookup.
    ///
    /// Returns `Ok(None)` when neither the chain nor the type lookup yielded
    /// any policy, and `Ok(Some(rules))` otherwise, even if `rules` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the ancestor chain is malformed or the store fails.
    pub fn applicable_rules<L: RuleLevel>(
        &self,
        resource: &Resource,
        resource_type: &str,
    ) -> PolicyResult<Option<Rules<L::Value>>> {
        let chain = resource.ancestor_chain()?;

        let mut merged = Rules::new();
        let mut policy_found = false;

        for node in chain {
            if let Some(policy) = self.store.get_by_resource(node)? {
                tracing::trace!(
                    resource = %resource.id(),
                    node = %node.id(),
                    level = L::NAME,
                    rules = L::rules(&policy).len(),
                    "Merging hierarchy policy"
                );
                policy_found = true;
                merged.merge(L::rules(&policy));
            }
        }

        if !resource_type.is_empty()
            && let Some(policy) = self.store.get_by_type(resource_type)?
        {
            policy_found = true;
            if L::MERGES_TYPE_RULES {
                tracing::trace!(
                    resource = %resource.id(),
                    resource_type,
                    level = L::NAME,
                    rules = L::rules(&policy).len(),
                    "Merging type policy"
                );
                merged.merge(L::rules(&policy));
            }
        }

        if !policy_found {
            tracing::debug!(
                resource = %resource.id(),
                resource_type,
                level = L::NAME,
                "No policy found"
            );
            return Ok(None);
        }

        tracing::debug!(
            resource = %resource.id(),
            resource_type,
            level = L::NAME,
            rules = merged.len(),
            message = %merged.message(),
            "Resolved applicable rules"
        );

        Ok(Some(merged))
    }

    /// The policy stored at exactly this resource, without traversal.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn get_direct_policy(&self, resource: &Resource) -> PolicyResult<Option<Policy>> {
        Ok(self.store.get_by_resource(resource)?)
    }
}

impl fmt::Debug for HierarchyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchyResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arbor_core::{Context, User};

    use super::*;
    use crate::rule::predicate_fn;
    use crate::storage::mock::MockPolicyStore;

    fn allow_resource() -> impl crate::rule::Rule<Resource> + 'static {
        predicate_fn(|_: &Resource, _: &User, _: &Context| true)
    }

    fn allow_record() -> impl crate::rule::Rule<Record> + 'static {
        predicate_fn(|_: &Record, _: &User, _: &Context| true)
    }

    struct Tree {
        system: Resource,
        directory: Resource,
        file: Resource,
    }

    fn tree() -> Tree {
        let system = Resource::system("/file");
        let directory = Resource::directory("/file/temp", &system).unwrap();
        let file = Resource::leaf("/file/temp/TestObj_001.txt", &directory)
            .resource_type("TestObj1")
            .serialised_format("txt")
            .build()
            .unwrap();
        Tree {
            system,
            directory,
            file,
        }
    }

    fn owner() -> User {
        User::new("owner")
    }

    fn setup() -> (Arc<MockPolicyStore>, HierarchyResolver, Tree) {
        let store = Arc::new(MockPolicyStore::new());
        let resolver = HierarchyResolver::new(store.clone());
        (store, resolver, tree())
    }

    #[test]
    fn test_hierarchy_rules_merge_root_first() {
        let (store, resolver, tree) = setup();
        store
            .set_by_resource(
                &tree.system,
                Policy::new(owner()).resource_level_rule("system rule", allow_resource()),
            )
            .unwrap();
        store
            .set_by_resource(
                &tree.directory,
                Policy::new(owner()).resource_level_rule("directory rule", allow_resource()),
            )
            .unwrap();
        store
            .set_by_resource(
                &tree.file,
                Policy::new(owner()).resource_level_rule("file rule", allow_resource()),
            )
            .unwrap();

        let rules = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap()
            .unwrap();

        assert_eq!(
            rules.names().collect::<Vec<_>>(),
            ["system rule", "directory rule", "file rule"]
        );
        assert_eq!(rules.message(), "system rule, directory rule, file rule");
    }

    #[test]
    fn test_no_policy_anywhere_is_none() {
        let (_, resolver, tree) = setup();

        assert!(
            resolver
                .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
                .unwrap()
                .is_none()
        );
        assert!(
            resolver
                .applicable_rules::<RecordLevel>(&tree.file, "TestObj1")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_empty_policy_is_pass_through_not_none() {
        let (store, resolver, tree) = setup();
        store
            .set_by_resource(&tree.directory, Policy::new(owner()))
            .unwrap();

        let rules = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap()
            .expect("a policy exists on the chain");
        assert!(rules.is_empty());
    }

    #[test]
    fn test_type_rules_merge_after_hierarchy_at_resource_level_only() {
        let (store, resolver, tree) = setup();
        store
            .set_by_resource(
                &tree.file,
                Policy::new(owner())
                    .resource_level_rule("file rule", allow_resource())
                    .record_level_rule("file record rule", allow_record()),
            )
            .unwrap();
        store
            .set_by_type(
                "TestObj1",
                Policy::new(owner())
                    .resource_level_rule("type rule", allow_resource())
                    .record_level_rule("type record rule", allow_record()),
            )
            .unwrap();

        let resource_rules = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap()
            .unwrap();
        assert_eq!(resource_rules.message(), "file rule, type rule");

        let record_rules = resolver
            .applicable_rules::<RecordLevel>(&tree.file, "TestObj1")
            .unwrap()
            .unwrap();
        assert_eq!(record_rules.message(), "file record rule");
    }

    #[test]
    fn test_type_policy_alone_counts_as_found() {
        let (store, resolver, tree) = setup();
        store
            .set_by_type(
                "TestObj1",
                Policy::new(owner()).resource_level_rule("type rule", allow_resource()),
            )
            .unwrap();

        let resource_rules = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap()
            .unwrap();
        assert_eq!(resource_rules.len(), 1);

        let record_rules = resolver
            .applicable_rules::<RecordLevel>(&tree.file, "TestObj1")
            .unwrap()
            .unwrap();
        assert!(record_rules.is_empty());

        assert!(
            resolver
                .applicable_rules::<ResourceLevel>(&tree.file, "TestObj2")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_empty_type_skips_type_lookup() {
        let (store, resolver, tree) = setup();
        store
            .set_by_type(
                "",
                Policy::new(owner()).resource_level_rule("blank type", allow_resource()),
            )
            .unwrap();

        assert!(
            resolver
                .applicable_rules::<ResourceLevel>(&tree.directory, "")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_descendant_rule_overwrites_ancestor_rule_of_same_name() {
        let (store, resolver, tree) = setup();
        let system_rule: Arc<dyn crate::rule::Rule<Resource>> = Arc::new(allow_resource());
        let file_rule: Arc<dyn crate::rule::Rule<Resource>> = Arc::new(allow_resource());

        let mut system_rules = Rules::new();
        system_rules.insert("shared", Arc::clone(&system_rule));
        let mut file_rules = Rules::new();
        file_rules.insert("shared", Arc::clone(&file_rule));

        store
            .set_by_resource(
                &tree.system,
                Policy::new(owner()).with_resource_rules(system_rules),
            )
            .unwrap();
        store
            .set_by_resource(&tree.file, Policy::new(owner()).with_resource_rules(file_rules))
            .unwrap();

        let rules = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap()
            .unwrap();

        assert_eq!(rules.len(), 1);
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(rules.get("shared").unwrap()),
            Arc::as_ptr(&file_rule)
        ));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (store, resolver, tree) = setup();
        store
            .set_by_resource(
                &tree.system,
                Policy::new(owner())
                    .resource_level_rule("b", allow_resource())
                    .resource_level_rule("a", allow_resource()),
            )
            .unwrap();

        let first = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap();
        let second = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.unwrap().message(), "b, a");
    }

    #[test]
    fn test_lookups_are_bounded_by_depth() {
        let (store, resolver, tree) = setup();
        resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap();
        // three chain nodes plus one type lookup
        assert_eq!(store.read_count(), 4);
    }

    #[test]
    fn test_store_failure_is_an_error() {
        let store = Arc::new(MockPolicyStore::failing());
        let resolver = HierarchyResolver::new(store);
        let tree = tree();

        let err = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "TestObj1")
            .unwrap_err();
        assert!(matches!(err, crate::PolicyError::Storage(_)));
    }

    #[test]
    fn test_direct_policy_does_not_traverse() {
        let (store, resolver, tree) = setup();
        store
            .set_by_resource(
                &tree.system,
                Policy::new(owner()).resource_level_rule("system rule", allow_resource()),
            )
            .unwrap();

        assert!(resolver.get_direct_policy(&tree.file).unwrap().is_none());
        assert!(resolver.get_direct_policy(&tree.system).unwrap().is_some());
    }

    #[test]
    fn test_resolved_message_matches_stored_policy() {
        let (store, resolver, tree) = setup();
        store
            .set_by_resource(
                &tree.file,
                Policy::new(owner())
                    .resource_level_rule("shared", allow_resource())
                    .resource_level_rule("other", allow_resource())
                    .resource_level_rule("shared", allow_resource()),
            )
            .unwrap();

        let stored = resolver.get_direct_policy(&tree.file).unwrap().unwrap();
        let resolved = resolver
            .applicable_rules::<ResourceLevel>(&tree.file, "")
            .unwrap()
            .unwrap();

        assert_eq!(resolved.message(), stored.resource_rules().message());
        assert_eq!(resolved.message(), "shared, other, shared");
    }
}
