//! # arbor-policy
//!
//! Hierarchical policy resolution for Arbor.
//!
//! Policies attach named rules to nodes of a resource tree (systems,
//! directories, leaves) and to data types. For any leaf the engine walks the
//! tree root-first, merges the rules found on the way, overlays the policy of
//! the leaf's data type, and applies the result to decide visibility and to
//! redact records.
//!
//! ## Modules
//!
//! - [`rule`] - The rule abstraction and closure adapters
//! - [`rules`] - Ordered, named rule collections
//! - [`policy`] - Policies: owner plus resource and record rules
//! - [`engine`] - Rule application with short-circuit
//! - [`storage`] - The policy store trait
//! - [`resolver`] - Root-to-leaf rule resolution
//! - [`evaluator`] - `can_access` / `get_policy` and administrative writes
//! - [`builtin`] - Built-in rules
//! - [`registry`] - Rule construction from identifiers
//! - [`cache`] - Read-through caching in front of a store

pub mod builtin;
pub mod cache;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod registry;
pub mod resolver;
pub mod rule;
pub mod rules;
pub mod storage;

pub use cache::{PolicyCache, PolicyCacheStats};
pub use engine::{RuleOutcome, apply, evaluate, redact_records};
pub use error::{ErrorCategory, PolicyError, StorageError};
pub use evaluator::{AccessDecision, AccessEvaluator, DenyReason};
pub use policy::{Policy, Record};
pub use registry::{RuleParams, RuleRegistry};
pub use resolver::{HierarchyResolver, RecordLevel, ResourceLevel, RuleLevel};
pub use rule::{FnRule, PredicateRule, Rule, SharedRule, predicate_fn, rule_fn};
pub use rules::{NO_RULES_SET, Rules};
pub use storage::{DynPolicyStore, PolicyStore};

/// Result of resolution, evaluation and rule construction.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Result of a single store operation.
pub type StorageResult<T> = Result<T, StorageError>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        AccessDecision, AccessEvaluator, DynPolicyStore, Policy, PolicyError, PolicyResult,
        PolicyStore, Record, Rule, RuleRegistry, Rules, StorageError, StorageResult,
        predicate_fn, rule_fn,
    };
    pub use arbor_core::{Context, Resource, User};
}
