//! Populating a policy store from configuration.
//!
//! Bootstrap runs once at startup:
//!
//! 1. Materialise the resource tree from `bootstrap.resources`
//! 2. Build every configured rule through a [`RuleRegistry`]
//! 3. Write resource and type policies to the store

use arbor_core::User;
use arbor_db_memory::{create_cached_policy_store, create_policy_store};
use arbor_policy::{AccessEvaluator, DynPolicyStore, Policy, PolicyStore, RuleRegistry, Rules};

use crate::hierarchy::ResourceCatalog;
use crate::settings::{AppConfig, BootstrapConfig, CacheConfig, RuleSpec};
use crate::{ConfigError, ConfigResult};

/// Everything a caller needs after startup.
#[derive(Debug)]
pub struct Bootstrapped {
    pub catalog: ResourceCatalog,
    pub evaluator: AccessEvaluator,
    /// Number of policies written to the store.
    pub policies: usize,
}

/// Create the store described by `cache`, populate it and wrap it in an
/// evaluator.
///
/// # Errors
///
/// Returns an error if the hierarchy is malformed, a policy refers to an
/// unknown resource, a rule cannot be built, or the store rejects a write.
pub fn bootstrap(config: &AppConfig, registry: &RuleRegistry) -> ConfigResult<Bootstrapped> {
    let store = create_store(&config.cache);
    let catalog = ResourceCatalog::from_specs(&config.bootstrap.resources)?;
    let policies = populate_store(store.as_ref(), &catalog, &config.bootstrap, registry)?;

    tracing::info!(
        resources = catalog.len(),
        policies,
        cache = config.cache.enabled,
        "Policy store bootstrapped"
    );

    Ok(Bootstrapped {
        catalog,
        evaluator: AccessEvaluator::new(store),
        policies,
    })
}

/// In-memory store, behind a read-through cache when enabled.
pub fn create_store(cache: &CacheConfig) -> DynPolicyStore {
    if cache.enabled {
        create_cached_policy_store(cache.ttl())
    } else {
        create_policy_store()
    }
}

/// Write every configured policy to `store`, returning how many were written.
///
/// # Errors
///
/// Returns an error if a policy refers to a resource missing from
/// `catalog`, a rule cannot be built, or the store fails.
pub fn populate_store(
    store: &dyn PolicyStore,
    catalog: &ResourceCatalog,
    bootstrap: &BootstrapConfig,
    registry: &RuleRegistry,
) -> ConfigResult<usize> {
    let mut written = 0;

    for binding in &bootstrap.resource_policies {
        let resource = catalog.get(&binding.resource).ok_or_else(|| {
            ConfigError::bootstrap(format!(
                "policy refers to unknown resource {}",
                binding.resource
            ))
        })?;
        let policy = build_policy(
            registry,
            &binding.owner,
            &binding.resource_rules,
            &binding.record_rules,
        )?;
        store.set_by_resource(resource, policy)?;
        tracing::debug!(resource = %resource.id(), "Bootstrapped resource policy");
        written += 1;
    }

    for binding in &bootstrap.type_policies {
        let policy = build_policy(
            registry,
            &binding.owner,
            &binding.resource_rules,
            &binding.record_rules,
        )?;
        store.set_by_type(&binding.resource_type, policy)?;
        tracing::debug!(resource_type = %binding.resource_type, "Bootstrapped type policy");
        written += 1;
    }

    Ok(written)
}

/// Build a policy whose rules come from `registry`, in declaration order.
///
/// # Errors
///
/// Returns an error if a rule identifier is unknown or its parameters are
/// invalid.
pub fn build_policy(
    registry: &RuleRegistry,
    owner: &User,
    resource_rules: &[RuleSpec],
    record_rules: &[RuleSpec],
) -> ConfigResult<Policy> {
    let mut resource_level = Rules::new();
    for spec in resource_rules {
        resource_level.insert(
            spec.name.clone(),
            registry.build_resource_rule(&spec.rule, &spec.params)?,
        );
    }

    let mut record_level = Rules::new();
    for spec in record_rules {
        record_level.insert(
            spec.name.clone(),
            registry.build_record_rule(&spec.rule, &spec.params)?,
        );
    }

    Ok(Policy::new(owner.clone())
        .with_resource_rules(resource_level)
        .with_record_rules(record_level))
}

#[cfg(test)]
mod tests {
    use arbor_core::{Context, ResourceKind};
    use arbor_policy::{PolicyError, RuleParams};

    use super::*;
    use crate::settings::{ResourcePolicySpec, ResourceSpec, TypePolicySpec};

    fn rule(name: &str, id: &str, params: &[(&str, &str)]) -> RuleSpec {
        RuleSpec {
            name: name.into(),
            rule: id.into(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<RuleParams>(),
        }
    }

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.bootstrap.resources = vec![
            ResourceSpec {
                id: "/file".into(),
                kind: ResourceKind::System,
                parent: None,
                resource_type: None,
                format: None,
                connection: None,
            },
            ResourceSpec {
                id: "/file/a.txt".into(),
                kind: ResourceKind::Leaf,
                parent: Some("/file".into()),
                resource_type: Some("TestObj1".into()),
                format: Some("txt".into()),
                connection: None,
            },
        ];
        cfg.bootstrap.resource_policies = vec![ResourcePolicySpec {
            resource: "/file".into(),
            owner: User::new("admin"),
            resource_rules: vec![rule(
                "Resource serialised format is txt",
                "serialised-format",
                &[("format", "txt")],
            )],
            record_rules: vec![],
        }];
        cfg.bootstrap.type_policies = vec![TypePolicySpec {
            resource_type: "TestObj1".into(),
            owner: User::new("admin"),
            resource_rules: vec![rule("purpose is testing", "purpose", &[("purpose", "testing")])],
            record_rules: vec![],
        }];
        cfg
    }

    #[test]
    fn test_bootstrap_populates_store() {
        let registry = RuleRegistry::with_builtin();
        let booted = bootstrap(&config(), &registry).unwrap();
        assert_eq!(booted.policies, 2);

        let file = booted.catalog.get("/file/a.txt").unwrap().clone();
        let user = User::new("alice");

        let rules = booted
            .evaluator
            .resolver()
            .applicable_rules::<arbor_policy::ResourceLevel>(&file, "TestObj1")
            .unwrap()
            .unwrap();
        assert_eq!(
            rules.message(),
            "Resource serialised format is txt, purpose is testing"
        );

        let fun = booted
            .evaluator
            .can_access(&user, &Context::new("fun"), vec![file.clone()])
            .unwrap();
        assert!(fun.is_empty());

        let testing = booted
            .evaluator
            .can_access(&user, &Context::new("testing"), vec![file.clone()])
            .unwrap();
        assert_eq!(testing, vec![file]);
    }

    #[test]
    fn test_unknown_resource_in_policy() {
        let mut cfg = config();
        cfg.bootstrap.resource_policies[0].resource = "/nowhere".into();

        let err = bootstrap(&cfg, &RuleRegistry::with_builtin()).unwrap_err();
        assert!(matches!(err, ConfigError::Bootstrap(_)));
    }

    #[test]
    fn test_unknown_rule_identifier() {
        let mut cfg = config();
        cfg.bootstrap.type_policies[0].resource_rules[0].rule = "telepathy".into();

        let err = bootstrap(&cfg, &RuleRegistry::with_builtin()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Policy(PolicyError::UnknownRule { .. })
        ));
    }

    #[test]
    fn test_uncached_store() {
        let mut cfg = config();
        cfg.cache.enabled = false;
        let booted = bootstrap(&cfg, &RuleRegistry::with_builtin()).unwrap();
        let root = booted.catalog.get("/file").unwrap();
        assert!(booted.evaluator.get_direct_policy(root).unwrap().is_some());
    }
}
