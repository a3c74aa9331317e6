use arbor_core::{ConnectionDetail, ResourceKind, User};
use arbor_policy::RuleParams;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Read-through cache in front of the policy store
    #[serde(default)]
    pub cache: CacheConfig,
    /// Resource tree and policies loaded at startup
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl AppConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        // Cache validation
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(ConfigError::validation(
                "cache.ttl_secs must be > 0 when the cache is enabled",
            ));
        }
        self.bootstrap.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// How long a cached policy lookup stays valid
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX))
    }
}

/// Resources and policies created when the store is populated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub resource_policies: Vec<ResourcePolicySpec>,
    #[serde(default)]
    pub type_policies: Vec<TypePolicySpec>,
}

impl BootstrapConfig {
    fn validate(&self) -> ConfigResult<()> {
        for (idx, resource) in self.resources.iter().enumerate() {
            if resource.id.trim().is_empty() {
                return Err(ConfigError::validation(format!(
                    "bootstrap.resources[{idx}].id must not be empty"
                )));
            }
        }
        for (idx, binding) in self.resource_policies.iter().enumerate() {
            let path = format!("bootstrap.resource_policies[{idx}]");
            if binding.resource.trim().is_empty() {
                return Err(ConfigError::validation(format!(
                    "{path}.resource must not be empty"
                )));
            }
            validate_rules(&path, &binding.resource_rules, &binding.record_rules)?;
        }
        for (idx, binding) in self.type_policies.iter().enumerate() {
            let path = format!("bootstrap.type_policies[{idx}]");
            if binding.resource_type.trim().is_empty() {
                return Err(ConfigError::validation(format!(
                    "{path}.type must not be empty"
                )));
            }
            validate_rules(&path, &binding.resource_rules, &binding.record_rules)?;
        }
        Ok(())
    }
}

fn validate_rules(
    path: &str,
    resource_rules: &[RuleSpec],
    record_rules: &[RuleSpec],
) -> ConfigResult<()> {
    let levels = [
        ("resource_rules", resource_rules),
        ("record_rules", record_rules),
    ];
    for (level, rules) in levels {
        for (idx, rule) in rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(ConfigError::validation(format!(
                    "{path}.{level}[{idx}].name must not be empty"
                )));
            }
            if rule.rule.trim().is_empty() {
                return Err(ConfigError::validation(format!(
                    "{path}.{level}[{idx}].rule must not be empty"
                )));
            }
        }
    }
    Ok(())
}

/// One node of the resource tree, referring to its parent by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub id: String,
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionDetail>,
}

/// A named rule built through the rule registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Name the rule is stored under; later levels overwrite equal names.
    pub name: String,
    /// Registry identifier, e.g. `purpose` or `redact-fields`.
    pub rule: String,
    #[serde(default)]
    pub params: RuleParams,
}

/// Policy attached to one resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePolicySpec {
    pub resource: String,
    #[serde(default)]
    pub owner: User,
    #[serde(default)]
    pub resource_rules: Vec<RuleSpec>,
    #[serde(default)]
    pub record_rules: Vec<RuleSpec>,
}

/// Policy attached to one data type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypePolicySpec {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub owner: User,
    #[serde(default)]
    pub resource_rules: Vec<RuleSpec>,
    #[serde(default)]
    pub record_rules: Vec<RuleSpec>,
}

pub mod loader {
    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::AppConfig;
    use crate::{ConfigError, ConfigResult};

    /// File consulted when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "arbor.toml";

    /// Prefix of environment overrides, e.g. `ARBOR__CACHE__TTL_SECS=60`.
    pub const ENV_PREFIX: &str = "ARBOR";

    /// Load configuration from an optional TOML file plus environment
    /// overrides, then validate it.
    ///
    /// A missing file is not an error: defaults and the environment still
    /// apply.
    pub fn load_config(path: Option<&str>) -> ConfigResult<AppConfig> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            tracing::debug!(path = %pathbuf.display(), "Loading configuration file");
            builder = builder.add_source(File::from(pathbuf));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::load(format!("config build error: {e}")))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, id: &str) -> RuleSpec {
        RuleSpec {
            name: name.into(),
            rule: id.into(),
            params: RuleParams::new(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.ttl(), Duration::minutes(5));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level must be one of"));
    }

    #[test]
    fn test_enabled_cache_needs_ttl() {
        let mut cfg = AppConfig::default();
        cfg.cache.ttl_secs = 0;
        assert!(cfg.validate().is_err());

        cfg.cache.enabled = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rule_specs_need_name_and_identifier() {
        let mut cfg = AppConfig::default();
        cfg.bootstrap.type_policies.push(TypePolicySpec {
            resource_type: "TestObj1".into(),
            owner: User::new("admin"),
            resource_rules: vec![rule("gate", "purpose")],
            record_rules: vec![rule("", "redact-fields")],
        });

        let err = cfg.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: bootstrap.type_policies[0].record_rules[0].name must not be empty"
        );
    }
}
