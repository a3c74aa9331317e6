//! Configuration for Arbor.
//!
//! This crate loads [`AppConfig`] from an optional TOML file plus `ARBOR__*`
//! environment overrides, and turns its `bootstrap` section into a populated
//! policy store:
//!
//! - [`settings`] - Configuration model, validation and the file loader
//! - [`hierarchy`] - Building the resource tree from flat rows
//! - [`bootstrap`] - Writing configured policies through the rule registry

pub mod bootstrap;
pub mod hierarchy;
pub mod settings;

pub use bootstrap::{Bootstrapped, bootstrap, build_policy, create_store, populate_store};
pub use hierarchy::ResourceCatalog;
pub use settings::loader::{DEFAULT_CONFIG_FILE, ENV_PREFIX, load_config};
pub use settings::{
    AppConfig, BootstrapConfig, CacheConfig, LoggingConfig, ResourcePolicySpec, ResourceSpec,
    RuleSpec, TypePolicySpec,
};

use arbor_core::CoreError;
use arbor_policy::{PolicyError, StorageError};

/// Error types for configuration loading and bootstrap
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl ConfigError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::Bootstrap(msg.into())
    }
}

impl From<CoreError> for ConfigError {
    fn from(err: CoreError) -> Self {
        Self::Policy(err.into())
    }
}

impl From<StorageError> for ConfigError {
    fn from(err: StorageError) -> Self {
        Self::Policy(err.into())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
