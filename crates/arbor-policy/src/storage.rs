//! Policy storage trait.
//!
//! Defines the interface for policy persistence. Implementations are provided
//! by storage backends (e.g. `arbor-db-memory`); a [`PolicyCache`] can be
//! layered in front of any of them.
//!
//! [`PolicyCache`]: crate::cache::PolicyCache

use std::sync::Arc;

use arbor_core::Resource;

use crate::StorageResult;
use crate::policy::Policy;

// =============================================================================
// Policy Store Trait
// =============================================================================

/// Keyed storage of [`Policy`] values.
///
/// Two independent keyspaces exist: one keyed by exact resource id, one keyed
/// by data type string. Lookups are exact; no traversal or merging happens
/// here. Writes replace the stored value wholesale and concurrent writers to
/// the same key race with last-writer-wins.
///
/// Implementations must observe their own writes on the calling thread.
///
/// # Example
///
/// ```ignore
/// use arbor_policy::storage::PolicyStore;
///
/// fn example(store: &dyn PolicyStore, file: &Resource) -> StorageResult<()> {
///     if let Some(policy) = store.get_by_resource(file)? {
///         println!("rules: {}", policy.resource_rules().message());
///     }
///     Ok(())
/// }
/// ```
pub trait PolicyStore: Send + Sync {
    /// Get the policy stored for exactly this resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get_by_resource(&self, resource: &Resource) -> StorageResult<Option<Policy>>;

    /// Get the policy stored for exactly this data type.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get_by_type(&self, resource_type: &str) -> StorageResult<Option<Policy>>;

    /// Replace the policy stored for this resource and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set_by_resource(&self, resource: &Resource, policy: Policy) -> StorageResult<Policy>;

    /// Replace the policy stored for this data type and return what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn set_by_type(&self, resource_type: &str, policy: Policy) -> StorageResult<Policy>;
}

/// Shareable policy store handle.
pub type DynPolicyStore = Arc<dyn PolicyStore>;

impl<S: PolicyStore + ?Sized> PolicyStore for Arc<S> {
    fn get_by_resource(&self, resource: &Resource) -> StorageResult<Option<Policy>> {
        (**self).get_by_resource(resource)
    }

    fn get_by_type(&self, resource_type: &str) -> StorageResult<Option<Policy>> {
        (**self).get_by_type(resource_type)
    }

    fn set_by_resource(&self, resource: &Resource, policy: Policy) -> StorageResult<Policy> {
        (**self).set_by_resource(resource, policy)
    }

    fn set_by_type(&self, resource_type: &str, policy: Policy) -> StorageResult<Policy> {
        (**self).set_by_type(resource_type, policy)
    }
}

// =============================================================================
// Test Support
// =============================================================================
