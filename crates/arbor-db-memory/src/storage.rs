use arbor_core::{Resource, ResourceId};
use arbor_policy::{Policy, PolicyStore, StorageResult};
use papaya::HashMap as PapayaHashMap;

/// In-memory policy store backed by papaya lock-free hash maps.
///
/// Resource policies are keyed by resource id, type policies by data type.
/// Readers never block writers; a reader racing a writer on the same key
/// sees either the old or the new policy, never a mix.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    by_resource: PapayaHashMap<ResourceId, Policy>,
    by_type: PapayaHashMap<String, Policy>,
}

impl InMemoryPolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored policies across both keyspaces.
    pub fn len(&self) -> usize {
        self.by_resource.len() + self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_resource.is_empty() && self.by_type.is_empty()
    }

    /// Number of policies keyed by resource.
    pub fn resource_policy_count(&self) -> usize {
        self.by_resource.len()
    }

    /// Number of policies keyed by data type.
    pub fn type_policy_count(&self) -> usize {
        self.by_type.len()
    }

    /// Removes every stored policy.
    pub fn clear(&self) {
        self.by_resource.pin().clear();
        self.by_type.pin().clear();
        tracing::debug!("In-memory policy store cleared");
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get_by_resource(&self, resource: &Resource) -> StorageResult<Option<Policy>> {
        let guard = self.by_resource.pin();
        Ok(guard.get(resource.id()).cloned())
    }

    fn get_by_type(&self, resource_type: &str) -> StorageResult<Option<Policy>> {
        let guard = self.by_type.pin();
        Ok(guard.get(resource_type).cloned())
    }

    fn set_by_resource(&self, resource: &Resource, policy: Policy) -> StorageResult<Policy> {
        let guard = self.by_resource.pin();
        let replaced = guard
            .insert(resource.id().clone(), policy.clone())
            .is_some();
        tracing::debug!(resource = %resource.id(), replaced, "Stored resource policy");
        Ok(policy)
    }

    fn set_by_type(&self, resource_type: &str, policy: Policy) -> StorageResult<Policy> {
        let guard = self.by_type.pin();
        let replaced = guard
            .insert(resource_type.to_string(), policy.clone())
            .is_some();
        tracing::debug!(resource_type, replaced, "Stored type policy");
        Ok(policy)
    }
}
