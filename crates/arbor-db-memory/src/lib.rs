//! In-memory policy store for Arbor.
//!
//! This crate provides an in-memory implementation of the `PolicyStore` trait
//! from `arbor-policy`, using papaya lock-free hash maps for concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use arbor_db_memory::InMemoryPolicyStore;
//! use arbor_policy::PolicyStore;
//!
//! let store = InMemoryPolicyStore::new();
//! store.set_by_type("TestObj1", Policy::new(owner))?;
//! ```

pub mod storage;

pub use arbor_policy::{PolicyStore, StorageError};
pub use storage::InMemoryPolicyStore;

use std::sync::Arc;

use arbor_policy::{DynPolicyStore, PolicyCache};
use time::Duration;

/// Creates a new in-memory policy store.
pub fn create_policy_store() -> DynPolicyStore {
    Arc::new(InMemoryPolicyStore::new())
}

/// Creates an in-memory policy store behind a read-through cache.
pub fn create_cached_policy_store(ttl: Duration) -> DynPolicyStore {
    Arc::new(PolicyCache::new(InMemoryPolicyStore::new(), ttl))
}
