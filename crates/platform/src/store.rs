//! Declarative store contract
//!
//! The platform reconcilers never talk to the API server directly. They read
//! through [`ObjectStore`] and write through the caller-supplied [`Upsert`]
//! primitive, which owns read-modify-write and conflict retry.

use std::fmt::Debug;

use kube::Resource;
use kube::core::NamespaceResourceScope;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Namespaced objects the store can read and write
pub trait StoreObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<K> StoreObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Errors returned by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Namespace looked up
        namespace: String,
        /// Name looked up
        name: String,
    },

    /// Write lost an optimistic concurrency race too many times
    #[error("conflict writing {kind} {namespace}/{name} after {attempts} attempts")]
    Conflict {
        /// Kind of the contended object
        kind: String,
        /// Namespace of the contended object
        namespace: String,
        /// Name of the contended object
        name: String,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Object is missing identity fields needed to address it
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means the object is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// What an upsert did to the stored object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Object did not exist and was created
    Created,
    /// Object existed and the mutation changed it
    Updated,
    /// Object existed and the mutation was a no-op
    Unchanged,
}

/// Read and delete access to the declarative store
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the current state of an object
    async fn get<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<K, StoreError>;

    /// Delete an object, returning `false` when it was already absent
    async fn delete<K: StoreObject>(&self, namespace: &str, name: &str) -> Result<bool, StoreError>;
}

/// Create-or-update primitive supplied by the caller
///
/// `desired` identifies the object (namespace + name) and is the starting
/// point when the object does not exist yet. `mutate` is applied to the
/// current object (or to `desired` on creation) and must be idempotent; it
/// may run more than once when the implementation retries a conflict.
#[async_trait::async_trait]
pub trait Upsert: Send + Sync {
    /// Create the object or update it in place
    async fn create_or_update<K, F>(
        &self,
        desired: K,
        mutate: F,
    ) -> Result<(K, UpsertOutcome), StoreError>
    where
        K: StoreObject,
        F: Fn(&mut K) + Send + Sync;
}

/// A store that can both read and upsert
pub trait Store: ObjectStore + Upsert {}

impl<T: ObjectStore + Upsert> Store for T {}

/// Namespace and name of an object, or an error naming what is missing
pub(crate) fn object_key<K: StoreObject>(obj: &K) -> Result<(String, String), StoreError> {
    let meta = obj.meta();
    let name = meta
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| StoreError::InvalidObject(format!("{} has no name", K::kind(&()))))?;
    let namespace = meta.namespace.clone().ok_or_else(|| {
        StoreError::InvalidObject(format!("{} {} has no namespace", K::kind(&()), name))
    })?;
    Ok((namespace, name))
}
