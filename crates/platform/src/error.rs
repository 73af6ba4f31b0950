//! Platform reconciliation errors.
//!
//! Store failures are wrapped with what was being attempted and otherwise
//! passed through untouched; the orchestrator decides whether to retry.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by the platform capability operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Source credentials secret could not be read
    #[error("failed to get secret {namespace}/{name}: {source}")]
    SourceSecret {
        /// Namespace of the source secret
        namespace: String,
        /// Name of the source secret
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Writing an object through the upsert primitive failed
    #[error("failed to reconcile {kind} {namespace}/{name}: {source}")]
    Upsert {
        /// Kind of the object being written
        kind: String,
        /// Namespace of the object being written
        namespace: String,
        /// Name of the object being written
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Deleting an object failed
    #[error("failed to delete {kind} {namespace}/{name}: {source}")]
    Delete {
        /// Kind of the object being deleted
        kind: String,
        /// Namespace of the object being deleted
        namespace: String,
        /// Name of the object being deleted
        name: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// HostedCluster is missing a field the platform needs
    #[error("invalid HostedCluster {cluster}: {reason}")]
    InvalidCluster {
        /// `<namespace>/<name>` of the cluster
        cluster: String,
        /// What is missing or malformed
        reason: String,
    },
}
