//! Platform reconciliation core for hosted control planes
//!
//! Each infrastructure platform implements the [`Platform`] capability set:
//! reconcile the Cluster API infrastructure cluster, describe the CAPI
//! provider deployment and its RBAC, and copy external infrastructure
//! credentials. The orchestrator holds one [`PlatformKind`] per cluster and
//! drives it through [`reconcile_platform`] and [`teardown_platform`].
//!
//! All reads and writes go through the [`Store`] seam. [`KubeStore`] is the
//! API server implementation; `MemoryStore` (feature `test-util`) keeps
//! objects in memory for tests.
//!
//! The [`options`] and [`manifest`] modules validate command-line input for
//! the vSphere platform and project it into a NodePool platform spec.

pub mod backoff;
pub mod capability;
pub mod config;
pub mod error;
pub mod infra_id;
pub mod kube_store;
pub mod manifest;
pub mod none;
pub mod options;
pub mod reconcile;
pub mod store;
pub mod vsphere;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

#[cfg(test)]
mod test_utils;

pub use capability::{InfraCluster, Platform, PlatformKind};
pub use config::PlatformConfig;
pub use error::PlatformError;
pub use kube_store::KubeStore;
pub use none::NonePlatform;
pub use reconcile::{PlatformReconcileResult, reconcile_platform, teardown_platform};
pub use store::{ObjectStore, Store, StoreError, StoreObject, Upsert, UpsertOutcome};
pub use vsphere::VSphere;
