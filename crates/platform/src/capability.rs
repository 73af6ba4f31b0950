//! Platform capability interface
//!
//! Every infrastructure platform implements [`Platform`]. The orchestrator
//! holds a single [`PlatformKind`] for a cluster and calls it without ever
//! branching on the platform type, so adding a platform means adding one
//! variant and one implementation.

use crds::{ApiEndpoint, HostedCluster, HostedControlPlane, PlatformType, VSphereCluster};
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::PolicyRule;
use kube::ResourceExt;

use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::none::NonePlatform;
use crate::store::Store;
use crate::vsphere::VSphere;

/// Infrastructure cluster resource reconciled by a platform
#[derive(Debug, Clone)]
pub enum InfraCluster {
    /// Cluster API vSphere cluster
    VSphere(VSphereCluster),
}

impl InfraCluster {
    /// Name of the resource (the infra ID)
    pub fn name(&self) -> String {
        match self {
            Self::VSphere(cluster) => cluster.name_any(),
        }
    }

    /// Whether the resource reports ready
    pub fn is_ready(&self) -> bool {
        match self {
            Self::VSphere(cluster) => cluster.status.as_ref().is_some_and(|status| status.ready),
        }
    }
}

/// Operations the orchestrator invokes for a cluster's platform.
///
/// Each call reads current state from the store, writes through its upsert
/// primitive and returns. Nothing is cached between calls and nothing is
/// retried here.
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Creates the Cluster API infrastructure cluster, then keeps it marked as
    /// externally managed and ready.
    async fn reconcile_capi_infra_cr<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
        endpoint: &ApiEndpoint,
    ) -> Result<Option<InfraCluster>, PlatformError>;

    /// Deployment spec of the platform's Cluster API provider controller.
    fn capi_provider_deployment_spec(
        &self,
        cluster: &HostedCluster,
        control_plane: &HostedControlPlane,
    ) -> Result<Option<DeploymentSpec>, PlatformError>;

    /// Copies external infrastructure credentials into the control plane namespace.
    async fn reconcile_credentials<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
    ) -> Result<(), PlatformError>;

    /// Platform-specific secret encryption configuration.
    async fn reconcile_secret_encryption<S: Store>(
        &self,
        _store: &S,
        _cluster: &HostedCluster,
        _control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    /// Extra RBAC rules the provider controller needs.
    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule>;

    /// Removes credentials copied by [`Platform::reconcile_credentials`].
    async fn delete_credentials<S: Store>(
        &self,
        _store: &S,
        _cluster: &HostedCluster,
        _control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }
}

/// Closed set of supported platforms
#[derive(Debug, Clone)]
pub enum PlatformKind {
    /// vSphere
    VSphere(VSphere),
    /// No infrastructure integration
    None(NonePlatform),
}

impl PlatformKind {
    /// Selects the platform of a cluster.
    pub fn for_cluster(cluster: &HostedCluster, config: &PlatformConfig) -> Self {
        match cluster.spec.platform.type_ {
            PlatformType::VSphere => Self::VSphere(VSphere::new(config)),
            PlatformType::None => Self::None(NonePlatform),
        }
    }
}

#[async_trait::async_trait]
impl Platform for PlatformKind {
    async fn reconcile_capi_infra_cr<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
        endpoint: &ApiEndpoint,
    ) -> Result<Option<InfraCluster>, PlatformError> {
        match self {
            Self::VSphere(p) => {
                p.reconcile_capi_infra_cr(store, cluster, control_plane_namespace, endpoint)
                    .await
            }
            Self::None(p) => {
                p.reconcile_capi_infra_cr(store, cluster, control_plane_namespace, endpoint)
                    .await
            }
        }
    }

    fn capi_provider_deployment_spec(
        &self,
        cluster: &HostedCluster,
        control_plane: &HostedControlPlane,
    ) -> Result<Option<DeploymentSpec>, PlatformError> {
        match self {
            Self::VSphere(p) => p.capi_provider_deployment_spec(cluster, control_plane),
            Self::None(p) => p.capi_provider_deployment_spec(cluster, control_plane),
        }
    }

    async fn reconcile_credentials<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        match self {
            Self::VSphere(p) => {
                p.reconcile_credentials(store, cluster, control_plane_namespace)
                    .await
            }
            Self::None(p) => {
                p.reconcile_credentials(store, cluster, control_plane_namespace)
                    .await
            }
        }
    }

    async fn reconcile_secret_encryption<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        match self {
            Self::VSphere(p) => {
                p.reconcile_secret_encryption(store, cluster, control_plane_namespace)
                    .await
            }
            Self::None(p) => {
                p.reconcile_secret_encryption(store, cluster, control_plane_namespace)
                    .await
            }
        }
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        match self {
            Self::VSphere(p) => p.capi_provider_policy_rules(),
            Self::None(p) => p.capi_provider_policy_rules(),
        }
    }

    async fn delete_credentials<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        match self {
            Self::VSphere(p) => {
                p.delete_credentials(store, cluster, control_plane_namespace)
                    .await
            }
            Self::None(p) => {
                p.delete_credentials(store, cluster, control_plane_namespace)
                    .await
            }
        }
    }
}
