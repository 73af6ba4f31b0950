//! Platform reconciliation driver
//!
//! Runs one pass of the platform capability operations for a cluster in a
//! fixed order. Failures stop the pass and are returned as-is; the caller
//! re-invokes on its own schedule.

use crds::{ApiEndpoint, HostedCluster, HostedControlPlane};
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::PolicyRule;
use tracing::debug;

use crate::capability::{InfraCluster, Platform};
use crate::error::PlatformError;
use crate::store::Store;

/// What one reconciliation pass produced
#[derive(Debug, Clone, Default)]
pub struct PlatformReconcileResult {
    /// Infrastructure cluster, for platforms that have one
    pub infra_cluster: Option<InfraCluster>,
    /// Deployment spec of the CAPI provider, for platforms that run one
    pub provider_deployment: Option<DeploymentSpec>,
    /// RBAC rules the CAPI provider needs
    pub policy_rules: Vec<PolicyRule>,
}

/// Reconciles credentials, secret encryption, the infrastructure cluster and
/// the provider workload of one cluster.
pub async fn reconcile_platform<P, S>(
    platform: &P,
    store: &S,
    cluster: &HostedCluster,
    control_plane: &HostedControlPlane,
    control_plane_namespace: &str,
    endpoint: &ApiEndpoint,
) -> Result<PlatformReconcileResult, PlatformError>
where
    P: Platform,
    S: Store,
{
    debug!(
        "Reconciling platform of {} in {}",
        cluster.object_key(),
        control_plane_namespace
    );

    platform
        .reconcile_credentials(store, cluster, control_plane_namespace)
        .await?;
    platform
        .reconcile_secret_encryption(store, cluster, control_plane_namespace)
        .await?;
    let infra_cluster = platform
        .reconcile_capi_infra_cr(store, cluster, control_plane_namespace, endpoint)
        .await?;
    let provider_deployment = platform.capi_provider_deployment_spec(cluster, control_plane)?;

    Ok(PlatformReconcileResult {
        infra_cluster,
        provider_deployment,
        policy_rules: platform.capi_provider_policy_rules(),
    })
}

/// Runs the platform teardown hooks of a cluster being destroyed.
pub async fn teardown_platform<P, S>(
    platform: &P,
    store: &S,
    cluster: &HostedCluster,
    control_plane_namespace: &str,
) -> Result<(), PlatformError>
where
    P: Platform,
    S: Store,
{
    debug!("Tearing down platform of {}", cluster.object_key());
    platform
        .delete_credentials(store, cluster, control_plane_namespace)
        .await
}
