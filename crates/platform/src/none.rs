//! Platform without infrastructure integration.

use crds::{ApiEndpoint, HostedCluster, HostedControlPlane};
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::PolicyRule;

use crate::capability::{InfraCluster, Platform};
use crate::error::PlatformError;
use crate::store::Store;

/// Machines are provided out of band; there is nothing to reconcile.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonePlatform;

#[async_trait::async_trait]
impl Platform for NonePlatform {
    async fn reconcile_capi_infra_cr<S: Store>(
        &self,
        _store: &S,
        _cluster: &HostedCluster,
        _control_plane_namespace: &str,
        _endpoint: &ApiEndpoint,
    ) -> Result<Option<InfraCluster>, PlatformError> {
        Ok(None)
    }

    fn capi_provider_deployment_spec(
        &self,
        _cluster: &HostedCluster,
        _control_plane: &HostedControlPlane,
    ) -> Result<Option<DeploymentSpec>, PlatformError> {
        Ok(None)
    }

    async fn reconcile_credentials<S: Store>(
        &self,
        _store: &S,
        _cluster: &HostedCluster,
        _control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        Vec::new()
    }
}
