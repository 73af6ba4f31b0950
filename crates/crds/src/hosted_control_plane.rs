//! HostedControlPlane CRD
//!
//! Control plane view of a HostedCluster, living in the control plane namespace.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::hosted_cluster::PlatformSpec;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "hcp.microscaler.io",
    version = "v1beta1",
    kind = "HostedControlPlane",
    namespaced,
    shortname = "hcp"
)]
#[serde(rename_all = "camelCase")]
pub struct HostedControlPlaneSpec {
    /// Infra ID copied from the owning HostedCluster
    #[serde(default)]
    pub infra_id: String,

    /// Platform copied from the owning HostedCluster
    #[serde(default)]
    pub platform: PlatformSpec,
}
