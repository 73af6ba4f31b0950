//! VSphereCluster CRD
//!
//! Cluster API infrastructure cluster for vSphere. Created once per hosted
//! cluster and then handed over to Cluster API via the managed-by annotation.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::ObjectReference;

/// Cluster API annotation marking an infrastructure cluster as externally managed
pub const CAPI_MANAGED_BY_ANNOTATION: &str = "cluster.x-k8s.io/managed-by";

/// Value of [`CAPI_MANAGED_BY_ANNOTATION`] for externally managed clusters
pub const CAPI_MANAGED_BY_EXTERNAL: &str = "external";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1beta1",
    kind = "VSphereCluster",
    namespaced,
    status = "VSphereClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VSphereClusterSpec {
    /// Secret holding the kubeconfig of an external infrastructure cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infra_cluster_secret_ref: Option<ObjectReference>,

    /// Endpoint of the hosted API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ApiEndpoint>,
}

/// Host and port of an API server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEndpoint {
    /// Hostname or IP address
    pub host: String,

    /// Port
    pub port: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereClusterStatus {
    /// Infrastructure is ready for machines
    #[serde(default)]
    pub ready: bool,
}
