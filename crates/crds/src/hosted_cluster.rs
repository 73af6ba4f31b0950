//! HostedCluster CRD
//!
//! Desired shape of one managed cluster whose control plane runs in a
//! dedicated namespace of the management cluster.

use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::SecretKeyReference;

/// Annotation back-referencing the owning HostedCluster (`<namespace>/<name>`)
pub const HOSTED_CLUSTER_ANNOTATION: &str = "hcp.microscaler.io/cluster";

/// Per-cluster override of the vSphere CAPI provider image
pub const VSPHERE_CAPI_PROVIDER_IMAGE_ANNOTATION: &str =
    "hcp.microscaler.io/capi-provider-vsphere-image";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "hcp.microscaler.io",
    version = "v1beta1",
    kind = "HostedCluster",
    namespaced,
    shortname = "hc",
    status = "HostedClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterSpec {
    /// Identifier correlating every infrastructure object of this cluster
    #[serde(default)]
    pub infra_id: String,

    /// Infrastructure platform the cluster runs on
    #[serde(default)]
    pub platform: PlatformSpec,

    /// DNS configuration
    #[serde(default)]
    pub dns: DnsSpec,

    /// How each control plane service is exposed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServicePublishingStrategyMapping>,

    /// Release image of the control plane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// Supported infrastructure platforms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum PlatformType {
    /// vSphere virtual machines
    VSphere,

    /// No infrastructure integration
    #[default]
    None,
}

/// Platform selection plus platform-specific settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    /// Platform type
    #[serde(rename = "type", default)]
    pub type_: PlatformType,

    /// vSphere settings, set when `type` is `VSphere`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsphere: Option<VSpherePlatformSpec>,
}

/// vSphere platform settings of a HostedCluster
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VSpherePlatformSpec {
    /// Credentials of an external infrastructure cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<VSpherePlatformCredentials>,

    /// Derive the base domain from the infrastructure cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_domain_passthrough: Option<bool>,
}

/// External infrastructure cluster access
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSpherePlatformCredentials {
    /// Secret (in the HostedCluster namespace) holding the kubeconfig
    pub infra_kube_config_secret: SecretKeyReference,

    /// Namespace in the external cluster hosting the virtual machines
    pub infra_namespace: String,
}

/// DNS settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsSpec {
    /// Base domain of the cluster
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_domain: String,
}

/// Control plane services that can be published
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ServiceType {
    /// Kubernetes API server
    APIServer,
    /// OAuth server
    OAuthServer,
    /// Konnectivity tunnel
    Konnectivity,
    /// Ignition endpoint
    Ignition,
}

/// Publishing strategy of one service
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePublishingStrategyMapping {
    /// Service being published
    pub service: ServiceType,

    /// How the service is published
    pub service_publishing_strategy: ServicePublishingStrategy,
}

/// Publishing strategy
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePublishingStrategy {
    /// Strategy type
    #[serde(rename = "type")]
    pub type_: PublishingStrategyType,

    /// NodePort settings, set when `type` is `NodePort`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<NodePortPublishingStrategy>,
}

/// Publishing strategy types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PublishingStrategyType {
    /// Service of type LoadBalancer
    LoadBalancer,
    /// Service of type NodePort
    NodePort,
    /// Route / ingress
    Route,
}

/// NodePort publishing settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodePortPublishingStrategy {
    /// Address of a node the service is reachable on
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterStatus {
    /// Whether the control plane is available
    #[serde(default)]
    pub ready: bool,
}

impl HostedCluster {
    /// Namespace hosting this cluster's control plane components
    pub fn control_plane_namespace(&self) -> String {
        format!(
            "{}-{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }

    /// `<namespace>/<name>` key of this cluster
    pub fn object_key(&self) -> String {
        format!("{}/{}", self.namespace().unwrap_or_default(), self.name_any())
    }

    /// vSphere credentials, when the cluster carries any
    pub fn vsphere_credentials(&self) -> Option<&VSpherePlatformCredentials> {
        self.spec
            .platform
            .vsphere
            .as_ref()
            .and_then(|vsphere| vsphere.credentials.as_ref())
    }
}
