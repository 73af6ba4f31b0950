//! NodePool CRD
//!
//! Defines a group of worker machines and the platform-specific shape of each
//! machine. `VSphereNodePoolPlatform` is what the example-manifest builder
//! produces.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::hosted_cluster::PlatformType;

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[kube(
    group = "hcp.microscaler.io",
    version = "v1beta1",
    kind = "NodePool",
    namespaced,
    shortname = "np"
)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    /// Name of the HostedCluster this pool belongs to
    pub cluster_name: String,

    /// Desired number of machines
    #[serde(default)]
    pub replicas: u32,

    /// Machine shape
    #[serde(default)]
    pub platform: NodePoolPlatform,
}

/// Platform section of a NodePool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolPlatform {
    /// Platform type
    #[serde(rename = "type", default)]
    pub type_: PlatformType,

    /// vSphere machine shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vsphere: Option<VSphereNodePoolPlatform>,
}

/// vSphere machine shape of a NodePool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereNodePoolPlatform {
    /// Root volume of each machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<VSphereRootVolume>,

    /// CPU and memory of each machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<VSphereCompute>,
}

/// Root volume of a vSphere machine
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereRootVolume {
    /// Disk image the volume is populated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<VSphereDiskImage>,

    /// Volume definition
    #[serde(flatten)]
    pub volume: VSphereVolume,
}

/// Disk image reference
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereDiskImage {
    /// Container image embedding the disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_disk_image: Option<String>,
}

/// Volume definition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereVolume {
    /// Volume type
    #[serde(rename = "type")]
    pub type_: VSphereVolumeType,

    /// Persistent volume settings, set when `type` is `Persistent`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<VSpherePersistentVolume>,
}

/// Volume types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum VSphereVolumeType {
    /// Backed by a persistent volume claim
    Persistent,
}

/// Persistent volume settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSpherePersistentVolume {
    /// Requested size as a resource quantity (e.g., "16Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Storage class of the claim; the cluster default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Access modes of the claim, in the order given
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,
}

/// CPU and memory of a vSphere machine
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VSphereCompute {
    /// Memory visible to the guest as a resource quantity (e.g., "4Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    /// Number of cores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
}
