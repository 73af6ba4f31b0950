//! Fixtures shared by the platform unit tests

use std::collections::BTreeMap;

use crds::{
    HostedCluster, HostedClusterSpec, HostedControlPlane, HostedControlPlaneSpec, PlatformSpec,
    PlatformType, SecretKeyReference, VSpherePlatformCredentials, VSpherePlatformSpec,
};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const CLUSTER_NAMESPACE: &str = "clusters";
pub const CLUSTER_NAME: &str = "example";
pub const CONTROL_PLANE_NAMESPACE: &str = "clusters-example";
pub const INFRA_ID: &str = "example-1a2b3";
pub const SOURCE_SECRET: &str = "example-infra-credentials";

/// vSphere HostedCluster without external credentials
pub fn vsphere_cluster() -> HostedCluster {
    HostedCluster {
        metadata: ObjectMeta {
            name: Some(CLUSTER_NAME.to_string()),
            namespace: Some(CLUSTER_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: HostedClusterSpec {
            infra_id: INFRA_ID.to_string(),
            platform: PlatformSpec {
                type_: PlatformType::VSphere,
                vsphere: Some(VSpherePlatformSpec::default()),
            },
            ..Default::default()
        },
        status: None,
    }
}

/// vSphere HostedCluster referencing [`SOURCE_SECRET`]
pub fn vsphere_cluster_with_credentials() -> HostedCluster {
    let mut cluster = vsphere_cluster();
    cluster.spec.platform.vsphere = Some(VSpherePlatformSpec {
        credentials: Some(VSpherePlatformCredentials {
            infra_kube_config_secret: SecretKeyReference {
                name: SOURCE_SECRET.to_string(),
                key: "kubeconfig".to_string(),
            },
            infra_namespace: "vms".to_string(),
        }),
        base_domain_passthrough: None,
    });
    cluster
}

/// HostedCluster on the `None` platform
pub fn none_cluster() -> HostedCluster {
    let mut cluster = vsphere_cluster();
    cluster.spec.platform = PlatformSpec::default();
    cluster
}

pub fn control_plane(cluster: &HostedCluster) -> HostedControlPlane {
    let mut hcp = HostedControlPlane::new(
        CLUSTER_NAME,
        HostedControlPlaneSpec {
            infra_id: cluster.spec.infra_id.clone(),
            platform: cluster.spec.platform.clone(),
        },
    );
    hcp.metadata.namespace = Some(CONTROL_PLANE_NAMESPACE.to_string());
    hcp
}

pub fn secret(namespace: &str, name: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect::<BTreeMap<_, _>>(),
        ),
        ..Default::default()
    }
}

pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()?
        .get(key)
        .map(|value| String::from_utf8_lossy(&value.0).into_owned())
}
