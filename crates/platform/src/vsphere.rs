//! vSphere platform
//!
//! Creates the Cluster API `VSphereCluster` once and hands it over to Cluster
//! API, runs the vSphere CAPI provider, and copies external infrastructure
//! credentials into the control plane namespace.

use std::collections::BTreeMap;

use crds::{
    ApiEndpoint, CAPI_MANAGED_BY_ANNOTATION, CAPI_MANAGED_BY_EXTERNAL, HOSTED_CLUSTER_ANNOTATION,
    HostedCluster, HostedControlPlane, ObjectReference, VSPHERE_CAPI_PROVIDER_IMAGE_ANNOTATION,
    VSphereCluster, VSphereClusterSpec, VSphereClusterStatus,
};
use k8s_openapi::ByteString;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, HTTPGetAction, ObjectFieldSelector,
    PodSpec, PodTemplateSpec, Probe, ResourceRequirements, Secret, SecretVolumeSource, Toleration,
    Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::PolicyRule;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use tracing::{debug, info};

use crate::capability::{InfraCluster, Platform};
use crate::config::{DEFAULT_VSPHERE_CAPI_PROVIDER_IMAGE, PlatformConfig};
use crate::error::PlatformError;
use crate::store::{Store, UpsertOutcome};

/// Name of the copied infrastructure credentials in the control plane namespace
pub const CREDENTIALS_SECRET_NAME: &str = "vsphere-infra-credentials";

const WEBHOOK_TLS_VOLUME: &str = "capi-webhooks-tls";
const WEBHOOK_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";
const HEALTH_PORT_NAME: &str = "healthz";
const HEALTH_PORT: i32 = 9440;

/// vSphere platform implementation
#[derive(Debug, Clone, Default)]
pub struct VSphere {
    provider_image_override: Option<String>,
}

impl VSphere {
    /// Creates the platform from startup configuration.
    pub fn new(config: &PlatformConfig) -> Self {
        Self {
            provider_image_override: config
                .vsphere_capi_provider_image
                .clone()
                .filter(|image| !image.is_empty()),
        }
    }

    /// Provider image for a cluster: process override, then cluster annotation,
    /// then the built-in default.
    pub fn provider_image(&self, cluster: &HostedCluster) -> String {
        if let Some(image) = &self.provider_image_override {
            return image.clone();
        }
        cluster
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(VSPHERE_CAPI_PROVIDER_IMAGE_ANNOTATION))
            .filter(|image| !image.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_VSPHERE_CAPI_PROVIDER_IMAGE.to_string())
    }
}

fn credentials_secret(control_plane_namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(CREDENTIALS_SECRET_NAME.to_string()),
            namespace: Some(control_plane_namespace.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Marks the infrastructure cluster as owned by Cluster API and ready.
///
/// Only the two annotations and the ready flag are touched.
fn mark_externally_managed(vsphere_cluster: &mut VSphereCluster, cluster_key: &str) {
    let annotations = vsphere_cluster
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new);
    annotations.insert(HOSTED_CLUSTER_ANNOTATION.to_string(), cluster_key.to_string());
    annotations.insert(
        CAPI_MANAGED_BY_ANNOTATION.to_string(),
        CAPI_MANAGED_BY_EXTERNAL.to_string(),
    );
    vsphere_cluster
        .status
        .get_or_insert_with(VSphereClusterStatus::default)
        .ready = true;
}

fn merge_secret_data(target: &mut Secret, source: &BTreeMap<String, ByteString>) {
    let data = target.data.get_or_insert_with(BTreeMap::new);
    for (key, value) in source {
        data.insert(key.clone(), value.clone());
    }
}

fn http_probe(path: &str) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::String(HEALTH_PORT_NAME.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn manager_container(image: String) -> Container {
    Container {
        name: "manager".to_string(),
        image: Some(image),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(vec!["/manager".to_string()]),
        args: Some(
            ["--namespace", "$(MY_NAMESPACE)", "--alsologtostderr", "--v=4", "--leader-elect=true"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        env: Some(vec![EnvVar {
            name: "MY_NAMESPACE".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.namespace".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some(HEALTH_PORT_NAME.to_string()),
            container_port: HEALTH_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        resources: Some(ResourceRequirements {
            requests: Some(BTreeMap::from([
                ("memory".to_string(), Quantity("100Mi".to_string())),
                ("cpu".to_string(), Quantity("10m".to_string())),
            ])),
            ..Default::default()
        }),
        volume_mounts: Some(vec![VolumeMount {
            name: WEBHOOK_TLS_VOLUME.to_string(),
            mount_path: WEBHOOK_CERT_DIR.to_string(),
            read_only: Some(true),
            ..Default::default()
        }]),
        liveness_probe: Some(http_probe("/healthz")),
        readiness_probe: Some(http_probe("/readyz")),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl Platform for VSphere {
    async fn reconcile_capi_infra_cr<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
        _endpoint: &ApiEndpoint,
    ) -> Result<Option<InfraCluster>, PlatformError> {
        let infra_id = cluster.spec.infra_id.as_str();
        if infra_id.is_empty() {
            return Err(PlatformError::InvalidCluster {
                cluster: cluster.object_key(),
                reason: "spec.infraId is empty".to_string(),
            });
        }

        let mut desired = VSphereCluster::new(infra_id, VSphereClusterSpec::default());
        desired.metadata.namespace = Some(control_plane_namespace.to_string());
        if cluster.vsphere_credentials().is_some() {
            desired.spec.infra_cluster_secret_ref = Some(ObjectReference::secret(
                CREDENTIALS_SECRET_NAME,
                control_plane_namespace,
            ));
        }

        let cluster_key = cluster.object_key();
        let (vsphere_cluster, outcome) = store
            .create_or_update(desired, |vsphere_cluster: &mut VSphereCluster| {
                mark_externally_managed(vsphere_cluster, &cluster_key)
            })
            .await
            .map_err(|source| PlatformError::Upsert {
                kind: "VSphereCluster".to_string(),
                namespace: control_plane_namespace.to_string(),
                name: infra_id.to_string(),
                source,
            })?;

        if outcome != UpsertOutcome::Unchanged {
            info!(
                "VSphereCluster {}/{} {:?} for {}",
                control_plane_namespace, infra_id, outcome, cluster_key
            );
        }
        Ok(Some(InfraCluster::VSphere(vsphere_cluster)))
    }

    fn capi_provider_deployment_spec(
        &self,
        cluster: &HostedCluster,
        _control_plane: &HostedControlPlane,
    ) -> Result<Option<DeploymentSpec>, PlatformError> {
        let image = self.provider_image(cluster);
        debug!("vSphere CAPI provider image for {}: {}", cluster.object_key(), image);

        Ok(Some(DeploymentSpec {
            replicas: Some(1),
            template: PodTemplateSpec {
                spec: Some(PodSpec {
                    termination_grace_period_seconds: Some(10),
                    tolerations: Some(vec![Toleration {
                        key: Some("node-role.kubernetes.io/master".to_string()),
                        effect: Some("NoSchedule".to_string()),
                        ..Default::default()
                    }]),
                    volumes: Some(vec![Volume {
                        name: WEBHOOK_TLS_VOLUME.to_string(),
                        secret: Some(SecretVolumeSource {
                            secret_name: Some(WEBHOOK_TLS_VOLUME.to_string()),
                            default_mode: Some(0o640),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    containers: vec![manager_container(image)],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    async fn reconcile_credentials<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        let Some(credentials) = cluster.vsphere_credentials() else {
            return Ok(());
        };

        let namespace = cluster.metadata.namespace.clone().unwrap_or_default();
        let source_name = credentials.infra_kube_config_secret.name.as_str();
        let source: Secret = store.get(&namespace, source_name).await.map_err(|source| {
            PlatformError::SourceSecret {
                namespace: namespace.clone(),
                name: source_name.to_string(),
                source,
            }
        })?;
        let source_data = source.data.unwrap_or_default();

        let (_, outcome) = store
            .create_or_update(credentials_secret(control_plane_namespace), |target: &mut Secret| {
                merge_secret_data(target, &source_data)
            })
            .await
            .map_err(|source| PlatformError::Upsert {
                kind: "Secret".to_string(),
                namespace: control_plane_namespace.to_string(),
                name: CREDENTIALS_SECRET_NAME.to_string(),
                source,
            })?;

        if outcome != UpsertOutcome::Unchanged {
            info!(
                "Copied infra credentials {}/{} to {}/{} ({:?})",
                namespace, source_name, control_plane_namespace, CREDENTIALS_SECRET_NAME, outcome
            );
        }
        Ok(())
    }

    fn capi_provider_policy_rules(&self) -> Vec<PolicyRule> {
        vec![
            PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["services".to_string()]),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
            PolicyRule {
                api_groups: Some(vec!["vsphere.io".to_string()]),
                resources: Some(vec![
                    "virtualmachineinstances".to_string(),
                    "virtualmachines".to_string(),
                ]),
                verbs: vec!["*".to_string()],
                ..Default::default()
            },
        ]
    }

    async fn delete_credentials<S: Store>(
        &self,
        store: &S,
        cluster: &HostedCluster,
        control_plane_namespace: &str,
    ) -> Result<(), PlatformError> {
        if cluster.vsphere_credentials().is_none() {
            return Ok(());
        }

        let deleted = store
            .delete::<Secret>(control_plane_namespace, CREDENTIALS_SECRET_NAME)
            .await
            .map_err(|source| PlatformError::Delete {
                kind: "Secret".to_string(),
                namespace: control_plane_namespace.to_string(),
                name: CREDENTIALS_SECRET_NAME.to_string(),
                source,
            })?;
        if deleted {
            info!(
                "Deleted infra credentials {}/{}",
                control_plane_namespace, CREDENTIALS_SECRET_NAME
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "vsphere_test.rs"]
mod tests;
