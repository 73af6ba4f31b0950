//! Manifests produced by `hcp create`
//!
//! The set is either rendered as multi-document YAML or server-side applied,
//! in dependency order: Namespace, credentials Secret, HostedCluster, NodePool.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use crds::{
    DnsSpec, HostedCluster, HostedClusterSpec, NodePool, NodePoolPlatform, NodePoolSpec,
    PlatformSpec, PlatformType, SecretKeyReference, VSpherePlatformCredentials,
    VSpherePlatformSpec,
};
use hcp_platform::manifest::{build_manifest, service_publishing};
use hcp_platform::options::{BaseDomain, ValidatedOptions};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde::Serialize;
use tracing::info;

use crate::create::CreateCommonArgs;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "hcp-cli";

/// Key of the kubeconfig inside the infra credentials secret
pub const INFRA_KUBECONFIG_KEY: &str = "kubeconfig";

/// Objects making up one hosted cluster
#[derive(Debug, Clone)]
pub struct ManifestSet {
    pub namespace: Namespace,
    pub infra_credentials: Option<Secret>,
    pub hosted_cluster: HostedCluster,
    pub node_pool: NodePool,
}

fn meta(namespace: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

impl ManifestSet {
    /// Builds the manifests of a vSphere hosted cluster.
    pub fn vsphere(common: &CreateCommonArgs, validated: &ValidatedOptions) -> Self {
        let options = validated.platform();
        let name = common.name.as_str();
        let namespace = common.namespace.as_str();

        let infra_credentials = options.infra_credentials().map(|credentials| {
            let secret = Secret {
                metadata: meta(namespace, &format!("{name}-infra-credentials")),
                data: Some(BTreeMap::from([(
                    INFRA_KUBECONFIG_KEY.to_string(),
                    ByteString(credentials.kubeconfig().to_vec()),
                )])),
                ..Default::default()
            };
            (secret, credentials.namespace().to_string())
        });

        let (base_domain, base_domain_passthrough) = match validated.base_domain() {
            BaseDomain::Explicit(domain) => (domain.clone(), None),
            BaseDomain::Passthrough => (String::new(), Some(true)),
        };

        let mut hosted_cluster = HostedCluster::new(
            name,
            HostedClusterSpec {
                infra_id: validated.infra_id().to_string(),
                platform: PlatformSpec {
                    type_: PlatformType::VSphere,
                    vsphere: Some(VSpherePlatformSpec {
                        credentials: infra_credentials.as_ref().map(|(secret, infra_namespace)| {
                            VSpherePlatformCredentials {
                                infra_kube_config_secret: SecretKeyReference {
                                    name: secret.name_any(),
                                    key: INFRA_KUBECONFIG_KEY.to_string(),
                                },
                                infra_namespace: infra_namespace.clone(),
                            }
                        }),
                        base_domain_passthrough,
                    }),
                },
                dns: DnsSpec { base_domain },
                services: service_publishing(options.strategy(), options.api_server_address()),
                release: None,
            },
        );
        hosted_cluster.metadata.namespace = Some(namespace.to_string());

        let mut node_pool = NodePool::new(
            name,
            NodePoolSpec {
                cluster_name: name.to_string(),
                replicas: common.node_pool_replicas,
                platform: NodePoolPlatform {
                    type_: PlatformType::VSphere,
                    vsphere: Some(build_manifest(options)),
                },
            },
        );
        node_pool.metadata.namespace = Some(namespace.to_string());

        Self {
            namespace: Namespace {
                metadata: ObjectMeta {
                    name: Some(namespace.to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
            infra_credentials: infra_credentials.map(|(secret, _)| secret),
            hosted_cluster,
            node_pool,
        }
    }

    /// Multi-document YAML of the whole set.
    pub fn render(&self) -> Result<String> {
        let mut documents = vec![to_yaml(&self.namespace)?];
        if let Some(secret) = &self.infra_credentials {
            documents.push(to_yaml(secret)?);
        }
        documents.push(to_yaml(&self.hosted_cluster)?);
        documents.push(to_yaml(&self.node_pool)?);
        Ok(documents
            .iter()
            .map(|document| format!("---\n{document}"))
            .collect())
    }

    /// Server-side applies the set.
    pub async fn apply(&self, client: Client) -> Result<()> {
        let params = PatchParams::apply(FIELD_MANAGER).force();
        let namespace = self.hosted_cluster.namespace().unwrap_or_default();

        let namespaces: Api<Namespace> = Api::all(client.clone());
        namespaces
            .patch(&self.namespace.name_any(), &params, &Patch::Apply(&self.namespace))
            .await
            .with_context(|| format!("failed to apply Namespace {namespace}"))?;

        if let Some(secret) = &self.infra_credentials {
            let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);
            secrets
                .patch(&secret.name_any(), &params, &Patch::Apply(secret))
                .await
                .with_context(|| {
                    format!("failed to apply Secret {namespace}/{}", secret.name_any())
                })?;
        }

        let clusters: Api<HostedCluster> = Api::namespaced(client.clone(), &namespace);
        clusters
            .patch(
                &self.hosted_cluster.name_any(),
                &params,
                &Patch::Apply(&self.hosted_cluster),
            )
            .await
            .with_context(|| {
                format!(
                    "failed to apply HostedCluster {}",
                    self.hosted_cluster.object_key()
                )
            })?;

        let node_pools: Api<NodePool> = Api::namespaced(client, &namespace);
        node_pools
            .patch(&self.node_pool.name_any(), &params, &Patch::Apply(&self.node_pool))
            .await
            .with_context(|| {
                format!("failed to apply NodePool {namespace}/{}", self.node_pool.name_any())
            })?;

        info!("Applied {} manifests to {}", self.object_count(), namespace);
        Ok(())
    }

    /// Number of objects in the set
    pub fn object_count(&self) -> usize {
        3 + usize::from(self.infra_credentials.is_some())
    }
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("failed to serialize manifest")
}
