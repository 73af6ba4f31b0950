//! `hcp destroy vsphere`

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use crds::HostedCluster;
use hcp_platform::{KubeStore, PlatformConfig, PlatformKind, Store, teardown_platform};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};
use kube_runtime::wait::{await_condition, conditions};
use tracing::info;

/// `hcp destroy vsphere` flags
#[derive(Args, Debug, Clone)]
pub struct VSphereDestroyArgs {
    /// Name of the HostedCluster
    #[arg(long, default_value = "example")]
    pub name: String,

    /// Namespace of the HostedCluster
    #[arg(long, env = "HCP_NAMESPACE", default_value = "clusters")]
    pub namespace: String,

    /// Seconds to wait for the HostedCluster to be deleted
    #[arg(long, default_value_t = 600)]
    pub cluster_grace_period: u64,
}

pub async fn run(args: VSphereDestroyArgs) -> Result<()> {
    let client = Client::try_default()
        .await
        .context("failed to create kube client")?;
    let store = KubeStore::new(client.clone());

    let config = PlatformConfig::from_env();
    let Some(cluster) = teardown(&store, &config, &args.namespace, &args.name).await? else {
        info!(
            "HostedCluster {}/{} not found, nothing to destroy",
            args.namespace, args.name
        );
        return Ok(());
    };

    let uid = cluster.uid().unwrap_or_default();
    let clusters: Api<HostedCluster> = Api::namespaced(client, &args.namespace);
    let grace_period = Duration::from_secs(args.cluster_grace_period);
    tokio::time::timeout(
        grace_period,
        await_condition(clusters, &args.name, conditions::is_deleted(&uid)),
    )
    .await
    .with_context(|| {
        format!(
            "HostedCluster {} was not deleted within {}s",
            cluster.object_key(),
            args.cluster_grace_period
        )
    })?
    .context("failed to watch HostedCluster deletion")?;

    info!("Destroyed HostedCluster {}", cluster.object_key());
    Ok(())
}

/// Requests deletion of the cluster, then runs the platform teardown hook and
/// removes the infra kubeconfig secret `hcp create` placed next to it.
///
/// Deletion is requested first so no later reconcile pass copies the
/// credentials again. Returns the cluster as it was before deletion, or
/// `None` when it did not exist.
pub async fn teardown<S: Store>(
    store: &S,
    config: &PlatformConfig,
    namespace: &str,
    name: &str,
) -> Result<Option<HostedCluster>> {
    let cluster: HostedCluster = match store.get(namespace, name).await {
        Ok(cluster) => cluster,
        Err(err) if err.is_not_found() => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to get HostedCluster {namespace}/{name}"));
        }
    };

    store
        .delete::<HostedCluster>(namespace, name)
        .await
        .with_context(|| format!("failed to delete HostedCluster {namespace}/{name}"))?;
    info!("Deleting HostedCluster {}/{}", namespace, name);

    let platform = PlatformKind::for_cluster(&cluster, config);
    teardown_platform(&platform, store, &cluster, &cluster.control_plane_namespace()).await?;

    if let Some(credentials) = cluster.vsphere_credentials() {
        let secret = credentials.infra_kube_config_secret.name.as_str();
        let deleted = store
            .delete::<Secret>(namespace, secret)
            .await
            .with_context(|| format!("failed to delete Secret {namespace}/{secret}"))?;
        if deleted {
            info!("Deleted infra kubeconfig secret {}/{}", namespace, secret);
        }
    }
    Ok(Some(cluster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{
        HostedClusterSpec, PlatformSpec, PlatformType, SecretKeyReference,
        VSpherePlatformCredentials, VSpherePlatformSpec,
    };
    use hcp_platform::mock::MemoryStore;
    use hcp_platform::vsphere::CREDENTIALS_SECRET_NAME;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn cluster() -> HostedCluster {
        let mut cluster = HostedCluster::new(
            "demo",
            HostedClusterSpec {
                infra_id: "demo-abcde".to_string(),
                platform: PlatformSpec {
                    type_: PlatformType::VSphere,
                    vsphere: Some(VSpherePlatformSpec {
                        credentials: Some(VSpherePlatformCredentials {
                            infra_kube_config_secret: SecretKeyReference {
                                name: "demo-infra-credentials".to_string(),
                                key: "kubeconfig".to_string(),
                            },
                            infra_namespace: "vms".to_string(),
                        }),
                        base_domain_passthrough: Some(true),
                    }),
                },
                ..Default::default()
            },
        );
        cluster.metadata.namespace = Some("clusters".to_string());
        cluster
    }

    #[tokio::test]
    async fn test_teardown_missing_cluster_is_ok() {
        let store = MemoryStore::new();

        let result = teardown(&store, &PlatformConfig::default(), "clusters", "demo")
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(store.operations(), 1);
    }

    fn secret(namespace: &str, name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_teardown_removes_credentials_and_cluster() {
        let store = MemoryStore::new();
        store.insert(&cluster());
        store.insert(&secret("clusters-demo", CREDENTIALS_SECRET_NAME));

        let removed = teardown(&store, &PlatformConfig::default(), "clusters", "demo")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(removed.object_key(), "clusters/demo");
        assert!(store.object::<HostedCluster>("clusters", "demo").is_none());
        assert!(
            store
                .object::<Secret>("clusters-demo", CREDENTIALS_SECRET_NAME)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_teardown_removes_infra_kubeconfig_secret() {
        let store = MemoryStore::new();
        store.insert(&cluster());
        store.insert(&secret("clusters", "demo-infra-credentials"));
        store.insert(&secret("clusters", "unrelated"));

        teardown(&store, &PlatformConfig::default(), "clusters", "demo")
            .await
            .unwrap()
            .unwrap();

        assert!(
            store
                .object::<Secret>("clusters", "demo-infra-credentials")
                .is_none()
        );
        assert!(store.object::<Secret>("clusters", "unrelated").is_some());
    }

    #[tokio::test]
    async fn test_teardown_without_any_secrets() {
        // neither the copied nor the source secret exists
        let store = MemoryStore::new();
        store.insert(&cluster());

        let removed = teardown(&store, &PlatformConfig::default(), "clusters", "demo")
            .await
            .unwrap();

        assert!(removed.is_some());
        assert!(store.object::<HostedCluster>("clusters", "demo").is_none());
    }

    #[tokio::test]
    async fn test_teardown_stops_when_cluster_delete_fails() {
        let store = MemoryStore::new();
        store.insert(&cluster());
        store.insert(&secret("clusters-demo", CREDENTIALS_SECRET_NAME));
        store.fail_deletes("apiserver unavailable");

        let err = teardown(&store, &PlatformConfig::default(), "clusters", "demo")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("failed to delete HostedCluster clusters/demo"));
        // the teardown hook only runs once deletion was requested
        assert_eq!(store.operations(), 2);
        assert!(
            store
                .object::<Secret>("clusters-demo", CREDENTIALS_SECRET_NAME)
                .is_some()
        );
    }
}
