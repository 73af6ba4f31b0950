//! `hcp create vsphere`

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use hcp_platform::infra_id::NameHashInfraId;
use hcp_platform::options::{self, ClusterIdentity, RawVSphereOptions, ValidatedOptions};
use kube::Client;
use tracing::info;

use crate::manifests::ManifestSet;
use crate::node_address::{DeferredResolver, NodeAddressResolver};

/// Flags shared by every platform
#[derive(Args, Debug, Clone)]
pub struct CreateCommonArgs {
    /// Name of the HostedCluster
    #[arg(long, default_value = "example")]
    pub name: String,

    /// Namespace of the HostedCluster
    #[arg(long, env = "HCP_NAMESPACE", default_value = "clusters")]
    pub namespace: String,

    /// Infrastructure ID; derived from the name when omitted
    #[arg(long, default_value = "")]
    pub infra_id: String,

    /// Base domain of the cluster; passed through from the platform when omitted
    #[arg(long, env = "HCP_BASE_DOMAIN", default_value = "")]
    pub base_domain: String,

    /// Number of nodes in the NodePool
    #[arg(long, default_value_t = 2)]
    pub node_pool_replicas: u32,

    /// Print the manifests instead of applying them
    #[arg(long)]
    pub render: bool,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long, default_value_t = 0)]
    pub timeout: u64,
}

/// `hcp create vsphere` flags
#[derive(Args, Debug, Clone)]
pub struct VSphereCreateArgs {
    #[command(flatten)]
    pub common: CreateCommonArgs,

    /// How to expose the cluster services: Ingress (LoadBalancer and Route) or
    /// NodePort (a node address)
    #[arg(long, default_value = "Ingress")]
    pub service_publishing_strategy: String,

    /// API server address used by components outside the control plane
    #[arg(long, default_value = "")]
    pub api_server_address: String,

    /// Memory visible inside the guest OS (e.g. 5Gi, 100Mi)
    #[arg(long, default_value = "4Gi")]
    pub memory: String,

    /// Cores inside the guest, at least 1
    #[arg(long, default_value_t = 2)]
    pub cores: u32,

    /// Root volume size of NodePool machines in Gi
    #[arg(long, default_value_t = 16)]
    pub root_volume_size: u32,

    /// Storage class of the root volume
    #[arg(long, env = "HCP_VSPHERE_ROOT_VOLUME_STORAGE_CLASS", default_value = "")]
    pub root_volume_storage_class: String,

    /// Access modes of the root volume (comma-delimited)
    #[arg(long, default_value = "")]
    pub root_volume_access_modes: String,

    /// Container image with the embedded boot disk
    #[arg(long = "containerdisk", env = "HCP_VSPHERE_CONTAINERDISK", default_value = "")]
    pub container_disk_image: String,

    /// Kubeconfig of an external infra cluster hosting the machines
    #[arg(long, default_value = "")]
    pub infra_kubeconfig_file: String,

    /// Namespace in the external infra cluster hosting the machines
    #[arg(long, default_value = "")]
    pub infra_namespace: String,
}

impl VSphereCreateArgs {
    pub fn raw_options(&self) -> RawVSphereOptions {
        RawVSphereOptions {
            service_publishing_strategy: self.service_publishing_strategy.clone(),
            api_server_address: self.api_server_address.clone(),
            memory: self.memory.clone(),
            cores: self.cores,
            root_volume_size: self.root_volume_size,
            root_volume_storage_class: self.root_volume_storage_class.clone(),
            root_volume_access_modes: self.root_volume_access_modes.clone(),
            container_disk_image: self.container_disk_image.clone(),
            infra_kubeconfig_file: self.infra_kubeconfig_file.clone(),
            infra_namespace: self.infra_namespace.clone(),
        }
    }

    pub fn identity(&self) -> ClusterIdentity {
        ClusterIdentity {
            name: self.common.name.clone(),
            infra_id: self.common.infra_id.clone(),
            base_domain: self.common.base_domain.clone(),
            render: self.common.render,
        }
    }
}

pub async fn run(args: VSphereCreateArgs) -> Result<()> {
    if args.common.timeout > 0 {
        let timeout = Duration::from_secs(args.common.timeout);
        return tokio::time::timeout(timeout, create(args))
            .await
            .context("timed out creating cluster")?;
    }
    create(args).await
}

async fn create(args: VSphereCreateArgs) -> Result<()> {
    // a client is only needed for the node lookup or to apply
    let client = if args.common.render {
        None
    } else {
        Some(Client::try_default().await.context("failed to create kube client")?)
    };

    let validated = validate(&args, client.as_ref()).await?;
    let manifests = ManifestSet::vsphere(&args.common, &validated);

    match client {
        None => {
            print!("{}", manifests.render()?);
        }
        Some(client) => {
            manifests.apply(client).await?;
            info!(
                "Applied HostedCluster {}/{}",
                args.common.namespace, args.common.name
            );
        }
    }
    Ok(())
}

async fn validate(args: &VSphereCreateArgs, client: Option<&Client>) -> Result<ValidatedOptions> {
    let validated = match client {
        Some(client) => {
            let resolver = NodeAddressResolver::new(client.clone());
            options::validate(args.raw_options(), args.identity(), &resolver, &NameHashInfraId)
                .await?
        }
        None => {
            options::validate(
                args.raw_options(),
                args.identity(),
                &DeferredResolver,
                &NameHashInfraId,
            )
            .await?
        }
    };
    Ok(validated)
}
