//! API server address lookup from the management cluster's nodes

use hcp_platform::options::{ApiServerAddressResolver, BoxError};
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client};

/// Resolves the address as the first `InternalIP` of the first node.
pub struct NodeAddressResolver {
    client: Client,
}

impl NodeAddressResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// First `InternalIP` of the first node in the list
pub fn first_internal_ip(nodes: &[Node]) -> Option<String> {
    nodes
        .first()?
        .status
        .as_ref()?
        .addresses
        .as_ref()?
        .iter()
        .find(|address| address.type_ == "InternalIP")
        .map(|address| address.address.clone())
}

#[async_trait::async_trait]
impl ApiServerAddressResolver for NodeAddressResolver {
    async fn resolve(&self) -> Result<String, BoxError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&ListParams::default().limit(1)).await?;
        let address = first_internal_ip(&list.items)
            .ok_or("no node with an InternalIP address found")?;
        Ok(address)
    }
}

/// Stand-in used when no cluster connection exists (render mode); the
/// lookup is never required there.
#[derive(Debug, Clone, Copy)]
pub struct DeferredResolver;

#[async_trait::async_trait]
impl ApiServerAddressResolver for DeferredResolver {
    async fn resolve(&self) -> Result<String, BoxError> {
        Err("no cluster connection available to look up node addresses".into())
    }
}
