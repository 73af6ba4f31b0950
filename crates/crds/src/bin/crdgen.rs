//! Prints the CRDs of this workspace as a multi-document YAML stream.

use crds::{HostedCluster, HostedControlPlane, NodePool, VSphereCluster};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [
        HostedCluster::crd(),
        HostedControlPlane::crd(),
        NodePool::crd(),
        VSphereCluster::crd(),
    ];
    for crd in &crds {
        print!("---\n{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
