//! Hosted control plane CRD definitions
//!
//! Kubernetes Custom Resource Definitions read and written by the platform
//! reconcilers and the `hcp` command line.

pub mod hosted_cluster;
pub mod hosted_control_plane;
pub mod node_pool;
pub mod references;
pub mod vsphere_cluster;

pub use hosted_cluster::*;
pub use hosted_control_plane::*;
pub use node_pool::*;
pub use references::*;
pub use vsphere_cluster::*;
