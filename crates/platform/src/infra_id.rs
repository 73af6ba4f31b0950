//! Infra ID derivation.

use uuid::Uuid;

/// Produces the infra ID of a cluster that was not given one
pub trait InfraIdGenerator: Send + Sync {
    /// Derive an infra ID from the cluster name
    fn generate(&self, cluster_name: &str) -> String;
}

/// `<name>-<suffix>`, the suffix being the first five hex digits of the
/// name-based (v5) UUID of the cluster name. Stable across invocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHashInfraId;

impl InfraIdGenerator for NameHashInfraId {
    fn generate(&self, cluster_name: &str) -> String {
        let hash = Uuid::new_v5(&Uuid::NAMESPACE_OID, cluster_name.as_bytes()).simple().to_string();
        format!("{}-{}", cluster_name, &hash[..5])
    }
}
