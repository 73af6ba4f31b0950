//! Object references shared by the hosted cluster CRDs
//!
//! Follows the Kubernetes `ObjectReference` / `SecretKeySelector` shapes,
//! trimmed to the fields the platforms actually read.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to a namespaced object (kind, name and namespace)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    /// Kind of the referenced object (e.g., "Secret")
    pub kind: String,

    /// Name of the referenced object
    pub name: String,

    /// Namespace of the referenced object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ObjectReference {
    /// Reference to a Secret in the given namespace
    pub fn secret(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind: "Secret".to_string(),
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

/// Selects a key of a Secret living in the referencing object's namespace
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyReference {
    /// Name of the Secret
    pub name: String,

    /// Key inside the Secret's data
    pub key: String,
}
