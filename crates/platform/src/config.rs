//! Startup configuration of the platform reconcilers.
//!
//! Image overrides are read from the environment once, when the process
//! starts, and handed to the platforms by value.

use std::env;

/// Environment variable overriding the vSphere CAPI provider image
pub const VSPHERE_CAPI_PROVIDER_IMAGE_ENV: &str = "IMAGE_VSPHERE_CAPI_PROVIDER";

/// Image used when neither the environment nor the cluster overrides it
pub const DEFAULT_VSPHERE_CAPI_PROVIDER_IMAGE: &str =
    "registry.k8s.io/capi-vsphere/cluster-api-vsphere-controller:v1.11.2";

/// Configuration shared by all platform implementations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Process-level override of the vSphere CAPI provider image
    pub vsphere_capi_provider_image: Option<String>,
}

impl PlatformConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Unset and empty variables are both treated as "no override".
    pub fn from_env() -> Self {
        Self {
            vsphere_capi_provider_image: env::var(VSPHERE_CAPI_PROVIDER_IMAGE_ENV)
                .ok()
                .filter(|image| !image.is_empty()),
        }
    }
}
