//! vSphere platform options
//!
//! Turns raw command-line values into [`ValidatedOptions`]. Rules run in a
//! fixed order and the first failing rule is reported. The only I/O is the
//! optional API server address lookup and the optional kubeconfig read.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::infra_id::InfraIdGenerator;

/// Boxed error returned by external collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Smallest accepted root volume, in Gi
pub const MIN_ROOT_VOLUME_SIZE: u32 = 8;

/// How the control plane services are exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishingStrategy {
    /// Select a node and expose services through node ports
    NodePort,
    /// Load balancer for the API server, routes for everything else
    Ingress,
}

impl PublishingStrategy {
    /// Flag value of this strategy
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NodePort => "NodePort",
            Self::Ingress => "Ingress",
        }
    }
}

impl fmt::Display for PublishingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishingStrategy {
    type Err = OptionsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NodePort" => Ok(Self::NodePort),
            "Ingress" => Ok(Self::Ingress),
            other => Err(OptionsError::UnsupportedPublishingStrategy(other.to_string())),
        }
    }
}

/// Option validation failures
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Unknown publishing strategy
    #[error("service publishing strategy {0} is not supported, supported options: Ingress, NodePort")]
    UnsupportedPublishingStrategy(String),

    /// API server address given without NodePort publishing
    #[error(
        "external API server address is supported only for NodePort service publishing strategy, service publishing strategy {0} is used"
    )]
    ApiServerAddressRequiresNodePort(PublishingStrategy),

    /// Node address lookup failed
    #[error("failed to resolve API server address from cluster nodes: {0}")]
    AddressLookup(#[source] BoxError),

    /// Fewer than one core
    #[error("the number of cores inside the machine must be a value greater than or equal to 1")]
    InvalidCores,

    /// Root volume below the minimum
    #[error("the root volume size [{0}] must be greater than or equal to 8")]
    RootVolumeTooSmall(u32),

    /// Memory is not a resource quantity
    #[error("memory {0:?} is not a valid resource quantity (e.g. 4Gi, 512Mi)")]
    InvalidMemory(String),

    /// Infra namespace without kubeconfig
    #[error("external infra cluster namespace was provided but a kubeconfig is missing")]
    InfraNamespaceWithoutKubeconfig,

    /// Infra kubeconfig without namespace
    #[error("external infra cluster kubeconfig was provided but an infra namespace is missing")]
    InfraKubeconfigWithoutNamespace,

    /// Kubeconfig file could not be read
    #[error("failed to read external infra cluster kubeconfig file {path}: {source}")]
    ReadInfraKubeconfig {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Looks up an address the API server can be reached on
#[async_trait::async_trait]
pub trait ApiServerAddressResolver: Send + Sync {
    /// Resolve the address from the live cluster
    async fn resolve(&self) -> Result<String, BoxError>;
}

/// Flag values exactly as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVSphereOptions {
    /// `Ingress` or `NodePort`
    pub service_publishing_strategy: String,
    /// Externally reachable API server address (NodePort only)
    pub api_server_address: String,
    /// Guest memory quantity
    pub memory: String,
    /// Guest cores
    pub cores: u32,
    /// Root volume size in Gi
    pub root_volume_size: u32,
    /// Root volume storage class
    pub root_volume_storage_class: String,
    /// Comma-delimited root volume access modes
    pub root_volume_access_modes: String,
    /// Container image embedding the boot disk
    pub container_disk_image: String,
    /// Path of an external infra cluster kubeconfig
    pub infra_kubeconfig_file: String,
    /// Namespace in the external infra cluster
    pub infra_namespace: String,
}

impl Default for RawVSphereOptions {
    fn default() -> Self {
        Self {
            service_publishing_strategy: PublishingStrategy::Ingress.as_str().to_string(),
            api_server_address: String::new(),
            memory: "4Gi".to_string(),
            cores: 2,
            root_volume_size: 16,
            root_volume_storage_class: String::new(),
            root_volume_access_modes: String::new(),
            container_disk_image: String::new(),
            infra_kubeconfig_file: String::new(),
            infra_namespace: String::new(),
        }
    }
}

/// Cluster-wide values the platform options are validated against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterIdentity {
    /// Cluster name
    pub name: String,
    /// Supplied infra ID; empty means "derive one"
    pub infra_id: String,
    /// Supplied base domain; empty means "pass through from the platform"
    pub base_domain: String,
    /// Manifests are only rendered, nothing is looked up in a live cluster
    pub render: bool,
}

/// Base domain decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseDomain {
    /// Use this base domain
    Explicit(String),
    /// Let the platform provide it
    Passthrough,
}

/// Kubeconfig and namespace of an external infra cluster
#[derive(Clone, PartialEq, Eq)]
pub struct InfraCredentials {
    kubeconfig: Vec<u8>,
    namespace: String,
}

impl fmt::Debug for InfraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraCredentials")
            .field("kubeconfig", &format_args!("<{} bytes>", self.kubeconfig.len()))
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl InfraCredentials {
    /// Kubeconfig contents
    pub fn kubeconfig(&self) -> &[u8] {
        &self.kubeconfig
    }

    /// Namespace hosting the virtual machines
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Validated vSphere platform options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformOptions {
    pub(crate) strategy: PublishingStrategy,
    pub(crate) api_server_address: Option<String>,
    pub(crate) memory: Option<String>,
    pub(crate) cores: u32,
    pub(crate) root_volume_size: u32,
    pub(crate) root_volume_storage_class: Option<String>,
    pub(crate) root_volume_access_modes: Option<String>,
    pub(crate) container_disk_image: Option<String>,
    pub(crate) infra_credentials: Option<InfraCredentials>,
}

impl PlatformOptions {
    /// Publishing strategy
    pub fn strategy(&self) -> PublishingStrategy {
        self.strategy
    }

    /// API server address; set for NodePort unless only rendering
    pub fn api_server_address(&self) -> Option<&str> {
        self.api_server_address.as_deref()
    }

    /// Guest memory quantity
    pub fn memory(&self) -> Option<&str> {
        self.memory.as_deref()
    }

    /// Guest cores, at least 1
    pub fn cores(&self) -> u32 {
        self.cores
    }

    /// Root volume size in Gi, at least 8
    pub fn root_volume_size(&self) -> u32 {
        self.root_volume_size
    }

    /// Root volume storage class
    pub fn root_volume_storage_class(&self) -> Option<&str> {
        self.root_volume_storage_class.as_deref()
    }

    /// Comma-delimited root volume access modes
    pub fn root_volume_access_modes(&self) -> Option<&str> {
        self.root_volume_access_modes.as_deref()
    }

    /// Boot disk container image
    pub fn container_disk_image(&self) -> Option<&str> {
        self.container_disk_image.as_deref()
    }

    /// External infra cluster credentials
    pub fn infra_credentials(&self) -> Option<&InfraCredentials> {
        self.infra_credentials.as_ref()
    }
}

/// Result of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOptions {
    pub(crate) infra_id: String,
    pub(crate) base_domain: BaseDomain,
    pub(crate) platform: PlatformOptions,
}

impl ValidatedOptions {
    /// Infra ID, supplied or derived
    pub fn infra_id(&self) -> &str {
        &self.infra_id
    }

    /// Base domain decision
    pub fn base_domain(&self) -> &BaseDomain {
        &self.base_domain
    }

    /// Platform options
    pub fn platform(&self) -> &PlatformOptions {
        &self.platform
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Whether `value` is a Kubernetes resource quantity without sign
fn is_quantity(value: &str) -> bool {
    let number_end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(number_end);
    let digits = number.chars().filter(char::is_ascii_digit).count();
    let valid_number = digits > 0 && number.matches('.').count() <= 1;

    let valid_suffix = matches!(
        suffix,
        "" | "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" | "m" | "k" | "M" | "G" | "T" | "P" | "E"
    ) || suffix
        .strip_prefix(|c: char| c == 'e' || c == 'E')
        .map(|exponent| exponent.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(exponent))
        .is_some_and(|exponent| {
            !exponent.is_empty() && exponent.chars().all(|c| c.is_ascii_digit())
        });

    valid_number && valid_suffix
}

/// Validates raw vSphere options.
///
/// Rules, in order: publishing strategy, address/strategy pairing, address
/// lookup (NodePort, no address, not rendering), cores, root volume size,
/// memory quantity, kubeconfig/namespace pairing, kubeconfig read, infra ID,
/// base domain.
pub async fn validate<R, G>(
    raw: RawVSphereOptions,
    identity: ClusterIdentity,
    resolver: &R,
    infra_ids: &G,
) -> Result<ValidatedOptions, OptionsError>
where
    R: ApiServerAddressResolver + ?Sized,
    G: InfraIdGenerator + ?Sized,
{
    let strategy: PublishingStrategy = raw.service_publishing_strategy.parse()?;

    if strategy != PublishingStrategy::NodePort && !raw.api_server_address.is_empty() {
        return Err(OptionsError::ApiServerAddressRequiresNodePort(strategy));
    }

    let mut api_server_address = non_empty(raw.api_server_address);
    if api_server_address.is_none()
        && strategy == PublishingStrategy::NodePort
        && !identity.render
    {
        debug!("Resolving API server address from cluster nodes");
        let address = resolver.resolve().await.map_err(OptionsError::AddressLookup)?;
        info!("Using node address {} for the API server", address);
        api_server_address = Some(address);
    }

    if raw.cores < 1 {
        return Err(OptionsError::InvalidCores);
    }

    if raw.root_volume_size < MIN_ROOT_VOLUME_SIZE {
        return Err(OptionsError::RootVolumeTooSmall(raw.root_volume_size));
    }

    if !raw.memory.is_empty() && !is_quantity(&raw.memory) {
        return Err(OptionsError::InvalidMemory(raw.memory));
    }

    let infra_credentials = match (
        non_empty(raw.infra_kubeconfig_file),
        non_empty(raw.infra_namespace),
    ) {
        (None, None) => None,
        (None, Some(_)) => return Err(OptionsError::InfraNamespaceWithoutKubeconfig),
        (Some(_), None) => return Err(OptionsError::InfraKubeconfigWithoutNamespace),
        (Some(path), Some(namespace)) => {
            let path = PathBuf::from(path);
            let kubeconfig = tokio::fs::read(&path)
                .await
                .map_err(|source| OptionsError::ReadInfraKubeconfig { path, source })?;
            Some(InfraCredentials { kubeconfig, namespace })
        }
    };

    // An empty infra ID counts as not supplied
    let infra_id = if identity.infra_id.is_empty() {
        infra_ids.generate(&identity.name)
    } else {
        identity.infra_id
    };

    let base_domain = match non_empty(identity.base_domain) {
        Some(domain) => BaseDomain::Explicit(domain),
        None => BaseDomain::Passthrough,
    };

    Ok(ValidatedOptions {
        infra_id,
        base_domain,
        platform: PlatformOptions {
            strategy,
            api_server_address,
            memory: non_empty(raw.memory),
            cores: raw.cores,
            root_volume_size: raw.root_volume_size,
            root_volume_storage_class: non_empty(raw.root_volume_storage_class),
            root_volume_access_modes: non_empty(raw.root_volume_access_modes),
            container_disk_image: non_empty(raw.container_disk_image),
            infra_credentials,
        },
    })
}
