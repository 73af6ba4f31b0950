//! Example manifest builder
//!
//! Pure projections of validated options into the declarative shapes used
//! when rendering bootstrap manifests. Unset optional values are left out so
//! the infrastructure layer applies its own defaults.

use crds::{
    NodePortPublishingStrategy, PublishingStrategyType, ServicePublishingStrategy,
    ServicePublishingStrategyMapping, ServiceType, VSphereCompute, VSphereDiskImage,
    VSphereNodePoolPlatform, VSpherePersistentVolume, VSphereRootVolume, VSphereVolume,
    VSphereVolumeType,
};

use crate::options::{PlatformOptions, PublishingStrategy};

/// Splits a comma-delimited access mode list, keeping order and duplicates.
pub fn parse_access_modes(modes: &str) -> Vec<String> {
    if modes.is_empty() {
        return Vec::new();
    }
    modes.split(',').map(str::to_string).collect()
}

/// Builds the vSphere node pool platform for the given options.
pub fn build_manifest(options: &PlatformOptions) -> VSphereNodePoolPlatform {
    let persistent = VSpherePersistentVolume {
        size: Some(format!("{}Gi", options.root_volume_size())),
        storage_class: options.root_volume_storage_class().map(str::to_string),
        access_modes: options
            .root_volume_access_modes()
            .map(parse_access_modes)
            .unwrap_or_default(),
    };

    let image = options.container_disk_image().map(|image| VSphereDiskImage {
        container_disk_image: Some(image.to_string()),
    });

    let cores = Some(options.cores()).filter(|cores| *cores != 0);

    VSphereNodePoolPlatform {
        root_volume: Some(VSphereRootVolume {
            image,
            volume: VSphereVolume {
                type_: VSphereVolumeType::Persistent,
                persistent: Some(persistent),
            },
        }),
        compute: Some(VSphereCompute {
            memory: options.memory().map(str::to_string),
            cores,
        }),
    }
}

/// Publishing strategy of every control plane service.
///
/// NodePort publishes all services on `address`; Ingress puts the API server
/// behind a load balancer and routes the rest.
pub fn service_publishing(
    strategy: PublishingStrategy,
    address: Option<&str>,
) -> Vec<ServicePublishingStrategyMapping> {
    let services = [
        ServiceType::APIServer,
        ServiceType::OAuthServer,
        ServiceType::Konnectivity,
        ServiceType::Ignition,
    ];

    services
        .into_iter()
        .map(|service| {
            let service_publishing_strategy = match strategy {
                PublishingStrategy::NodePort => ServicePublishingStrategy {
                    type_: PublishingStrategyType::NodePort,
                    node_port: Some(NodePortPublishingStrategy {
                        address: address.unwrap_or_default().to_string(),
                    }),
                },
                PublishingStrategy::Ingress if service == ServiceType::APIServer => {
                    ServicePublishingStrategy {
                        type_: PublishingStrategyType::LoadBalancer,
                        node_port: None,
                    }
                }
                PublishingStrategy::Ingress => ServicePublishingStrategy {
                    type_: PublishingStrategyType::Route,
                    node_port: None,
                },
            };
            ServicePublishingStrategyMapping {
                service,
                service_publishing_strategy,
            }
        })
        .collect()
}
