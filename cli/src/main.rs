//! hcp
//!
//! Creates and destroys hosted clusters on the management cluster:
//! - `hcp create vsphere`: validates the vSphere options and renders or
//!   applies the Namespace, credentials Secret, HostedCluster and NodePool
//! - `hcp destroy vsphere`: runs the platform teardown hook and deletes the
//!   HostedCluster

mod create;
mod destroy;
mod manifests;
mod node_address;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::create::VSphereCreateArgs;
use crate::destroy::VSphereDestroyArgs;

/// Hosted control plane cluster management
#[derive(Parser, Debug)]
#[command(name = "hcp", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a hosted cluster
    #[command(subcommand)]
    Create(CreatePlatform),

    /// Destroy a hosted cluster
    #[command(subcommand)]
    Destroy(DestroyPlatform),
}

#[derive(Subcommand, Debug)]
enum CreatePlatform {
    /// Creates basic functional HostedCluster resources for the vSphere platform
    #[command(name = "vsphere")]
    VSphere(VSphereCreateArgs),
}

#[derive(Subcommand, Debug)]
enum DestroyPlatform {
    /// Destroys a HostedCluster and its vSphere resources
    #[command(name = "vsphere")]
    VSphere(VSphereDestroyArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|provider| anyhow!("failed to install rustls crypto provider {provider:?}"))?;

    // stdout carries rendered manifests, logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Create(CreatePlatform::VSphere(args)) => create::run(args).await,
        Commands::Destroy(DestroyPlatform::VSphere(args)) => destroy::run(args).await,
    };

    // returning the error prints `Error: ...` and exits non-zero
    if let Err(err) = &result {
        error!("{:#}", err);
    }
    result
}
