use crate::{common::error::Result, config::DeployConfig, opts::CliArgs};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod bootstrap;
mod common;
mod config;
mod deploy;
mod helm;
mod opts;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let opts = CliArgs::parse();

    run(&opts).await.map_err(|error| {
        error!(%error, "Failed to deploy Composer");
        error
    })
}

async fn run(opts: &CliArgs) -> Result<()> {
    let config = DeployConfig::from_file(opts.config().as_path())?;

    deploy::deploy(&config, opts.upgrade(), opts.pod_timeout()).await?;

    if opts.skip_bootstrap() {
        info!("Skipping post-deploy bootstrap");
        return Ok(());
    }

    let namespace = config.peer_namespace()?.to_string();
    bootstrap::setup_admin_card(&config, namespace.as_str()).await?;
    bootstrap::install_network(&config, namespace.as_str()).await?;

    let rest_info = deploy::composer_rest_info(&config).await?;
    info!(
        rest.uri = %rest_info.uri(),
        rest.api_key = %rest_info.api_key(),
        "Composer REST connection data"
    );

    info!("Composer deployment complete");
    Ok(())
}

/// Initialize logging components -- tracing.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
