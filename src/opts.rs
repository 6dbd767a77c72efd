use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// These are the supported cli configuration options for the deployer.
#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version)]
#[command(about = "Deploys Hyperledger Composer to a Kubernetes cluster", long_about = None)]
pub(crate) struct CliArgs {
    /// This is the filepath of the deployment topology YAML.
    #[arg(short, long, env = "COMPOSER_DEPLOY_CONFIG", value_name = "FILE_PATH")]
    config: PathBuf,

    /// Upgrade the existing Helm release instead of installing a new one.
    #[arg(long, default_value_t = false)]
    upgrade: bool,

    /// If set, this skips the post-deploy identity card and network bootstrap.
    #[arg(long, default_value_t = false)]
    skip_bootstrap: bool,

    /// Maximum time to wait for the release's Pods to become Ready.
    #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
    pod_timeout: Duration,
}

impl CliArgs {
    /// This returns the filepath of the deployment topology YAML.
    pub(crate) fn config(&self) -> PathBuf {
        self.config.clone()
    }

    /// This is a predicate to decide if the existing release should be upgraded instead of
    /// installed.
    pub(crate) fn upgrade(&self) -> bool {
        self.upgrade
    }

    /// This decides to skip the post-deploy bootstrap or not.
    pub(crate) fn skip_bootstrap(&self) -> bool {
        self.skip_bootstrap
    }

    /// This returns the deadline of the pod readiness wait.
    pub(crate) fn pod_timeout(&self) -> Duration {
        self.pod_timeout
    }
}
