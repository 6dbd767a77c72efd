/// Helm release client: existence probe, install, upgrade.
pub(crate) mod client;

/// Extra variables for Helm commands: chart version, values files, `--set` overrides and
/// values preserved from live Secrets.
pub(crate) mod values;
