use crate::{
    common::error::{
        HelmClientNs, HelmCommand, HelmInstallCommand, HelmListCommand, HelmReleaseAbsent,
        HelmUpgradeCommand, ReleaseSpecIncomplete, Result, U8VectorToString, YamlParseFromSlice,
    },
    helm::values::ExtraVars,
    vec_to_strings,
};
use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::{process::Command, str};
use tracing::{debug, info};

/// This struct is used to deserialize the output of `helm list -n <namespace> --deployed -o yaml`.
#[derive(Clone, Deserialize)]
pub(crate) struct HelmReleaseElement {
    name: String,
}

impl HelmReleaseElement {
    /// This is a getter function for the name of the release.
    pub(crate) fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// A desired chart release: where the chart comes from, and what the release is called.
/// The target Namespace lives on the HelmReleaseClient, because all of a client's releases
/// are tied to one Namespace.
#[derive(Clone, Debug)]
pub(crate) struct ReleaseSpec {
    chart_repo: String,
    chart_name: String,
    release_name: String,
    extra_vars: ExtraVars,
}

impl ReleaseSpec {
    /// This creates an empty builder.
    pub(crate) fn builder() -> ReleaseSpecBuilder {
        ReleaseSpecBuilder::default()
    }

    /// This is a getter function for the release name.
    pub(crate) fn release_name(&self) -> &str {
        self.release_name.as_str()
    }

    /// The `<repo>/<chart>` reference handed to Helm.
    fn chart_ref(&self) -> String {
        format!("{}/{}", self.chart_repo, self.chart_name)
    }
}

/// This is a builder for ReleaseSpec.
#[derive(Default)]
pub(crate) struct ReleaseSpecBuilder {
    chart_repo: Option<String>,
    chart_name: Option<String>,
    release_name: Option<String>,
    extra_vars: ExtraVars,
}

impl ReleaseSpecBuilder {
    /// This is a builder option to add the chart repository.
    #[must_use]
    pub(crate) fn with_chart_repo<J>(mut self, chart_repo: J) -> Self
    where
        J: ToString,
    {
        self.chart_repo = Some(chart_repo.to_string());
        self
    }

    /// This is a builder option to add the chart name.
    #[must_use]
    pub(crate) fn with_chart_name<J>(mut self, chart_name: J) -> Self
    where
        J: ToString,
    {
        self.chart_name = Some(chart_name.to_string());
        self
    }

    /// This is a builder option to add the release name.
    #[must_use]
    pub(crate) fn with_release_name<J>(mut self, release_name: J) -> Self
    where
        J: ToString,
    {
        self.release_name = Some(release_name.to_string());
        self
    }

    /// This is a builder option to add the extra variables for install/upgrade.
    #[must_use]
    pub(crate) fn with_extra_vars(mut self, extra_vars: ExtraVars) -> Self {
        self.extra_vars = extra_vars;
        self
    }

    /// Build the ReleaseSpec.
    pub(crate) fn build(self) -> Result<ReleaseSpec> {
        let chart_repo = self.chart_repo.context(ReleaseSpecIncomplete {
            field: "chart_repo".to_string(),
        })?;
        let chart_name = self.chart_name.context(ReleaseSpecIncomplete {
            field: "chart_name".to_string(),
        })?;
        let release_name = self.release_name.context(ReleaseSpecIncomplete {
            field: "release_name".to_string(),
        })?;

        Ok(ReleaseSpec {
            chart_repo,
            chart_name,
            release_name,
            extra_vars: self.extra_vars,
        })
    }
}

/// This is a builder for HelmReleaseClient.
#[derive(Default)]
pub(crate) struct HelmReleaseClientBuilder {
    namespace: Option<String>,
}

impl HelmReleaseClientBuilder {
    /// This is a builder option to add Namespace. This is mandatory,
    /// because all helm releases are tied to a Namespace.
    #[must_use]
    pub(crate) fn with_namespace<J>(mut self, ns: J) -> Self
    where
        J: ToString,
    {
        self.namespace = Some(ns.to_string());
        self
    }

    /// Build the HelmReleaseClient.
    pub(crate) fn build(self) -> Result<HelmReleaseClient> {
        let ns = self.namespace.ok_or(HelmClientNs.build())?;
        Ok(HelmReleaseClient { namespace: ns })
    }
}

/// This type has functions which execute helm commands to probe for and modify helm releases.
#[derive(Clone)]
pub(crate) struct HelmReleaseClient {
    pub(crate) namespace: String,
}

impl HelmReleaseClient {
    /// This creates an empty builder.
    pub(crate) fn builder() -> HelmReleaseClientBuilder {
        HelmReleaseClientBuilder::default()
    }

    /// Runs command `helm list -n <namespace> --deployed -o yaml`.
    pub(crate) fn list_as_yaml(&self) -> Result<Vec<HelmReleaseElement>> {
        let command: &str = "helm";
        let mut args: Vec<String> =
            vec_to_strings!["list", "-n", self.namespace.as_str(), "--deployed"];

        // Because this option has to be at the end for it to work.
        let output_format_args: Vec<String> = vec_to_strings!["-o", "yaml"];
        args.extend(output_format_args);

        debug!(%command, ?args, "Helm list command");

        let output = Command::new(command)
            .args(args.clone())
            .output()
            .context(HelmCommand {
                command: command.to_string(),
                args: args.clone(),
            })?;

        let stdout_str = str::from_utf8(output.stdout.as_slice()).context(U8VectorToString)?;
        debug!(stdout=%stdout_str, "Helm list command standard output");
        ensure!(
            output.status.success(),
            HelmListCommand {
                command: command.to_string(),
                args,
                std_err: str::from_utf8(output.stderr.as_slice())
                    .context(U8VectorToString)?
                    .to_string()
            }
        );

        serde_yaml::from_slice(output.stdout.as_slice()).context(YamlParseFromSlice {
            input_yaml: stdout_str.to_string(),
        })
    }

    /// This is the existence probe: does a deployed release with this name exist in the
    /// Namespace?
    pub(crate) fn release_exists(&self, release_name: &str) -> Result<bool> {
        Ok(find_release(self.list_as_yaml()?.as_slice(), release_name).is_some())
    }

    /// Runs command `helm install <release_name> <repo>/<chart> -n <namespace> <extra-args>`.
    /// This is idempotent on release existence: installing an already-present release is a
    /// logged no-op, not an error.
    pub(crate) fn install(&self, spec: &ReleaseSpec) -> Result<()> {
        let release_exists = self.release_exists(spec.release_name())?;
        install_with(self.namespace.as_str(), spec, release_exists, |args| {
            self.run_install(args)
        })
    }

    /// Runs command `helm upgrade <release_name> <repo>/<chart> -n <namespace> <extra-args>`.
    /// Upgrading a release that does not exist is a hard error, surfaced before any upgrade
    /// command is issued.
    pub(crate) fn upgrade(&self, spec: &ReleaseSpec) -> Result<()> {
        let release_exists = self.release_exists(spec.release_name())?;
        upgrade_with(self.namespace.as_str(), spec, release_exists, |args| {
            self.run_upgrade(args)
        })
    }

    /// Spawn the install command and fail on a non-zero exit.
    fn run_install(&self, args: Vec<String>) -> Result<()> {
        let command: &str = "helm";

        debug!(%command, ?args, "Helm install command");

        let output = Command::new(command)
            .args(args.clone())
            .output()
            .context(HelmCommand {
                command: command.to_string(),
                args: args.clone(),
            })?;

        let stdout_str = str::from_utf8(output.stdout.as_slice()).context(U8VectorToString)?;
        debug!(stdout=%stdout_str, "Helm install command standard output");
        ensure!(
            output.status.success(),
            HelmInstallCommand {
                command: command.to_string(),
                args,
                std_err: str::from_utf8(output.stderr.as_slice())
                    .context(U8VectorToString)?
                    .to_string()
            }
        );

        Ok(())
    }

    /// Spawn the upgrade command and fail on a non-zero exit.
    fn run_upgrade(&self, args: Vec<String>) -> Result<()> {
        let command: &str = "helm";

        debug!(%command, ?args, "Helm upgrade command");

        let output = Command::new(command)
            .args(args.clone())
            .output()
            .context(HelmCommand {
                command: command.to_string(),
                args: args.clone(),
            })?;

        let stdout_str = str::from_utf8(output.stdout.as_slice()).context(U8VectorToString)?;
        debug!(stdout=%stdout_str, "Helm upgrade command standard output");
        ensure!(
            output.status.success(),
            HelmUpgradeCommand {
                command: command.to_string(),
                args,
                std_err: str::from_utf8(output.stderr.as_slice())
                    .context(U8VectorToString)?
                    .to_string()
            }
        );

        Ok(())
    }
}

/// The install gate: an existing release makes the install a logged no-op, and the runner is
/// never invoked.
fn install_with<R>(
    namespace: &str,
    spec: &ReleaseSpec,
    release_exists: bool,
    mut run: R,
) -> Result<()>
where
    R: FnMut(Vec<String>) -> Result<()>,
{
    if release_exists {
        info!(
            release.name = %spec.release_name(),
            namespace = %namespace,
            "Helm release is already installed, skipping install"
        );
        return Ok(());
    }

    run(install_args(namespace, spec))?;

    info!(
        release.name = %spec.release_name(),
        namespace = %namespace,
        "Installed Helm release"
    );

    Ok(())
}

/// The upgrade gate: a missing release is a hard error, and the runner is never invoked.
fn upgrade_with<R>(
    namespace: &str,
    spec: &ReleaseSpec,
    release_exists: bool,
    mut run: R,
) -> Result<()>
where
    R: FnMut(Vec<String>) -> Result<()>,
{
    ensure!(
        release_exists,
        HelmReleaseAbsent {
            name: spec.release_name().to_string(),
            namespace: namespace.to_string(),
        }
    );

    run(upgrade_args(namespace, spec))?;

    info!(
        release.name = %spec.release_name(),
        namespace = %namespace,
        "Upgraded Helm release"
    );

    Ok(())
}

/// The argument vector of the install command.
fn install_args(namespace: &str, spec: &ReleaseSpec) -> Vec<String> {
    let mut args: Vec<String> = vec_to_strings![
        "install",
        spec.release_name(),
        spec.chart_ref(),
        "-n",
        namespace
    ];
    args.extend(spec.extra_vars.to_args());
    args
}

/// The argument vector of the upgrade command.
fn upgrade_args(namespace: &str, spec: &ReleaseSpec) -> Vec<String> {
    let mut args: Vec<String> = vec_to_strings![
        "upgrade",
        spec.release_name(),
        spec.chart_ref(),
        "-n",
        namespace
    ];
    args.extend(spec.extra_vars.to_args());
    args
}

/// Find a release by name in a parsed `helm list` output.
fn find_release<'a>(
    releases: &'a [HelmReleaseElement],
    release_name: &str,
) -> Option<&'a HelmReleaseElement> {
    releases.iter().find(|release| release.name() == release_name)
}

#[cfg(test)]
mod tests {
    use super::{
        find_release, install_args, install_with, upgrade_args, upgrade_with, HelmReleaseElement,
        ReleaseSpec,
    };
    use crate::{
        common::error::Error,
        helm::values::{ExtraVars, HelmSetVar},
    };

    fn spec() -> ReleaseSpec {
        ReleaseSpec::builder()
            .with_chart_repo("aidtech")
            .with_chart_name("hl-composer")
            .with_release_name("hlc")
            .with_extra_vars(
                ExtraVars::default()
                    .with_version(Some("0.2.6".to_string()))
                    .with_set_var(HelmSetVar::new("rest.config.apiKey", "xyz")),
            )
            .build()
            .expect("all mandatory fields are set")
    }

    #[test]
    fn install_args_follow_the_helm_grammar() {
        assert_eq!(
            install_args("peer-ns", &spec()),
            vec![
                "install",
                "hlc",
                "aidtech/hl-composer",
                "-n",
                "peer-ns",
                "--version",
                "0.2.6",
                "--set",
                "rest.config.apiKey=xyz",
            ]
        );
    }

    #[test]
    fn upgrade_args_follow_the_helm_grammar() {
        assert_eq!(
            upgrade_args("peer-ns", &spec()),
            vec![
                "upgrade",
                "hlc",
                "aidtech/hl-composer",
                "-n",
                "peer-ns",
                "--version",
                "0.2.6",
                "--set",
                "rest.config.apiKey=xyz",
            ]
        );
    }

    #[test]
    fn install_on_an_existing_release_runs_no_command() {
        let mut issued: Vec<Vec<String>> = Vec::new();

        install_with("peer-ns", &spec(), true, |args| {
            issued.push(args);
            Ok(())
        })
        .expect("an existing release is a no-op");

        assert!(issued.is_empty());
    }

    #[test]
    fn install_on_a_missing_release_runs_the_install_command() {
        let mut issued: Vec<Vec<String>> = Vec::new();

        install_with("peer-ns", &spec(), false, |args| {
            issued.push(args);
            Ok(())
        })
        .expect("a missing release gets installed");

        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0][0], "install");
    }

    #[test]
    fn upgrade_on_a_missing_release_is_a_hard_error() {
        let mut issued: Vec<Vec<String>> = Vec::new();

        let error = upgrade_with("peer-ns", &spec(), false, |args| {
            issued.push(args);
            Ok(())
        })
        .expect_err("the release is absent");

        assert!(matches!(error, Error::HelmReleaseAbsent { name, .. } if name == "hlc"));
        assert!(issued.is_empty());
    }

    #[test]
    fn upgrade_on_an_existing_release_runs_the_upgrade_command() {
        let mut issued: Vec<Vec<String>> = Vec::new();

        upgrade_with("peer-ns", &spec(), true, |args| {
            issued.push(args);
            Ok(())
        })
        .expect("an existing release gets upgraded");

        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0][0], "upgrade");
    }

    #[test]
    fn release_spec_requires_a_release_name() {
        let error = ReleaseSpec::builder()
            .with_chart_repo("aidtech")
            .with_chart_name("hl-composer")
            .build()
            .expect_err("release name is absent");
        assert!(matches!(error, Error::ReleaseSpecIncomplete { field } if field == "release_name"));
    }

    #[test]
    fn finds_releases_in_parsed_list_output() {
        let releases: Vec<HelmReleaseElement> = serde_yaml::from_str(
            r#"
- name: hlc
  namespace: peer-ns
- name: hlf-peer
  namespace: peer-ns
"#,
        )
        .expect("helm list yaml must parse");

        assert!(find_release(releases.as_slice(), "hlc").is_some());
        assert!(find_release(releases.as_slice(), "ghost").is_none());
    }
}
