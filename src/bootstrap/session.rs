use crate::{
    common::{
        constants::CHART_NAME,
        error::{ComposerPodNotFound, KubectlCommand, PodExecCommand, Result, U8VectorToString},
        kube_client,
    },
    vec_to_strings,
};
use kube::ResourceExt;
use snafu::{ensure, OptionExt, ResultExt};
use std::{process::Command, str};
use tracing::debug;

/// Remote command execution inside one pod of the Composer release. The bootstrap
/// procedures are written against this seam rather than against `kubectl` directly.
pub(crate) trait RemoteSession {
    /// This is a getter function for the name of the bound pod.
    fn pod_name(&self) -> &str;

    /// Run a command inside the pod, failing on non-zero exit. Returns trimmed stdout.
    fn exec(&self, remote_command: &str) -> Result<String>;

    /// Existence probe: run a command inside the pod and map a non-zero exit or empty
    /// output to None. Absence here is an expected condition, not a failure.
    fn probe(&self, remote_command: &str) -> Result<Option<String>>;
}

/// An ephemeral handle for running commands inside one running pod of the Composer release,
/// through `kubectl exec`. Lifecycle is scoped to one orchestration call; nothing is
/// persisted.
pub(crate) struct PodSession {
    namespace: String,
    pod_name: String,
}

impl PodSession {
    /// Bind a session to a running pod of the release, found by its label selector.
    pub(crate) async fn for_release(namespace: &str, release_name: &str) -> Result<Self> {
        let label = format!("app={CHART_NAME},release={release_name}");

        let pods = kube_client::list_pods(
            namespace.to_string(),
            Some(label.clone()),
            Some("status.phase=Running".to_string()),
        )
        .await?;

        let pod = pods.first().context(ComposerPodNotFound {
            label,
            namespace: namespace.to_string(),
        })?;

        Ok(Self {
            namespace: namespace.to_string(),
            pod_name: pod.name_any(),
        })
    }

    /// Runs command `kubectl exec -n <namespace> <pod> -- bash -c <remote_command>`.
    fn output(&self, remote_command: &str) -> Result<std::process::Output> {
        let command: &str = "kubectl";
        let args: Vec<String> = vec_to_strings![
            "exec",
            "-n",
            self.namespace.as_str(),
            self.pod_name.as_str(),
            "--",
            "bash",
            "-c",
            remote_command
        ];

        debug!(%command, ?args, "Pod exec command");

        Command::new(command)
            .args(args.clone())
            .output()
            .context(KubectlCommand {
                command: command.to_string(),
                args,
            })
    }
}

impl RemoteSession for PodSession {
    fn pod_name(&self) -> &str {
        self.pod_name.as_str()
    }

    fn exec(&self, remote_command: &str) -> Result<String> {
        let output = self.output(remote_command)?;

        ensure!(
            output.status.success(),
            PodExecCommand {
                pod: self.pod_name.clone(),
                command: remote_command.to_string(),
                std_err: str::from_utf8(output.stderr.as_slice())
                    .context(U8VectorToString)?
                    .to_string()
            }
        );

        Ok(str::from_utf8(output.stdout.as_slice())
            .context(U8VectorToString)?
            .trim()
            .to_string())
    }

    fn probe(&self, remote_command: &str) -> Result<Option<String>> {
        let output = self.output(remote_command)?;

        if !output.status.success() {
            return Ok(None);
        }

        let stdout = str::from_utf8(output.stdout.as_slice())
            .context(U8VectorToString)?
            .trim()
            .to_string();

        Ok((!stdout.is_empty()).then_some(stdout))
    }
}
