use crate::common::{
    error::{Result, SecretKeyNotFound, SecretNotFound, SecretValueNotUtf8},
    kube_client,
};
use k8s_openapi::api::core::v1::Secret;
use snafu::{OptionExt, ResultExt};
use std::path::PathBuf;
use tracing::debug;

/// A single `--set`/`--set-string` override for a Helm release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct HelmSetVar {
    key: String,
    value: String,
    set_as_string: bool,
}

impl HelmSetVar {
    /// A typed override, rendered with `--set`.
    pub(crate) fn new<K, V>(key: K, value: V) -> Self
    where
        K: ToString,
        V: ToString,
    {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            set_as_string: false,
        }
    }

    /// A string-literal override, rendered with `--set-string`.
    pub(crate) fn new_string<K, V>(key: K, value: V) -> Self
    where
        K: ToString,
        V: ToString,
    {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            set_as_string: true,
        }
    }
}

/// A reference to a value managed outside the chart (e.g. a generated API key) which must be
/// read back from its live Secret and re-injected on upgrade, so that the upgrade does not
/// clobber it.
#[derive(Clone, Debug)]
pub(crate) struct PreservedSecretRef {
    pub(crate) secret_namespace: String,
    pub(crate) secret_name: String,
    pub(crate) data_key: String,
    pub(crate) values_path: String,
}

/// Extra variables for `helm install`/`helm upgrade`, rendered as an argument vector in a
/// fixed order: version flag, values files, then set variables. Insertion order of files and
/// variables is kept, since Helm resolves duplicate keys as last-wins.
#[derive(Clone, Debug, Default)]
pub(crate) struct ExtraVars {
    version: Option<String>,
    values_files: Vec<PathBuf>,
    set_vars: Vec<HelmSetVar>,
}

impl ExtraVars {
    /// This is a builder option to pin the chart version.
    #[must_use]
    pub(crate) fn with_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    /// This is a builder option to append one values file.
    #[must_use]
    pub(crate) fn with_values_file(mut self, file: PathBuf) -> Self {
        self.values_files.push(file);
        self
    }

    /// This is a builder option to append one set variable.
    #[must_use]
    pub(crate) fn with_set_var(mut self, var: HelmSetVar) -> Self {
        self.set_vars.push(var);
        self
    }

    /// This is a builder option to append a sequence of set variables.
    #[must_use]
    pub(crate) fn with_set_vars<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = HelmSetVar>,
    {
        self.set_vars.extend(vars);
        self
    }

    /// Render the extra variables as Helm command arguments.
    pub(crate) fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if let Some(ref version) = self.version {
            args.push("--version".to_string());
            args.push(version.clone());
        }

        for file in self.values_files.iter() {
            args.push("-f".to_string());
            args.push(file.to_string_lossy().to_string());
        }

        for var in self.set_vars.iter() {
            args.push(
                if var.set_as_string {
                    "--set-string"
                } else {
                    "--set"
                }
                .to_string(),
            );
            args.push(format!("{}={}", var.key, var.value));
        }

        args
    }
}

/// Resolve preserved-secret references against the live cluster state. Each reference reads
/// its Secret and yields one set variable bound to the current value. A missing Secret or
/// data key is a hard error.
pub(crate) async fn resolve_preserved(refs: &[PreservedSecretRef]) -> Result<Vec<HelmSetVar>> {
    let mut set_vars: Vec<HelmSetVar> = Vec::with_capacity(refs.len());

    for preserve in refs.iter() {
        let secret = kube_client::get_secret(
            preserve.secret_name.as_str(),
            preserve.secret_namespace.as_str(),
        )
        .await?
        .context(SecretNotFound {
            name: preserve.secret_name.clone(),
            namespace: preserve.secret_namespace.clone(),
        })?;

        let set_var = set_var_from_secret(&secret, preserve)?;
        debug!(
            secret.name = %preserve.secret_name,
            values.path = %preserve.values_path,
            "Preserving Secret value across upgrade"
        );
        set_vars.push(set_var);
    }

    Ok(set_vars)
}

/// Extract the referenced data key from a Secret and bind it to its values path.
pub(crate) fn set_var_from_secret(
    secret: &Secret,
    preserve: &PreservedSecretRef,
) -> Result<HelmSetVar> {
    let data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(preserve.data_key.as_str()))
        .context(SecretKeyNotFound {
            key: preserve.data_key.clone(),
            name: preserve.secret_name.clone(),
            namespace: preserve.secret_namespace.clone(),
        })?;

    let value = String::from_utf8(data.0.clone()).context(SecretValueNotUtf8 {
        key: preserve.data_key.clone(),
        name: preserve.secret_name.clone(),
        namespace: preserve.secret_namespace.clone(),
    })?;

    Ok(HelmSetVar::new(preserve.values_path.as_str(), value))
}
