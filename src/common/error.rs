use snafu::Snafu;
use std::path::PathBuf;

/// For use with multiple fallible operations which may fail for different reasons, but are
/// defined withing the same scope and must return to the outer scope (calling scope) using
/// the try operator -- '?'.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))]
pub(crate) enum Error {
    /// Error for when Kubernetes API client generation fails.
    #[snafu(display("Failed to generate kubernetes client: {}", source))]
    K8sClientGeneration { source: kube_client::Error },

    /// Error for when a Kubernetes API LIST request for Pods fails.
    #[snafu(display(
        "Failed to list Pods with label {} and field {} in namespace {}: {}",
        label,
        field,
        namespace,
        source
    ))]
    ListPodsWithLabelAndField {
        source: kube::Error,
        label: String,
        field: String,
        namespace: String,
    },

    /// Error for when a Kubernetes API GET request for a Secret fails.
    #[snafu(display("Failed to GET Secret {} in namespace {}: {}", name, namespace, source))]
    GetSecret {
        source: kube::Error,
        name: String,
        namespace: String,
    },

    /// Error for when a Secret which must exist is absent.
    #[snafu(display("Secret {} not found in namespace {}", name, namespace))]
    SecretNotFound { name: String, namespace: String },

    /// Error for when a Secret exists, but lacks the requested data key.
    #[snafu(display(
        "Secret {} in namespace {} does not carry the data key {}",
        name,
        namespace,
        key
    ))]
    SecretKeyNotFound {
        key: String,
        name: String,
        namespace: String,
    },

    /// Error for when a Secret value is not valid UTF-8.
    #[snafu(display(
        "Value of key {} in Secret {} in namespace {} is not valid UTF-8: {}",
        key,
        name,
        namespace,
        source
    ))]
    SecretValueNotUtf8 {
        source: std::string::FromUtf8Error,
        key: String,
        name: String,
        namespace: String,
    },

    /// Error for when a Kubernetes API CREATE request for a Secret fails.
    #[snafu(display(
        "Failed to CREATE Secret {} in namespace {}: {}",
        name,
        namespace,
        source
    ))]
    CreateSecret {
        source: kube::Error,
        name: String,
        namespace: String,
    },

    /// Error for when a Kubernetes API GET request for a ConfigMap fails.
    #[snafu(display(
        "Failed to GET ConfigMap {} in namespace {}: {}",
        name,
        namespace,
        source
    ))]
    GetConfigMap {
        source: kube::Error,
        name: String,
        namespace: String,
    },

    /// Error for when a Kubernetes API CREATE request for a ConfigMap fails.
    #[snafu(display(
        "Failed to CREATE ConfigMap {} in namespace {}: {}",
        name,
        namespace,
        source
    ))]
    CreateConfigMap {
        source: kube::Error,
        name: String,
        namespace: String,
    },

    /// Error for when a Kubernetes API GET request for an Ingress fails.
    #[snafu(display(
        "Failed to GET Ingress {} in namespace {}: {}",
        name,
        namespace,
        source
    ))]
    GetIngress {
        source: kube::Error,
        name: String,
        namespace: String,
    },

    /// Error for when an Ingress exists, but exposes no host.
    #[snafu(display("Ingress {} in namespace {} has no host", name, namespace))]
    IngressHostAbsent { name: String, namespace: String },

    /// Error for when a file read fails.
    #[snafu(display("Failed to read from file {}: {}", filepath.display(), source))]
    ReadingFile {
        source: std::io::Error,
        filepath: PathBuf,
    },

    /// Error for when yaml could not be parsed from a file (Reader).
    #[snafu(display("Failed to parse YAML at {}: {}", filepath.display(), source))]
    YamlParseFromFile {
        source: serde_yaml::Error,
        filepath: PathBuf,
    },

    /// Error for when yaml could not be parsed from a slice.
    #[snafu(display("Failed to parse YAML {}: {}", input_yaml, source))]
    YamlParseFromSlice {
        source: serde_yaml::Error,
        input_yaml: String,
    },

    /// Error for when the connection profile could not be serialized to JSON.
    #[snafu(display("Failed to serialize connection profile: {}", source))]
    SerializeConnectionProfile { source: serde_json::Error },

    /// Error for when the peer MSP named in the config has no definition of its own.
    #[snafu(display("MSP {} is not defined in the 'msps' config section", msp))]
    MspNotDefined { msp: String },

    /// Error for when the CA named by an MSP has no definition of its own.
    #[snafu(display(
        "CA {} (named by MSP {}) is not defined in the 'cas' config section",
        ca,
        msp
    ))]
    CaNotDefined { ca: String, msp: String },

    /// Error for when the Helm client is built without a Namespace.
    #[snafu(display("Helm client Namespace is absent"))]
    HelmClientNs,

    /// Error for when a mandatory field of a Helm release spec is absent.
    #[snafu(display("Helm release spec field '{}' is absent", field))]
    ReleaseSpecIncomplete { field: String },

    /// Error for when a Helm command fails to spawn.
    #[snafu(display(
        "Failed to run Helm command,\ncommand: {},\nargs: {:?},\ncommand_error: {}",
        command,
        args,
        source
    ))]
    HelmCommand {
        source: std::io::Error,
        command: String,
        args: Vec<String>,
    },

    /// Error for when the `helm list` command returns an error.
    #[snafu(display(
        "`helm list` command failed,\ncommand: {},\nargs: {:?},\nstd_err: {}",
        command,
        args,
        std_err
    ))]
    HelmListCommand {
        command: String,
        args: Vec<String>,
        std_err: String,
    },

    /// Error for when the `helm install` command returns an error.
    #[snafu(display(
        "`helm install` command failed,\ncommand: {},\nargs: {:?},\nstd_err: {}",
        command,
        args,
        std_err
    ))]
    HelmInstallCommand {
        command: String,
        args: Vec<String>,
        std_err: String,
    },

    /// Error for when the `helm upgrade` command returns an error.
    #[snafu(display(
        "`helm upgrade` command failed,\ncommand: {},\nargs: {:?},\nstd_err: {}",
        command,
        args,
        std_err
    ))]
    HelmUpgradeCommand {
        command: String,
        args: Vec<String>,
        std_err: String,
    },

    /// Error for when a Helm release which an upgrade was requested for does not exist.
    #[snafu(display(
        "Cannot upgrade Helm release {} in namespace {}: release does not exist",
        name,
        namespace
    ))]
    HelmReleaseAbsent { name: String, namespace: String },

    /// Error for when a Vec<u8> cannot be converted to a String.
    #[snafu(display("Failed to convert Vec<u8> to String: {}", source))]
    U8VectorToString { source: std::str::Utf8Error },

    /// Error for when regular expression parsing or compilation fails.
    #[snafu(display("Failed to compile regex {}: {}", expression, source))]
    RegexCompile {
        source: regex::Error,
        expression: String,
    },

    /// Error for when a network archive filename does not follow `<name>_<version>.bna`.
    #[snafu(display(
        "Network archive filename '{}' does not follow the '<name>_<version>.bna' convention",
        filename
    ))]
    ArchiveNameParse { filename: String },

    /// Error for when a network archive file path carries no file name.
    #[snafu(display("Network archive path {} has no file name", filepath.display()))]
    ArchiveFileName { filepath: PathBuf },

    /// Error for when the remote archive directory holds no archive.
    #[snafu(display("No network archive found under {} in Pod {}", directory, pod))]
    ArchiveListEmpty { directory: String, pod: String },

    /// Error for when a kubectl command fails to spawn.
    #[snafu(display(
        "Failed to run kubectl command,\ncommand: {},\nargs: {:?},\ncommand_error: {}",
        command,
        args,
        source
    ))]
    KubectlCommand {
        source: std::io::Error,
        command: String,
        args: Vec<String>,
    },

    /// Error for when a command executed inside a pod returns an error.
    #[snafu(display(
        "Command executed in Pod {} failed,\ncommand: {},\nstd_err: {}",
        pod,
        command,
        std_err
    ))]
    PodExecCommand {
        pod: String,
        command: String,
        std_err: String,
    },

    /// Error for when no running Composer CLI pod matches the release's label selector.
    #[snafu(display(
        "No running Composer pod matching '{}' found in namespace {}",
        label,
        namespace
    ))]
    ComposerPodNotFound { label: String, namespace: String },

    /// Error for when the pod readiness wait exceeds its deadline.
    #[snafu(display(
        "Timed out waiting for {} Ready Pod(s) matching '{}' in namespace {}",
        expected,
        label,
        namespace
    ))]
    PodReadyTimeout {
        label: String,
        namespace: String,
        expected: usize,
    },
}

/// A wrapper type to remove repeated Error type returns.
pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
