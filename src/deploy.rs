use crate::{
    common::{
        constants::{
            CA_INGRESS_SUFFIX, CHART_NAME, COMPOSER_POD_COUNT, CONNECTION_PROFILE_KEY,
            POD_POLL_DELAY, REST_API_KEY, REST_API_KEY_VALUES_PATH, REST_SECRET_SUFFIX,
        },
        error::{
            ArchiveFileName, IngressHostAbsent, PodReadyTimeout, ReadingFile, Result,
            SecretKeyNotFound, SecretNotFound, SecretValueNotUtf8,
        },
        kube_client,
    },
    config::DeployConfig,
    helm::{
        client::{HelmReleaseClient, ReleaseSpec},
        values::{resolve_preserved, ExtraVars, PreservedSecretRef},
    },
};
use k8s_openapi::{
    api::core::v1::{Pod, Secret},
    ByteString,
};
use kube::ResourceExt;
use snafu::{OptionExt, ResultExt};
use std::{collections::BTreeMap, fs, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{info, warn};

/// Connection-profile synthesis.
pub(crate) mod connection;

/// Deploy the Composer release: prepare its cluster resources, install or upgrade the Helm
/// release, then block until the release's pods are Ready.
///
/// Resource preparation is idempotent read-then-create. There is no atomicity between the
/// read and the create; this orchestrator assumes it is the single writer of the resources
/// it prepares.
pub(crate) async fn deploy(
    config: &DeployConfig,
    upgrade: bool,
    pod_timeout: Duration,
) -> Result<()> {
    let namespace = config.peer_namespace()?.to_string();

    ensure_network_archive_secret(config, namespace.as_str()).await?;
    ensure_connection_configmap(config, namespace.as_str()).await?;

    let mut extra_vars = ExtraVars::default()
        .with_version(config.chart_version(CHART_NAME).map(ToString::to_string))
        .with_values_file(config.values_file());

    if upgrade {
        // The chart's REST component generates its API key at install time. Read the live
        // value back so the upgrade does not regenerate it.
        let preserved = [PreservedSecretRef {
            secret_namespace: namespace.clone(),
            secret_name: format!("{}{}", config.release_name(), REST_SECRET_SUFFIX),
            data_key: REST_API_KEY.to_string(),
            values_path: REST_API_KEY_VALUES_PATH.to_string(),
        }];
        extra_vars = extra_vars.with_set_vars(resolve_preserved(preserved.as_slice()).await?);
    }

    let spec = ReleaseSpec::builder()
        .with_chart_repo(config.chart_repo())
        .with_chart_name(CHART_NAME)
        .with_release_name(config.release_name())
        .with_extra_vars(extra_vars)
        .build()?;

    let client = HelmReleaseClient::builder()
        .with_namespace(namespace.as_str())
        .build()?;

    if upgrade {
        client.upgrade(&spec)?;
    } else {
        client.install(&spec)?;
    }

    wait_for_release_pods(
        namespace.as_str(),
        config.release_name(),
        COMPOSER_POD_COUNT,
        pod_timeout,
    )
    .await
}

/// Ensure the Secret holding the deployable network archive exists, creating it from the
/// configured local file when absent.
async fn ensure_network_archive_secret(config: &DeployConfig, namespace: &str) -> Result<()> {
    let secret_name = config.secret_bna();

    if kube_client::get_secret(secret_name, namespace).await?.is_some() {
        info!(secret.name = %secret_name, "Network archive Secret already exists");
        return Ok(());
    }

    let filepath = config.bna_file();
    let contents = fs::read(filepath).context(ReadingFile {
        filepath: filepath.to_path_buf(),
    })?;
    let data_key = filepath
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .context(ArchiveFileName {
            filepath: filepath.to_path_buf(),
        })?;

    kube_client::create_secret(
        secret_name,
        namespace,
        BTreeMap::from([(data_key, ByteString(contents))]),
    )
    .await?;

    info!(secret.name = %secret_name, "Created network archive Secret");
    Ok(())
}

/// Ensure the ConfigMap holding the connection profile exists. Only a 'not found' read
/// triggers profile synthesis and a create; an existing map is left untouched.
async fn ensure_connection_configmap(config: &DeployConfig, namespace: &str) -> Result<()> {
    let configmap_name = config.secret_connection();

    if kube_client::get_configmap(configmap_name, namespace)
        .await?
        .is_some()
    {
        info!(configmap.name = %configmap_name, "Connection ConfigMap already exists");
        return Ok(());
    }

    let ca_name = config.ca_name()?;
    let ca_namespace = config.ca_namespace()?;
    let ingress_name = format!("{ca_name}{CA_INGRESS_SUFFIX}");
    let hosts = kube_client::ingress_hosts(ingress_name.as_str(), ca_namespace).await?;
    let ca_url = hosts.first().context(IngressHostAbsent {
        name: ingress_name.clone(),
        namespace: ca_namespace.to_string(),
    })?;

    let profile = connection::connection_profile(config, ca_url.as_str())?;

    kube_client::create_configmap(
        configmap_name,
        namespace,
        BTreeMap::from([(CONNECTION_PROFILE_KEY.to_string(), profile)]),
    )
    .await?;

    info!(configmap.name = %configmap_name, "Created connection ConfigMap");
    Ok(())
}

/// Block until the release's pods reach the expected count with a Ready condition, polling
/// at a fixed delay. The wait is bounded: exceeding the timeout is a distinguished error.
/// A transient list failure during the wait counts as 'not yet ready', not as fatal.
pub(crate) async fn wait_for_release_pods(
    namespace: &str,
    release_name: &str,
    expected: usize,
    timeout: Duration,
) -> Result<()> {
    let label = format!("app={CHART_NAME},release={release_name}");
    wait_until_ready(namespace, label.clone(), expected, timeout, || {
        kube_client::list_pods(namespace.to_string(), Some(label.clone()), None)
    })
    .await
}

/// The poll loop behind wait_for_release_pods, over any pod-listing source.
async fn wait_until_ready<F, Fut>(
    namespace: &str,
    label: String,
    expected: usize,
    timeout: Duration,
    mut poll: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<Pod>>>,
{
    let max_attempts = (timeout.as_secs() / POD_POLL_DELAY.as_secs()).max(1);

    for attempt in 1..=max_attempts {
        match poll().await {
            Ok(pods) if pods.len() == expected && all_pods_are_ready(pods.as_slice()) => {
                info!(%label, "All release Pods are Ready");
                return Ok(());
            }
            Ok(pods) => {
                info!(
                    attempt,
                    max_attempts,
                    pod.count = pods.len(),
                    expected,
                    "Release Pods are not ready yet"
                );
            }
            Err(error) => {
                warn!(%error, attempt, "Failed to list release Pods, treating as not ready");
            }
        }

        // The timeout is declared exhausted right after the final attempt; no delay there.
        if attempt < max_attempts {
            sleep(POD_POLL_DELAY).await;
        }
    }

    PodReadyTimeout {
        label,
        namespace: namespace.to_string(),
        expected,
    }
    .fail()
}

/// Checks if all of the Pods have their Ready condition set to true.
fn all_pods_are_ready(pod_list: &[Pod]) -> bool {
    for pod in pod_list.iter() {
        let is_ready = pod
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .any(|condition| condition.type_ == "Ready" && condition.status == "True")
            })
            .unwrap_or(false);

        if !is_ready {
            warn!(
                "Couldn't verify the ready condition of Pod '{}' in namespace '{}' to be true",
                pod.name_any(),
                pod.namespace().unwrap_or_default()
            );
            return false;
        }
    }
    true
}

/// Connection data of the deployed REST component: the public URI it is exposed on, and
/// the API key the chart generated for it.
#[derive(Debug)]
pub(crate) struct ComposerRestInfo {
    uri: String,
    api_key: String,
}

impl ComposerRestInfo {
    /// This is a getter function for the REST endpoint URI.
    pub(crate) fn uri(&self) -> &str {
        self.uri.as_str()
    }

    /// This is a getter function for the REST API key.
    pub(crate) fn api_key(&self) -> &str {
        self.api_key.as_str()
    }
}

/// Read the deployed REST component's connection data back from the live cluster: its
/// Ingress host and the generated API key held in its Secret.
pub(crate) async fn composer_rest_info(config: &DeployConfig) -> Result<ComposerRestInfo> {
    let namespace = config.peer_namespace()?;
    let rest_name = format!("{}{}", config.release_name(), REST_SECRET_SUFFIX);

    let hosts = kube_client::ingress_hosts(rest_name.as_str(), namespace).await?;
    let host = hosts.first().context(IngressHostAbsent {
        name: rest_name.clone(),
        namespace: namespace.to_string(),
    })?;

    let secret = kube_client::get_secret(rest_name.as_str(), namespace)
        .await?
        .context(SecretNotFound {
            name: rest_name.clone(),
            namespace: namespace.to_string(),
        })?;

    rest_info_from_parts(host.as_str(), &secret, rest_name.as_str(), namespace)
}

/// Assemble the connection data from the REST component's Ingress host and Secret.
fn rest_info_from_parts(
    host: &str,
    secret: &Secret,
    secret_name: &str,
    namespace: &str,
) -> Result<ComposerRestInfo> {
    let value = secret
        .data
        .as_ref()
        .and_then(|data| data.get(REST_API_KEY))
        .context(SecretKeyNotFound {
            key: REST_API_KEY.to_string(),
            name: secret_name.to_string(),
            namespace: namespace.to_string(),
        })?;

    let api_key = String::from_utf8(value.0.clone()).context(SecretValueNotUtf8 {
        key: REST_API_KEY.to_string(),
        name: secret_name.to_string(),
        namespace: namespace.to_string(),
    })?;

    Ok(ComposerRestInfo {
        uri: format!("https://{host}"),
        api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::{all_pods_are_ready, rest_info_from_parts, wait_until_ready};
    use crate::common::error::Error;
    use k8s_openapi::{
        api::core::v1::{Pod, PodCondition, PodStatus, Secret},
        ByteString,
    };
    use std::{collections::BTreeMap, time::Duration};
    use tokio::time::Instant;

    fn pod_with_ready_condition(status: &str) -> Pod {
        Pod {
            status: Some(PodStatus {
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: status.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn ready_pods_are_recognized() {
        let pods = vec![
            pod_with_ready_condition("True"),
            pod_with_ready_condition("True"),
        ];
        assert!(all_pods_are_ready(pods.as_slice()));
    }

    #[test]
    fn one_unready_pod_fails_the_check() {
        let pods = vec![
            pod_with_ready_condition("True"),
            pod_with_ready_condition("False"),
        ];
        assert!(!all_pods_are_ready(pods.as_slice()));
    }

    #[test]
    fn pods_without_status_are_not_ready() {
        let pods = vec![Pod::default()];
        assert!(!all_pods_are_ready(pods.as_slice()));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_wait_times_out_with_no_delay_after_the_final_attempt() {
        let mut polls: u64 = 0;
        let started = Instant::now();

        let error = wait_until_ready(
            "peer-ns",
            "app=hl-composer,release=hlc".to_string(),
            3,
            Duration::from_secs(60),
            || {
                polls += 1;
                async { Ok(Vec::new()) }
            },
        )
        .await
        .expect_err("no pods ever appear");

        assert!(matches!(error, Error::PodReadyTimeout { expected: 3, .. }));
        // 60s of budget over a 15s delay: 4 attempts, 3 delays between them.
        assert_eq!(polls, 4);
        assert_eq!(started.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn readiness_wait_returns_once_pods_are_ready() {
        let mut polls: u64 = 0;

        wait_until_ready(
            "peer-ns",
            "app=hl-composer,release=hlc".to_string(),
            1,
            Duration::from_secs(60),
            || {
                polls += 1;
                let ready = polls >= 2;
                async move {
                    if ready {
                        Ok(vec![pod_with_ready_condition("True")])
                    } else {
                        Ok(Vec::new())
                    }
                }
            },
        )
        .await
        .expect("pods become ready on the second attempt");

        assert_eq!(polls, 2);
    }

    fn rest_secret(data: BTreeMap<String, ByteString>) -> Secret {
        Secret {
            data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn rest_info_carries_the_ingress_host_and_api_key() {
        let secret = rest_secret(BTreeMap::from([(
            "COMPOSER_APIKEY".to_string(),
            ByteString(b"xyz".to_vec()),
        )]));

        let info = rest_info_from_parts(
            "composer.example.com",
            &secret,
            "hlc-hl-composer-rest",
            "peer-ns",
        )
        .expect("the api key is present");

        assert_eq!(info.uri(), "https://composer.example.com");
        assert_eq!(info.api_key(), "xyz");
    }

    #[test]
    fn rest_info_fails_without_the_api_key() {
        let secret = rest_secret(BTreeMap::new());

        let error = rest_info_from_parts(
            "composer.example.com",
            &secret,
            "hlc-hl-composer-rest",
            "peer-ns",
        )
        .expect_err("the api key is absent");

        assert!(matches!(error, Error::SecretKeyNotFound { key, .. } if key == "COMPOSER_APIKEY"));
    }
}
