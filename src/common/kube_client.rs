use crate::common::{
    constants::KUBE_API_PAGE_SIZE,
    error::{
        CreateConfigMap, CreateSecret, GetConfigMap, GetIngress, GetSecret, K8sClientGeneration,
        ListPodsWithLabelAndField, Result,
    },
};
use k8s_openapi::{
    api::{
        core::v1::{ConfigMap, Pod, Secret},
        networking::v1::Ingress,
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
    ByteString,
};
use kube::{
    api::{Api, ListParams, PostParams},
    Client,
};
use snafu::ResultExt;
use std::collections::BTreeMap;

/// Generate a new kube::Client.
pub(crate) async fn client() -> Result<Client> {
    Client::try_default().await.context(K8sClientGeneration)
}

/// Generate the Pod api client.
pub(crate) async fn pods_api(namespace: &str) -> Result<Api<Pod>> {
    Ok(Api::namespaced(client().await?, namespace))
}

/// Generate the Secret api client.
pub(crate) async fn secrets_api(namespace: &str) -> Result<Api<Secret>> {
    Ok(Api::namespaced(client().await?, namespace))
}

/// Generate the Configmap api client.
pub(crate) async fn configmaps_api(namespace: &str) -> Result<Api<ConfigMap>> {
    Ok(Api::namespaced(client().await?, namespace))
}

/// Generate the Ingress api client.
pub(crate) async fn ingresses_api(namespace: &str) -> Result<Api<Ingress>> {
    Ok(Api::namespaced(client().await?, namespace))
}

/// This returns true if a kube API error is a 'NotFound' response.
fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

/// List Pods in a Kubernetes namespace, optionally filtered by label and field selectors.
pub(crate) async fn list_pods(
    namespace: String,
    label_selector: Option<String>,
    field_selector: Option<String>,
) -> Result<Vec<Pod>> {
    let mut pods: Vec<Pod> = Vec::with_capacity(KUBE_API_PAGE_SIZE as usize);

    let mut list_params = ListParams::default().limit(KUBE_API_PAGE_SIZE);
    if let Some(ref labels) = label_selector {
        list_params = list_params.labels(labels);
    }
    if let Some(ref fields) = field_selector {
        list_params = list_params.fields(fields);
    }

    let pods_api = pods_api(namespace.as_str()).await?;

    let list_pods_error_ctx = ListPodsWithLabelAndField {
        label: label_selector.unwrap_or_default(),
        field: field_selector.unwrap_or_default(),
        namespace: namespace.clone(),
    };

    loop {
        let pod_list = pods_api
            .list(&list_params)
            .await
            .context(list_pods_error_ctx.clone())?;

        let maybe_token = pod_list.metadata.continue_.clone();

        pods.extend(pod_list);

        match maybe_token {
            Some(ref token) => {
                list_params = list_params.continue_token(token);
            }
            None => break,
        }
    }

    Ok(pods)
}

/// GET a Secret by name. Absence is an expected condition: a 'NotFound' response maps to None.
pub(crate) async fn get_secret(name: &str, namespace: &str) -> Result<Option<Secret>> {
    match secrets_api(namespace).await?.get(name).await {
        Ok(secret) => Ok(Some(secret)),
        Err(ref error) if is_not_found(error) => Ok(None),
        Err(error) => Err(error).context(GetSecret {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }),
    }
}

/// GET a ConfigMap by name. Absence is an expected condition: a 'NotFound' response maps to None.
pub(crate) async fn get_configmap(name: &str, namespace: &str) -> Result<Option<ConfigMap>> {
    match configmaps_api(namespace).await?.get(name).await {
        Ok(configmap) => Ok(Some(configmap)),
        Err(ref error) if is_not_found(error) => Ok(None),
        Err(error) => Err(error).context(GetConfigMap {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }),
    }
}

/// CREATE a Secret with the given data.
pub(crate) async fn create_secret(
    name: &str,
    namespace: &str,
    data: BTreeMap<String, ByteString>,
) -> Result<()> {
    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };

    secrets_api(namespace)
        .await?
        .create(&PostParams::default(), &secret)
        .await
        .context(CreateSecret {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })?;

    Ok(())
}

/// CREATE a ConfigMap with the given data.
pub(crate) async fn create_configmap(
    name: &str,
    namespace: &str,
    data: BTreeMap<String, String>,
) -> Result<()> {
    let configmap = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };

    configmaps_api(namespace)
        .await?
        .create(&PostParams::default(), &configmap)
        .await
        .context(CreateConfigMap {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })?;

    Ok(())
}

/// GET the hosts exposed by an Ingress.
pub(crate) async fn ingress_hosts(name: &str, namespace: &str) -> Result<Vec<String>> {
    let ingress = ingresses_api(namespace)
        .await?
        .get(name)
        .await
        .context(GetIngress {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })?;

    Ok(ingress
        .spec
        .and_then(|spec| spec.rules)
        .map(|rules| rules.into_iter().filter_map(|rule| rule.host).collect())
        .unwrap_or_default())
}
