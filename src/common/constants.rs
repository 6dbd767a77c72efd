use std::time::Duration;

/// This is the name of the Helm chart which deploys Hyperledger Composer.
pub(crate) const CHART_NAME: &str = "hl-composer";

/// This is the name suffix of the Secret managed by the chart's REST component. It holds the
/// generated API key which must be preserved across upgrades.
pub(crate) const REST_SECRET_SUFFIX: &str = "-hl-composer-rest";

/// This is the data key of the REST API key inside the REST component's Secret.
pub(crate) const REST_API_KEY: &str = "COMPOSER_APIKEY";

/// This is the chart values path which the preserved REST API key is re-injected into.
pub(crate) const REST_API_KEY_VALUES_PATH: &str = "rest.config.apiKey";

/// This is the data key of the connection profile inside the connection ConfigMap.
pub(crate) const CONNECTION_PROFILE_KEY: &str = "connection.json";

/// This is the name suffix of the certificate authority's Ingress.
pub(crate) const CA_INGRESS_SUFFIX: &str = "-hlf-ca";

/// This is the path of the connection profile as mounted inside the Composer CLI pod.
pub(crate) const REMOTE_CONNECTION_PROFILE: &str = "/hl_config/hlc-connection/connection.json";

/// This is the directory holding the deployable network archive inside the Composer CLI pod.
pub(crate) const REMOTE_ARCHIVE_DIR: &str = "/hl_config/blockchain_network";

/// This is the directory where identity card files are written inside the Composer CLI pod.
pub(crate) const REMOTE_CARD_DIR: &str = "/home/composer";

/// This is the path of the admin MSP as mounted inside the Composer CLI pod.
pub(crate) const ADMIN_MSP_PATH: &str = "/hl_config/admin";

/// This is the user name of the peer admin identity card.
pub(crate) const PEER_ADMIN_USER: &str = "PeerAdmin";

/// These are the roles assigned to the peer admin identity card.
pub(crate) const PEER_ADMIN_ROLES: [&str; 2] = ["PeerAdmin", "ChannelAdmin"];

/// This is the Fabric v1 network id which the peer admin card is bound to.
pub(crate) const FABRIC_NETWORK_ID: &str = "hlfv1";

/// This is the full card id of the peer admin identity card.
pub(crate) const PEER_ADMIN_CARD: &str = "PeerAdmin@hlfv1";

/// This is the number of pods the Composer chart is expected to run once deployed.
pub(crate) const COMPOSER_POD_COUNT: usize = 3;

/// This is the delay between two attempts of the pod readiness poll.
pub(crate) const POD_POLL_DELAY: Duration = Duration::from_secs(15);

/// This is the limit for the number of objects returned by a paginated Kubernetes LIST request.
pub(crate) const KUBE_API_PAGE_SIZE: u32 = 500;
