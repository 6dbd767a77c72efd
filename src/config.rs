use crate::common::{
    constants::CHART_NAME,
    error::{CaNotDefined, MspNotDefined, ReadingFile, Result, YamlParseFromFile},
};
use serde::Deserialize;
use snafu::{ensure, OptionExt, ResultExt};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

/// This is the deployment topology for one Composer installation, deserialized from a YAML
/// file. Cross-references between sections (the peer MSP, and the CA it names) are validated
/// when the file is loaded, so that a broken config fails early instead of deep inside the
/// deploy sequence.
#[derive(Debug, Deserialize)]
pub(crate) struct DeployConfig {
    core: CoreConfig,
    composer: ComposerConfig,
    peers: PeersConfig,
    #[serde(default)]
    orderers: OrderersConfig,
    msps: HashMap<String, MspConfig>,
    cas: HashMap<String, CaConfig>,
    #[serde(default)]
    versions: HashMap<String, String>,
}

/// Chart repository and values-file directory.
#[derive(Debug, Deserialize)]
struct CoreConfig {
    chart_repo: String,
    dir_values: PathBuf,
}

/// The Composer release itself: its name, the cluster resources it needs prepared, and the
/// local network archive used to seed the archive Secret.
#[derive(Debug, Deserialize)]
struct ComposerConfig {
    name: String,
    secret_bna: String,
    secret_connection: String,
    bna_file: PathBuf,
}

/// The peer organization the release is deployed next to.
#[derive(Debug, Deserialize)]
struct PeersConfig {
    msp: String,
    channel_name: String,
    #[serde(default)]
    hosts: Vec<String>,
}

/// Orderer hosts referenced by the connection profile.
#[derive(Debug, Default, Deserialize)]
struct OrderersConfig {
    #[serde(default)]
    hosts: Vec<String>,
}

/// One membership service provider: the namespace it lives in, the CA it uses and its
/// network admin credentials.
#[derive(Debug, Deserialize)]
struct MspConfig {
    ca: String,
    namespace: String,
    org_admin: String,
    org_adminpw: String,
}

/// One certificate authority.
#[derive(Debug, Deserialize)]
struct CaConfig {
    namespace: String,
}

impl DeployConfig {
    /// Load and validate a deployment config from a YAML file.
    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read(path).context(ReadingFile {
            filepath: path.to_path_buf(),
        })?;

        let config: DeployConfig = serde_yaml::from_slice(contents.as_slice())
            .context(YamlParseFromFile {
                filepath: path.to_path_buf(),
            })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate cross-references between config sections.
    fn validate(&self) -> Result<()> {
        let msp = self.peer_msp()?;
        ensure!(
            self.cas.contains_key(msp.ca.as_str()),
            CaNotDefined {
                ca: msp.ca.clone(),
                msp: self.peers.msp.clone(),
            }
        );
        Ok(())
    }

    /// The MSP definition of the peer organization.
    fn peer_msp(&self) -> Result<&MspConfig> {
        self.msps.get(self.peers.msp.as_str()).context(MspNotDefined {
            msp: self.peers.msp.clone(),
        })
    }

    /// The namespace the release and its resources are deployed into.
    pub(crate) fn peer_namespace(&self) -> Result<&str> {
        Ok(self.peer_msp()?.namespace.as_str())
    }

    /// The MSP id of the peer organization.
    pub(crate) fn peer_msp_id(&self) -> &str {
        self.peers.msp.as_str()
    }

    /// The name of the CA used by the peer organization.
    pub(crate) fn ca_name(&self) -> Result<&str> {
        Ok(self.peer_msp()?.ca.as_str())
    }

    /// The namespace the CA lives in.
    pub(crate) fn ca_namespace(&self) -> Result<&str> {
        let ca = self.ca_name()?;
        self.cas
            .get(ca)
            .map(|ca_config| ca_config.namespace.as_str())
            .context(CaNotDefined {
                ca: ca.to_string(),
                msp: self.peers.msp.clone(),
            })
    }

    /// The network admin user of the peer organization.
    pub(crate) fn org_admin(&self) -> Result<&str> {
        Ok(self.peer_msp()?.org_admin.as_str())
    }

    /// The network admin enroll secret of the peer organization.
    pub(crate) fn org_admin_secret(&self) -> Result<&str> {
        Ok(self.peer_msp()?.org_adminpw.as_str())
    }

    /// The Helm release name of the Composer deployment.
    pub(crate) fn release_name(&self) -> &str {
        self.composer.name.as_str()
    }

    /// The Helm chart repository to install from.
    pub(crate) fn chart_repo(&self) -> &str {
        self.core.chart_repo.as_str()
    }

    /// The name of the Secret holding the deployable network archive.
    pub(crate) fn secret_bna(&self) -> &str {
        self.composer.secret_bna.as_str()
    }

    /// The name of the ConfigMap holding the connection profile.
    pub(crate) fn secret_connection(&self) -> &str {
        self.composer.secret_connection.as_str()
    }

    /// The local file path of the deployable network archive.
    pub(crate) fn bna_file(&self) -> &Path {
        self.composer.bna_file.as_path()
    }

    /// The channel the business network runs on.
    pub(crate) fn channel_name(&self) -> &str {
        self.peers.channel_name.as_str()
    }

    /// Peer hosts referenced by the connection profile.
    pub(crate) fn peer_hosts(&self) -> &[String] {
        self.peers.hosts.as_slice()
    }

    /// Orderer hosts referenced by the connection profile.
    pub(crate) fn orderer_hosts(&self) -> &[String] {
        self.orderers.hosts.as_slice()
    }

    /// The pinned version of a chart, if one is configured.
    pub(crate) fn chart_version(&self, chart: &str) -> Option<&str> {
        self.versions.get(chart).map(String::as_str)
    }

    /// The values-file path for the Composer release, following the
    /// `<dir_values>/hl-composer/<release>.yaml` convention.
    pub(crate) fn values_file(&self) -> PathBuf {
        self.core
            .dir_values
            .join(CHART_NAME)
            .join(format!("{}.yaml", self.composer.name))
    }
}

#[cfg(test)]
mod tests {
    use super::DeployConfig;
    use crate::common::error::Error;
    use std::path::PathBuf;

    fn parse(yaml: &str) -> DeployConfig {
        serde_yaml::from_str(yaml).expect("config yaml must parse")
    }

    const CONFIG_YAML: &str = r#"
core:
  chart_repo: aidtech
  dir_values: /var/deploy/values
composer:
  name: hlc
  secret_bna: bna-secret
  secret_connection: hlc-connection
  bna_file: /var/deploy/networks/mynet_0.1.0.bna
peers:
  msp: PeerMSP
  channel_name: mychannel
  hosts:
    - peer0.example.com
orderers:
  hosts:
    - orderer0.example.com
msps:
  PeerMSP:
    ca: peer-ca
    namespace: peer-ns
    org_admin: admin
    org_adminpw: adminpw
cas:
  peer-ca:
    namespace: ca-ns
versions:
  hl-composer: 0.2.6
"#;

    #[test]
    fn resolves_namespaces_and_versions() {
        let config = parse(CONFIG_YAML);
        config.validate().expect("config must validate");

        assert_eq!(config.peer_namespace().unwrap(), "peer-ns");
        assert_eq!(config.ca_namespace().unwrap(), "ca-ns");
        assert_eq!(config.ca_name().unwrap(), "peer-ca");
        assert_eq!(config.chart_version("hl-composer"), Some("0.2.6"));
        assert_eq!(config.chart_version("hlf-peer"), None);
        assert_eq!(config.org_admin().unwrap(), "admin");
    }

    #[test]
    fn values_file_follows_release_name() {
        let config = parse(CONFIG_YAML);
        assert_eq!(
            config.values_file(),
            PathBuf::from("/var/deploy/values/hl-composer/hlc.yaml")
        );
    }

    #[test]
    fn undefined_peer_msp_is_an_error() {
        let mut config = parse(CONFIG_YAML);
        config.peers.msp = "GhostMSP".to_string();

        let error = config.validate().expect_err("validation must fail");
        assert!(matches!(error, Error::MspNotDefined { msp } if msp == "GhostMSP"));
    }

    #[test]
    fn undefined_ca_is_an_error() {
        let mut config = parse(CONFIG_YAML);
        config
            .msps
            .get_mut("PeerMSP")
            .expect("PeerMSP must be defined")
            .ca = "ghost-ca".to_string();

        let error = config.validate().expect_err("validation must fail");
        assert!(matches!(error, Error::CaNotDefined { ca, .. } if ca == "ghost-ca"));
    }
}
