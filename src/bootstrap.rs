use crate::{
    common::{
        constants::{
            ADMIN_MSP_PATH, FABRIC_NETWORK_ID, PEER_ADMIN_CARD, PEER_ADMIN_ROLES, PEER_ADMIN_USER,
            REMOTE_ARCHIVE_DIR, REMOTE_CARD_DIR, REMOTE_CONNECTION_PROFILE,
        },
        error::{ArchiveListEmpty, Result},
    },
    config::DeployConfig,
};
use archive::NetworkArchive;
use session::{PodSession, RemoteSession};
use snafu::OptionExt;
use tracing::info;

/// Network archive filename parsing.
pub(crate) mod archive;

/// Remote command execution inside a Composer CLI pod.
pub(crate) mod session;

/// Parameters of one identity card: the user it authenticates, the network it is bound to,
/// the MSP path its credentials are read from, and the roles it carries.
pub(crate) struct CardSpec {
    user_name: String,
    network: String,
    msp_path: String,
    roles: Vec<String>,
}

impl CardSpec {
    /// The peer admin card used to administer the Fabric v1 network.
    pub(crate) fn peer_admin() -> Self {
        Self {
            user_name: PEER_ADMIN_USER.to_string(),
            network: FABRIC_NETWORK_ID.to_string(),
            msp_path: ADMIN_MSP_PATH.to_string(),
            roles: PEER_ADMIN_ROLES.iter().map(ToString::to_string).collect(),
        }
    }

    /// The `<user>@<network>` card id.
    fn card_id(&self) -> String {
        format!("{}@{}", self.user_name, self.network)
    }

    /// The card existence probe command.
    fn list_command(&self) -> String {
        format!("composer card list --card {}", self.card_id())
    }

    /// The card creation command.
    fn create_command(&self) -> String {
        let roles: String = self
            .roles
            .iter()
            .map(|role| format!("-r {role} "))
            .collect();

        format!(
            "composer card create -n {network} -p {profile} -u {user} \
             -c {msp}/signcerts/cert.pem -k {msp}/keystore/key.pem \
             {roles}--file {dir}/{id}",
            network = self.network,
            profile = REMOTE_CONNECTION_PROFILE,
            user = self.user_name,
            msp = self.msp_path,
            roles = roles,
            dir = REMOTE_CARD_DIR,
            id = self.card_id(),
        )
    }

    /// The card import command.
    fn import_command(&self) -> String {
        format!(
            "composer card import --file {dir}/{id}.card",
            dir = REMOTE_CARD_DIR,
            id = self.card_id(),
        )
    }
}

/// Identity-card setup: create and import a card unless one already exists. Returns true
/// when the card was created by this call.
pub(crate) fn setup_card<S: RemoteSession>(session: &S, spec: &CardSpec) -> Result<bool> {
    if session.probe(spec.list_command().as_str())?.is_some() {
        info!(card.id = %spec.card_id(), "Identity card already exists, skipping creation");
        return Ok(false);
    }

    session.exec(spec.create_command().as_str())?;
    session.exec(spec.import_command().as_str())?;

    info!(card.id = %spec.card_id(), "Created and imported identity card");
    Ok(true)
}

/// Set up the peer admin identity card inside the release's Composer CLI pod.
pub(crate) async fn setup_admin_card(config: &DeployConfig, namespace: &str) -> Result<()> {
    let session = PodSession::for_release(namespace, config.release_name()).await?;
    setup_card(&session, &CardSpec::peer_admin())?;
    Ok(())
}

/// Install and start the business network, gated on the admin card's existence, and verify
/// the network is reachable. The ping at the end runs regardless of whether this call
/// bootstrapped the network or found it already bootstrapped.
pub(crate) async fn install_network(config: &DeployConfig, namespace: &str) -> Result<()> {
    let session = PodSession::for_release(namespace, config.release_name()).await?;
    bootstrap_network(&session, config)
}

/// The in-pod network bootstrap sequence, over any remote session.
fn bootstrap_network<S: RemoteSession>(session: &S, config: &DeployConfig) -> Result<()> {
    let listing = session.exec(format!("ls {REMOTE_ARCHIVE_DIR}").as_str())?;
    let file_name = listing
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .context(ArchiveListEmpty {
            directory: REMOTE_ARCHIVE_DIR.to_string(),
            pod: session.pod_name().to_string(),
        })?;
    let archive = NetworkArchive::parse(file_name)?;

    let admin = config.org_admin()?;
    let admin_card = format!("{admin}@{}", archive.name());

    if session
        .probe(format!("composer card list --card {admin_card}").as_str())?
        .is_none()
    {
        session.exec(
            format!(
                "composer network install --card {PEER_ADMIN_CARD} \
                 --archiveFile {REMOTE_ARCHIVE_DIR}/{}",
                archive.file_name()
            )
            .as_str(),
        )?;
        session.exec(
            format!(
                "composer network start --card {PEER_ADMIN_CARD} \
                 --networkName {} --networkVersion {} \
                 --networkAdmin {admin} --networkAdminEnrollSecret {}",
                archive.name(),
                archive.version(),
                config.org_admin_secret()?,
            )
            .as_str(),
        )?;
        session.exec(format!("composer card import --file {admin_card}.card").as_str())?;

        info!(
            network.name = %archive.name(),
            network.version = %archive.version(),
            "Installed and started business network"
        );
    } else {
        info!(card.id = %admin_card, "Admin card already exists, network is already bootstrapped");
    }

    session.exec(format!("composer network ping --card {admin_card}").as_str())?;
    info!(network.name = %archive.name(), "Business network is reachable");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{bootstrap_network, setup_card, CardSpec, RemoteSession};
    use crate::{common::error::Result, config::DeployConfig};
    use std::cell::RefCell;

    /// A session that records every issued command. Commands succeed; `ls` of the archive
    /// directory returns one archive; a card list finds its card iff a matching import was
    /// issued earlier.
    #[derive(Default)]
    struct RecordingSession {
        issued: RefCell<Vec<String>>,
    }

    impl RemoteSession for RecordingSession {
        fn pod_name(&self) -> &str {
            "hlc-hl-composer-0"
        }

        fn exec(&self, remote_command: &str) -> Result<String> {
            self.issued.borrow_mut().push(remote_command.to_string());
            if remote_command.starts_with("ls ") {
                return Ok("mynet_1.2.3.bna".to_string());
            }
            Ok(String::new())
        }

        fn probe(&self, remote_command: &str) -> Result<Option<String>> {
            let card_id = remote_command
                .split("--card ")
                .nth(1)
                .unwrap_or_default()
                .trim()
                .to_string();
            let imported = self.issued.borrow().iter().any(|command| {
                command.starts_with("composer card import") && command.contains(card_id.as_str())
            });
            Ok(imported.then_some(card_id))
        }
    }

    fn config() -> DeployConfig {
        serde_yaml::from_str(
            r#"
core:
  chart_repo: aidtech
  dir_values: /var/deploy/values
composer:
  name: hlc
  secret_bna: bna-secret
  secret_connection: hlc-connection
  bna_file: /var/deploy/networks/mynet_1.2.3.bna
peers:
  msp: PeerMSP
  channel_name: mychannel
  hosts: [peer0.example.com]
orderers:
  hosts: [orderer0.example.com]
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
"#,
        )
        .expect("deploy config yaml must parse")
    }

    #[test]
    fn card_setup_creates_and_imports_exactly_once() {
        let session = RecordingSession::default();
        let spec = CardSpec::peer_admin();

        assert!(setup_card(&session, &spec).expect("first call creates the card"));
        assert!(!setup_card(&session, &spec).expect("second call finds the card"));

        let issued = session.issued.borrow();
        let count = |prefix: &str| issued.iter().filter(|c| c.starts_with(prefix)).count();
        assert_eq!(count("composer card create"), 1);
        assert_eq!(count("composer card import"), 1);
    }

    #[test]
    fn existing_card_issues_no_commands() {
        let session = RecordingSession::default();
        session
            .issued
            .borrow_mut()
            .push("composer card import --file /home/composer/PeerAdmin@hlfv1.card".to_string());

        let created =
            setup_card(&session, &CardSpec::peer_admin()).expect("existing card is a no-op");

        assert!(!created);
        assert_eq!(session.issued.borrow().len(), 1);
    }

    #[test]
    fn network_bootstrap_runs_once_and_always_pings() {
        let session = RecordingSession::default();
        let config = config();

        bootstrap_network(&session, &config).expect("first bootstrap");
        bootstrap_network(&session, &config).expect("second bootstrap");

        let issued = session.issued.borrow();
        let count = |prefix: &str| issued.iter().filter(|c| c.starts_with(prefix)).count();
        assert_eq!(count("composer network install"), 1);
        assert_eq!(count("composer network start"), 1);
        assert_eq!(count("composer card import"), 1);
        assert_eq!(count("composer network ping --card admin@mynet"), 2);
    }

    #[test]
    fn peer_admin_card_id_is_bound_to_the_fabric_network() {
        assert_eq!(CardSpec::peer_admin().card_id(), "PeerAdmin@hlfv1");
    }

    #[test]
    fn create_command_carries_credentials_and_roles() {
        let command = CardSpec::peer_admin().create_command();

        assert!(command.starts_with("composer card create -n hlfv1 "));
        assert!(command.contains("-p /hl_config/hlc-connection/connection.json"));
        assert!(command.contains("-u PeerAdmin"));
        assert!(command.contains("-c /hl_config/admin/signcerts/cert.pem"));
        assert!(command.contains("-k /hl_config/admin/keystore/key.pem"));
        assert!(command.contains("-r PeerAdmin -r ChannelAdmin "));
        assert!(command.ends_with("--file /home/composer/PeerAdmin@hlfv1"));
    }

    #[test]
    fn import_command_points_at_the_card_file() {
        assert_eq!(
            CardSpec::peer_admin().import_command(),
            "composer card import --file /home/composer/PeerAdmin@hlfv1.card"
        );
    }

    #[test]
    fn list_command_probes_the_card_id() {
        assert_eq!(
            CardSpec::peer_admin().list_command(),
            "composer card list --card PeerAdmin@hlfv1"
        );
    }
}
