use crate::{
    common::error::{Result, SerializeConnectionProfile},
    config::DeployConfig,
};
use serde_json::{json, Map, Value};
use snafu::ResultExt;

/// Builds the Composer v1 connection profile which is stored in the connection ConfigMap.
/// The profile wires the channel, the peer org's MSP, its peers and orderers, and the CA
/// reached through its Ingress host.
pub(crate) fn connection_profile(config: &DeployConfig, ca_url: &str) -> Result<String> {
    let msp_id = config.peer_msp_id();
    let ca_name = config.ca_name()?;
    let channel = config.channel_name();

    let peers: Map<String, Value> = config
        .peer_hosts()
        .iter()
        .map(|host| {
            (
                host.clone(),
                json!({ "url": format!("grpcs://{host}:7051") }),
            )
        })
        .collect();

    let orderers: Map<String, Value> = config
        .orderer_hosts()
        .iter()
        .map(|host| {
            (
                host.clone(),
                json!({ "url": format!("grpcs://{host}:7050") }),
            )
        })
        .collect();

    let channel_peers: Map<String, Value> = config
        .peer_hosts()
        .iter()
        .map(|host| {
            (
                host.clone(),
                json!({
                    "endorsingPeer": true,
                    "chaincodeQuery": true,
                    "ledgerQuery": true,
                    "eventSource": true,
                }),
            )
        })
        .collect();

    let profile = json!({
        "name": format!("{}-network", config.release_name()),
        "x-type": "hlfv1",
        "version": "1.0.0",
        "client": {
            "organization": msp_id,
            "connection": {
                "timeout": {
                    "peer": { "endorser": "300", "eventHub": "300", "eventReg": "300" },
                    "orderer": "300",
                },
            },
        },
        "channels": {
            channel: {
                "orderers": config.orderer_hosts(),
                "peers": channel_peers,
            },
        },
        "organizations": {
            msp_id: {
                "mspid": msp_id,
                "peers": config.peer_hosts(),
                "certificateAuthorities": [ca_name],
            },
        },
        "orderers": orderers,
        "peers": peers,
        "certificateAuthorities": {
            ca_name: {
                "url": format!("https://{ca_url}:443"),
                "caName": ca_name,
            },
        },
    });

    serde_json::to_string_pretty(&profile).context(SerializeConnectionProfile)
}
