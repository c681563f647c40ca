use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use libp2p::gossipsub::{self, IdentTopic};
use libp2p::swarm::NetworkBehaviour;
use libp2p::{PeerId, identify, identity, mdns};

use crate::error::{Error, Result};

const PROTOCOL_VERSION: &str = "solchat/1.0.0";

pub(crate) fn setup_error<E: Display>(stage: &'static str) -> impl FnOnce(E) -> Error {
    move |err| Error::Relay(format!("{stage}: {err}"))
}

#[derive(NetworkBehaviour)]
pub struct RelayBehavior {
    pub gossipsub: gossipsub::Behaviour,
    pub mdns: mdns::tokio::Behaviour,
    pub identify: identify::Behaviour,
}

pub fn build_behavior(
    local_key: &identity::Keypair,
    local_peer_id: PeerId,
    topic_name: &str,
) -> Result<(RelayBehavior, IdentTopic)> {
    // Identical payloads share an id, so a republished record is not re-gossiped.
    let message_id_fn = |message: &gossipsub::Message| {
        let mut hasher = DefaultHasher::new();
        message.data.hash(&mut hasher);
        gossipsub::MessageId::from(hasher.finish().to_string())
    };

    let gossipsub_config = gossipsub::ConfigBuilder::default()
        .heartbeat_interval(Duration::from_secs(10))
        .validation_mode(gossipsub::ValidationMode::Strict)
        .message_id_fn(message_id_fn)
        .build()
        .map_err(setup_error("gossipsub config"))?;

    let mut gossipsub = gossipsub::Behaviour::new(
        gossipsub::MessageAuthenticity::Signed(local_key.clone()),
        gossipsub_config,
    )
    .map_err(setup_error("gossipsub"))?;

    let topic = gossipsub::IdentTopic::new(topic_name);
    gossipsub
        .subscribe(&topic)
        .map_err(setup_error("topic subscription"))?;

    let mdns = mdns::tokio::Behaviour::new(mdns::Config::default(), local_peer_id)
        .map_err(setup_error("mDNS"))?;

    let identify = identify::Behaviour::new(identify::Config::new(
        PROTOCOL_VERSION.to_string(),
        local_key.public(),
    ));

    Ok((
        RelayBehavior {
            gossipsub,
            mdns,
            identify,
        },
        topic,
    ))
}
