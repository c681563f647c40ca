use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;
use libp2p::gossipsub::{self, IdentTopic};
use libp2p::multiaddr::Protocol;
use libp2p::swarm::{Config as SwarmConfig, SwarmEvent};
use libp2p::{Multiaddr, PeerId, Swarm, identify, identity, mdns};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::{AppEvent, ChatRecord};
use crate::error::{Error, Result};
use crate::identity::{SignatureCheck, check_signature};
use crate::storage::RelayLog;

use super::behavior::{RelayBehavior, RelayBehaviorEvent, build_behavior};
use super::relay::{RecordBus, Relay, Subscription};
use super::transport::build_transport;

const COMMAND_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub topic: String,
    pub listen_addr: String,
    pub bootstrap_peers: Vec<(PeerId, Multiaddr)>,
    /// Where to persist the replay log; `None` keeps it in memory.
    pub log_path: Option<PathBuf>,
}

enum RelayCommand {
    Publish(ChatRecord),
    Shutdown,
}

/// Handle to a gossipsub relay client running on its own task.
///
/// Dropping the handle aborts the task; [`GossipRelay::shutdown`] stops it cleanly.
pub struct GossipRelay {
    commands: mpsc::Sender<RelayCommand>,
    bus: RecordBus,
    local_peer_id: PeerId,
    task: Option<JoinHandle<()>>,
}

impl GossipRelay {
    /// Build the swarm and start it. Must be called from within a tokio runtime.
    pub fn spawn(
        options: RelayOptions,
        local_key: identity::Keypair,
        peer_events: Option<mpsc::Sender<AppEvent>>,
    ) -> Result<Self> {
        let log = match &options.log_path {
            Some(path) => RelayLog::open(path)?,
            None => RelayLog::in_memory()?,
        };
        let history = log.records()?;
        log::info!("Relay log holds {} records", history.len());
        let bus = RecordBus::with_history(history);

        let local_peer_id = PeerId::from(local_key.public());
        log::info!("Local PeerID: {local_peer_id}");

        let (swarm, topic) = build_swarm(&local_key, local_peer_id, &options)?;
        let (command_sender, command_receiver) = mpsc::channel(COMMAND_CAPACITY);

        let node = RelayNode {
            topic,
            command_receiver,
            bus: bus.clone(),
            log,
            peer_events,
        };
        let task = tokio::spawn(node.run(swarm, options.bootstrap_peers));

        Ok(Self {
            commands: command_sender,
            bus,
            local_peer_id,
            task: Some(task),
        })
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    pub async fn shutdown(mut self) {
        if self.commands.send(RelayCommand::Shutdown).await.is_err() {
            log::debug!("Relay task already stopped");
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::warn!("Relay task ended abnormally: {err}");
            }
        }
    }
}

impl Relay for GossipRelay {
    fn publish(&self, record: ChatRecord) -> Result<()> {
        self.commands
            .try_send(RelayCommand::Publish(record))
            .map_err(|err| Error::Relay(format!("relay client rejected record: {err}")))
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }
}

impl Drop for GossipRelay {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn build_swarm(
    local_key: &identity::Keypair,
    local_peer_id: PeerId,
    options: &RelayOptions,
) -> Result<(Swarm<RelayBehavior>, IdentTopic)> {
    let transport = build_transport(local_key)?;
    let (behavior, topic) = build_behavior(local_key, local_peer_id, &options.topic)?;

    let mut swarm = Swarm::new(
        transport,
        behavior,
        local_peer_id,
        SwarmConfig::with_tokio_executor().with_idle_connection_timeout(Duration::from_secs(60)),
    );

    let listen: Multiaddr = options
        .listen_addr
        .parse()
        .map_err(|err| Error::Config(format!("invalid listen address: {err}")))?;
    swarm
        .listen_on(listen)
        .map_err(|err| Error::Relay(format!("cannot listen: {err}")))?;

    Ok((swarm, topic))
}

/// Owns the swarm side of a [`GossipRelay`].
struct RelayNode {
    topic: IdentTopic,
    command_receiver: mpsc::Receiver<RelayCommand>,
    bus: RecordBus,
    log: RelayLog,
    peer_events: Option<mpsc::Sender<AppEvent>>,
}

impl RelayNode {
    async fn run(
        mut self,
        mut swarm: Swarm<RelayBehavior>,
        bootstrap_peers: Vec<(PeerId, Multiaddr)>,
    ) {
        if bootstrap_peers.is_empty() {
            log::warn!("No bootstrap peers configured; relying on mDNS for LAN peers");
        }
        for (peer_id, addr) in bootstrap_peers {
            log::info!("Dialing bootstrap peer {peer_id} at {addr}");
            swarm.behaviour_mut().gossipsub.add_explicit_peer(&peer_id);
            if let Err(err) = swarm.dial(addr) {
                log::warn!("Failed to dial bootstrap peer {peer_id}: {err}");
            }
        }

        log::info!("Relay event loop started on topic {}", self.topic);

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(RelayCommand::Publish(record)) => self.publish(record, &mut swarm),
                        Some(RelayCommand::Shutdown) | None => break,
                    }
                }
                event = swarm.select_next_some() => {
                    self.handle_swarm_event(event, &mut swarm);
                }
            }
        }

        log::info!("Relay event loop stopped");
    }

    fn publish(&mut self, record: ChatRecord, swarm: &mut Swarm<RelayBehavior>) {
        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(err) => {
                log::warn!("Failed to serialize record {}: {err}", record.id);
                return;
            }
        };

        match swarm
            .behaviour_mut()
            .gossipsub
            .publish(self.topic.clone(), payload)
        {
            // Gossipsub never hands a publisher its own message back.
            Ok(_) => self.observe(record),
            Err(err) => log::warn!("Publish error for record {}: {err:?}", record.id),
        }
    }

    /// Log a record and fan it out unless the log already had it.
    ///
    /// Records with a bad signature are dropped before they can claim a
    /// `(sender, timestamp)` slot. A validly signed record takes over a slot held
    /// by an unsigned one.
    fn observe(&mut self, record: ChatRecord) {
        let verified = match check_signature(&record) {
            SignatureCheck::Valid => true,
            SignatureCheck::Missing => false,
            SignatureCheck::Invalid => {
                log::debug!("Dropping relay record {} with a bad signature", record.id);
                return;
            }
        };
        match self.log.append(&record, verified) {
            Ok(true) => self.bus.deliver(record),
            Ok(false) => log::debug!("Relay replayed record {}", record.id),
            Err(err) => {
                log::warn!("Failed to persist relay record {}: {err}", record.id);
                self.bus.deliver(record);
            }
        }
    }

    fn handle_swarm_event(
        &mut self,
        event: SwarmEvent<RelayBehaviorEvent>,
        swarm: &mut Swarm<RelayBehavior>,
    ) {
        match event {
            SwarmEvent::Behaviour(RelayBehaviorEvent::Gossipsub(gossipsub::Event::Message {
                message,
                ..
            })) => match serde_json::from_slice::<ChatRecord>(&message.data) {
                Ok(record) => self.observe(record),
                Err(err) => log::debug!("Ignoring undecodable relay payload: {err}"),
            },
            SwarmEvent::Behaviour(RelayBehaviorEvent::Mdns(mdns::Event::Discovered(list))) => {
                for (peer_id, _) in list {
                    swarm.behaviour_mut().gossipsub.add_explicit_peer(&peer_id);
                }
            }
            SwarmEvent::Behaviour(RelayBehaviorEvent::Mdns(mdns::Event::Expired(list))) => {
                for (peer_id, _) in list {
                    swarm
                        .behaviour_mut()
                        .gossipsub
                        .remove_explicit_peer(&peer_id);
                }
            }
            SwarmEvent::Behaviour(RelayBehaviorEvent::Identify(identify::Event::Received {
                peer_id,
                info,
                ..
            })) => {
                log::debug!("Identify from {peer_id}: {}", info.protocol_version);
            }
            SwarmEvent::NewListenAddr { address, .. } => {
                log::info!("Listening on {address}");
            }
            SwarmEvent::ConnectionEstablished { peer_id, .. } => {
                self.notify(AppEvent::PeerConnected(peer_id.to_string()));
            }
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                self.notify(AppEvent::PeerDisconnected(peer_id.to_string()));
            }
            _ => {}
        }
    }

    /// Never waits on the UI; a full event queue drops the notification.
    fn notify(&mut self, event: AppEvent) {
        if let Some(sender) = &self.peer_events {
            match sender.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(event)) => {
                    log::warn!("UI event queue full, dropping {event:?}");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => log::debug!("Peer event dropped: UI gone"),
            }
        }
    }
}

/// Parse `/.../p2p/<PeerId>` multiaddrs, skipping and logging bad entries.
pub fn parse_bootstrap_peers(entries: &[String]) -> Vec<(PeerId, Multiaddr)> {
    entries
        .iter()
        .filter_map(|entry| {
            let mut addr: Multiaddr = match entry.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    log::warn!("Invalid multiaddr `{entry}`: {err}");
                    return None;
                }
            };

            let peer_id = match addr.pop() {
                Some(Protocol::P2p(peer)) => peer,
                _ => {
                    log::warn!("Multiaddr `{entry}` missing /p2p/PeerId suffix");
                    return None;
                }
            };

            Some((peer_id, addr))
        })
        .collect()
}
