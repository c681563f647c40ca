use libp2p::core::muxing::StreamMuxerBox;
use libp2p::core::transport::Boxed;
use libp2p::core::upgrade::Version;
use libp2p::{PeerId, Transport, dns, identity, noise, tcp, yamux};

use super::behavior::setup_error;
use crate::error::Result;

/// TCP with DNS resolution, so bootstrap nodes may be given as `/dns4/...`.
pub fn build_transport(local_key: &identity::Keypair) -> Result<Boxed<(PeerId, StreamMuxerBox)>> {
    let noise_config = noise::Config::new(local_key).map_err(setup_error("noise handshake"))?;
    let tcp = tcp::tokio::Transport::new(tcp::Config::default().nodelay(true));

    Ok(dns::tokio::Transport::system(tcp)
        .map_err(setup_error("system DNS resolver"))?
        .upgrade(Version::V1)
        .authenticate(noise_config)
        .multiplex(yamux::Config::default())
        .boxed())
}
