pub mod behavior;
pub mod client;
pub mod memory;
pub mod relay;
pub mod transport;

pub use client::{GossipRelay, RelayOptions, parse_bootstrap_peers};
pub use memory::MemoryRelay;
pub use relay::{RecordBus, Relay, Subscription};
