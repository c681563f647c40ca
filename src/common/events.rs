use crate::chat::SendState;
use crate::common::types::ChatRecord;
use crate::solana::{NftSummary, Portfolio};

/// Events pushed from the async services up to the UI.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A record passed the filter and was appended to the history.
    RecordAccepted(ChatRecord),
    SendStateChanged(SendState),
    PeerConnected(String),
    PeerDisconnected(String),
    Portfolio(Portfolio),
    Balance { address: String, sol: f64 },
    Watchlist(Vec<String>),
    FloorPrice { symbol: String, sol: f64 },
    Nfts(Vec<NftSummary>),
    /// Something the user should see once, e.g. an error or a confirmation.
    Notice(String),
}
