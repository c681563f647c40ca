use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::chat::SendState;
use crate::common::{AppEvent, ChatRecord};
use crate::solana::{NftSummary, Portfolio};

const MAX_NOTICES: usize = 50;

pub struct Notice {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Everything the UI draws. Only mutated from events and user input.
pub struct AppState {
    pub identity: Option<String>,
    pub records: Vec<ChatRecord>,
    pub receiver_input: String,
    pub message_input: String,
    pub send_state: SendState,
    pub peers: Vec<String>,
    pub peer_last_seen: HashMap<String, DateTime<Utc>>,
    pub portfolio: Option<Portfolio>,
    pub watchlist: Vec<String>,
    pub watch_input: String,
    pub balances: HashMap<String, f64>,
    pub floor_input: String,
    pub floor: Option<(String, f64)>,
    pub airdrop_input: String,
    pub transfer_to: String,
    pub transfer_amount: String,
    /// Empty means SOL.
    pub transfer_mint: String,
    pub mint_decimals: String,
    pub mint_supply: String,
    pub nfts: Option<Vec<NftSummary>>,
    pub notices: VecDeque<Notice>,
}

impl AppState {
    pub fn new(identity: Option<String>) -> Self {
        Self {
            identity,
            records: Vec::new(),
            receiver_input: String::new(),
            message_input: String::new(),
            send_state: SendState::Idle,
            peers: Vec::new(),
            peer_last_seen: HashMap::new(),
            portfolio: None,
            watchlist: Vec::new(),
            watch_input: String::new(),
            balances: HashMap::new(),
            floor_input: String::new(),
            floor: None,
            airdrop_input: "1".to_string(),
            transfer_to: String::new(),
            transfer_amount: String::new(),
            transfer_mint: String::new(),
            mint_decimals: "9".to_string(),
            mint_supply: String::new(),
            nfts: None,
            notices: VecDeque::new(),
        }
    }

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::RecordAccepted(record) => self.records.push(record),
            AppEvent::SendStateChanged(state) => {
                if matches!(state, SendState::Sent { .. }) {
                    self.message_input.clear();
                }
                self.send_state = state;
            }
            AppEvent::PeerConnected(peer_id) => self.add_peer(peer_id),
            AppEvent::PeerDisconnected(peer_id) => self.remove_peer(&peer_id),
            AppEvent::Portfolio(portfolio) => self.portfolio = Some(portfolio),
            AppEvent::Balance { address, sol } => {
                self.balances.insert(address, sol);
            }
            AppEvent::Watchlist(entries) => {
                self.balances.retain(|address, _| entries.contains(address));
                self.watchlist = entries;
            }
            AppEvent::FloorPrice { symbol, sol } => self.floor = Some((symbol, sol)),
            AppEvent::Nfts(nfts) => self.nfts = Some(nfts),
            AppEvent::Notice(text) => self.push_notice(text),
        }
    }

    pub fn add_peer(&mut self, peer_id: String) {
        self.peer_last_seen.insert(peer_id.clone(), Utc::now());
        if !self.peers.iter().any(|peer| peer == &peer_id) {
            self.peers.push(peer_id);
        }
    }

    pub fn remove_peer(&mut self, peer_id: &str) {
        self.peer_last_seen.insert(peer_id.to_string(), Utc::now());
        self.peers.retain(|peer| peer != peer_id);
    }

    pub fn push_notice(&mut self, text: String) {
        self.notices.push_back(Notice {
            at: Utc::now(),
            text,
        });
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    pub fn is_mine(&self, record: &ChatRecord) -> bool {
        self.identity.as_deref() == Some(record.sender.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::BackupLocator;

    #[test]
    fn sent_clears_compose_box() {
        let mut state = AppState::new(Some("me".into()));
        state.message_input = "gm".into();
        state.apply(AppEvent::SendStateChanged(SendState::Sending));
        assert_eq!(state.message_input, "gm");
        state.apply(AppEvent::SendStateChanged(SendState::Sent {
            locator: BackupLocator {
                hash: "Qm".into(),
                url: "u".into(),
            },
        }));
        assert!(state.message_input.is_empty());
    }

    #[test]
    fn peers_are_unique_and_remembered() {
        let mut state = AppState::new(None);
        state.apply(AppEvent::PeerConnected("p1".into()));
        state.apply(AppEvent::PeerConnected("p1".into()));
        assert_eq!(state.peers.len(), 1);
        state.apply(AppEvent::PeerDisconnected("p1".into()));
        assert!(state.peers.is_empty());
        assert!(state.peer_last_seen.contains_key("p1"));
    }

    #[test]
    fn unwatched_balances_are_forgotten() {
        let mut state = AppState::new(None);
        state.apply(AppEvent::Balance {
            address: "a".into(),
            sol: 1.0,
        });
        state.apply(AppEvent::Watchlist(vec!["b".into()]));
        assert!(state.balances.is_empty());
        assert_eq!(state.watchlist, vec!["b".to_string()]);
    }

    #[test]
    fn notices_are_bounded() {
        let mut state = AppState::new(None);
        for i in 0..(MAX_NOTICES + 5) {
            state.apply(AppEvent::Notice(i.to_string()));
        }
        assert_eq!(state.notices.len(), MAX_NOTICES);
        assert_eq!(state.notices[0].text, "5");
    }

    #[test]
    fn nft_listing_replaces_previous_one() {
        let mut state = AppState::new(Some("me".into()));
        assert!(state.nfts.is_none());
        let nft = NftSummary {
            mint: "m".into(),
            name: "Ape".into(),
            symbol: "APE".into(),
            uri: "https://arweave.net/x".into(),
        };
        state.apply(AppEvent::Nfts(vec![nft.clone(), nft]));
        state.apply(AppEvent::Nfts(Vec::new()));
        assert_eq!(state.nfts.as_deref().map(<[NftSummary]>::len), Some(0));
    }
}
