pub mod address;
pub mod floor;
pub mod instructions;
pub mod nft;
pub mod portfolio;
pub mod price;
pub mod pubkey;
pub mod rpc;
pub mod service;
pub mod transaction;
pub mod transfer;

pub use address::{
    explorer_url, lamports_to_sol, parse_address, sol_to_lamports, to_base_units,
};
pub use floor::FloorClient;
pub use nft::{NftSummary, load_nfts};
pub use portfolio::{Portfolio, TokenHolding, load_portfolio};
pub use price::{PriceClient, format_usd};
pub use pubkey::Pubkey;
pub use rpc::{RpcClient, TokenBalance};
pub use service::{RefreshIntervals, SolanaClients, WalletService};
pub use transfer::{CreatedToken, create_token, send_sol, send_token};
