pub mod chat;
pub mod clock;
pub mod common;
pub mod config;
pub mod error;
pub mod identity;
pub mod network;
pub mod poller;
pub mod solana;
pub mod storage;
pub mod ui;
pub mod watchlist;

pub use error::{Error, Result};
