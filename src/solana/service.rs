use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::address::{lamports_to_sol, parse_address, sol_to_lamports, to_base_units};
use super::floor::{FloorClient, validate_symbol};
use super::nft::load_nfts;
use super::portfolio::load_portfolio;
use super::price::PriceClient;
use super::pubkey::Pubkey;
use super::rpc::RpcClient;
use super::transfer::{MAX_DECIMALS, check_recipient, create_token, send_sol, send_token};
use crate::common::{AppEvent, WalletCommand};
use crate::error::{Error, Result};
use crate::identity::WalletIdentity;
use crate::poller::RefreshTask;
use crate::watchlist::Watchlist;

/// Shared HTTP clients for the wallet side of the app.
#[derive(Clone)]
pub struct SolanaClients {
    pub rpc: Arc<RpcClient>,
    pub prices: Arc<PriceClient>,
    pub floor: Arc<FloorClient>,
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshIntervals {
    pub portfolio: Duration,
    pub floor: Duration,
}

/// Handles [`WalletCommand`]s and keeps the portfolio and floor price fresh.
pub struct WalletService {
    identity: Option<WalletIdentity>,
    clients: SolanaClients,
    watchlist: Watchlist,
    intervals: RefreshIntervals,
    command_receiver: mpsc::Receiver<WalletCommand>,
    event_sender: mpsc::Sender<AppEvent>,
    portfolio_refresh: Option<RefreshTask>,
    floor_refresh: Option<RefreshTask>,
}

impl WalletService {
    pub fn new(
        identity: Option<WalletIdentity>,
        clients: SolanaClients,
        watchlist: Watchlist,
        intervals: RefreshIntervals,
        command_receiver: mpsc::Receiver<WalletCommand>,
        event_sender: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            identity,
            clients,
            watchlist,
            intervals,
            command_receiver,
            event_sender,
            portfolio_refresh: None,
            floor_refresh: None,
        }
    }

    pub async fn run(mut self) {
        self.emit(AppEvent::Watchlist(self.watchlist.entries().to_vec()))
            .await;
        if self.identity.is_some() {
            self.restart_portfolio_refresh();
        }

        while let Some(command) = self.command_receiver.recv().await {
            if let Err(err) = self.handle_command(command).await {
                log::warn!("Wallet command failed: {err}");
                self.emit(AppEvent::Notice(err.user_message())).await;
            }
        }
        let aborted = self
            .portfolio_refresh
            .iter()
            .chain(&self.floor_refresh)
            .count();
        log::debug!("Wallet service stopped, aborting {aborted} refresh tasks");
    }

    async fn handle_command(&mut self, command: WalletCommand) -> Result<()> {
        match command {
            WalletCommand::RefreshPortfolio => {
                self.connected_owner()?;
                self.restart_portfolio_refresh();
            }
            WalletCommand::RequestAirdrop { sol } => {
                let owner = self.connected_owner()?.to_string();
                let lamports = sol_to_lamports(sol)?;
                self.spawn_airdrop(owner, lamports);
            }
            WalletCommand::FetchBalance { address } => {
                let address = parse_address(&address)?;
                let rpc = self.clients.rpc.clone();
                let events = self.event_sender.clone();
                tokio::spawn(async move {
                    let event = match rpc.get_balance(&address).await {
                        Ok(lamports) => AppEvent::Balance {
                            address,
                            sol: lamports_to_sol(lamports),
                        },
                        Err(err) => {
                            log::warn!("Error fetching balance for {address}: {err}");
                            AppEvent::Notice(err.user_message())
                        }
                    };
                    forward(&events, event).await;
                });
            }
            WalletCommand::AddWatch { address } => {
                if !self.watchlist.add(&address)? {
                    self.emit(AppEvent::Notice("Address is already watched".to_string()))
                        .await;
                }
                self.emit_watchlist().await;
            }
            WalletCommand::RemoveWatch { address } => {
                self.watchlist.remove(&address)?;
                self.emit_watchlist().await;
            }
            WalletCommand::TrackFloor { symbol } => {
                let symbol = validate_symbol(&symbol)?.to_string();
                self.restart_floor_refresh(symbol);
            }
            WalletCommand::SendSol { to, sol } => {
                let payer = self.connected_identity()?.clone();
                let lamports = sol_to_lamports(sol)?;
                check_recipient(&Pubkey::new(payer.public_key()), &to)?;
                self.spawn_transaction(move |rpc| async move {
                    let signature = send_sol(&rpc, &payer, &to, lamports).await?;
                    Ok::<_, Error>(format!("Sent {sol} SOL to {}: {signature}", to.trim()))
                });
            }
            WalletCommand::SendToken { mint, to, amount } => {
                let payer = self.connected_identity()?.clone();
                let mint = parse_address(&mint)?;
                check_recipient(&Pubkey::new(payer.public_key()), &to)?;
                if !amount.is_finite() || amount <= 0.0 {
                    return Err(Error::InvalidInput(format!(
                        "{amount} is not a positive token amount"
                    )));
                }
                self.spawn_transaction(move |rpc| async move {
                    let signature = send_token(&rpc, &payer, &mint, &to, amount).await?;
                    Ok::<_, Error>(format!("Sent {amount} tokens to {}: {signature}", to.trim()))
                });
            }
            WalletCommand::CreateToken { decimals, supply } => {
                let payer = self.connected_identity()?.clone();
                if decimals > MAX_DECIMALS {
                    return Err(Error::InvalidInput(format!(
                        "decimals must be at most {MAX_DECIMALS}"
                    )));
                }
                to_base_units(supply, decimals)?;
                self.spawn_transaction(move |rpc| async move {
                    let token = create_token(&rpc, &payer, decimals, supply).await?;
                    Ok::<_, Error>(format!("Token created! Mint address: {}", token.mint))
                });
            }
            WalletCommand::LoadNfts => {
                let owner = self.connected_owner()?.to_string();
                let rpc = self.clients.rpc.clone();
                let events = self.event_sender.clone();
                tokio::spawn(async move {
                    let event = match load_nfts(&rpc, &owner).await {
                        Ok(nfts) => AppEvent::Nfts(nfts),
                        Err(err) => {
                            log::warn!("Error loading NFTs: {err}");
                            AppEvent::Notice(err.user_message())
                        }
                    };
                    forward(&events, event).await;
                });
            }
        }
        Ok(())
    }

    fn connected_identity(&self) -> Result<&WalletIdentity> {
        self.identity.as_ref().ok_or(Error::WalletNotConnected)
    }

    fn connected_owner(&self) -> Result<&str> {
        self.connected_identity().map(WalletIdentity::address)
    }

    /// Runs a signing action in the background, reports the outcome as a
    /// notice and reloads the portfolio after a success.
    fn spawn_transaction<F, Fut>(&self, action: F)
    where
        F: FnOnce(Arc<RpcClient>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let Some(owner) = self.identity.as_ref().map(|id| id.address().to_string()) else {
            return;
        };
        let clients = self.clients.clone();
        let events = self.event_sender.clone();
        tokio::spawn(async move {
            match action(clients.rpc.clone()).await {
                Ok(notice) => {
                    forward(&events, AppEvent::Notice(notice)).await;
                    match load_portfolio(&clients.rpc, &clients.prices, &owner).await {
                        Ok(portfolio) => forward(&events, AppEvent::Portfolio(portfolio)).await,
                        Err(err) => log::warn!("Error reloading portfolio: {err}"),
                    }
                }
                Err(err) => {
                    log::warn!("Transaction failed: {err}");
                    forward(&events, AppEvent::Notice(err.user_message())).await;
                }
            }
        });
    }

    fn restart_portfolio_refresh(&mut self) {
        let Some(owner) = self.identity.as_ref().map(|id| id.address().to_string()) else {
            return;
        };
        let clients = self.clients.clone();
        let events = self.event_sender.clone();
        // Assigning drops (and aborts) the previous timer.
        self.portfolio_refresh = Some(RefreshTask::spawn(self.intervals.portfolio, move || {
            let clients = clients.clone();
            let events = events.clone();
            let owner = owner.clone();
            async move {
                let event = match load_portfolio(&clients.rpc, &clients.prices, &owner).await {
                    Ok(portfolio) => AppEvent::Portfolio(portfolio),
                    Err(err) => {
                        log::warn!("Error loading portfolio: {err}");
                        AppEvent::Notice(err.user_message())
                    }
                };
                forward(&events, event).await;
            }
        }));
    }

    fn restart_floor_refresh(&mut self, symbol: String) {
        let floor = self.clients.floor.clone();
        let events = self.event_sender.clone();
        self.floor_refresh = Some(RefreshTask::spawn(self.intervals.floor, move || {
            let floor = floor.clone();
            let events = events.clone();
            let symbol = symbol.clone();
            async move {
                match floor.floor_price(&symbol).await {
                    Ok(sol) => forward(&events, AppEvent::FloorPrice { symbol, sol }).await,
                    Err(err) => log::warn!("Error fetching floor price for {symbol}: {err}"),
                }
            }
        }));
    }

    fn spawn_airdrop(&self, owner: String, lamports: u64) {
        let rpc = self.clients.rpc.clone();
        let events = self.event_sender.clone();
        tokio::spawn(async move {
            let outcome: Result<()> = async {
                let signature = rpc.request_airdrop(&owner, lamports).await?;
                log::info!("Airdrop requested: {signature}");
                rpc.confirm_signature(&signature).await
            }
            .await;
            let notice = match outcome {
                Ok(()) => format!("Airdrop of {} SOL was confirmed!", lamports_to_sol(lamports)),
                Err(err) => {
                    log::warn!("Airdrop failed: {err}");
                    err.user_message()
                }
            };
            forward(&events, AppEvent::Notice(notice)).await;
        });
    }

    async fn emit_watchlist(&mut self) {
        self.emit(AppEvent::Watchlist(self.watchlist.entries().to_vec()))
            .await;
    }

    async fn emit(&mut self, event: AppEvent) {
        forward(&self.event_sender, event).await;
    }
}

/// Background tasks outlive nothing but the UI; a closed channel just means
/// nobody is listening any more.
async fn forward(events: &mpsc::Sender<AppEvent>, event: AppEvent) {
    if let Err(err) = events.send(event).await {
        log::debug!("UI gone, wallet event dropped: {err}");
    }
}
