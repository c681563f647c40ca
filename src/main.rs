use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use libp2p::identity::Keypair;
use tokio::sync::mpsc;

use solchat::chat::{
    BackupUploader, ChatService, ChatViewModel, DisabledBackup, PinningUploader, SignaturePolicy,
};
use solchat::common::WalletCommand;
use solchat::config::{self, AppConfig};
use solchat::identity::WalletIdentity;
use solchat::network::{GossipRelay, Relay, RelayOptions, parse_bootstrap_peers};
use solchat::solana::{
    FloorClient, PriceClient, RefreshIntervals, RpcClient, SolanaClients, WalletService,
    create_token, explorer_url, format_usd, lamports_to_sol, load_nfts, load_portfolio,
    parse_address, send_sol, send_token, sol_to_lamports,
};
use solchat::ui::ChatApp;
use solchat::watchlist::Watchlist;

type BoxError = Box<dyn std::error::Error>;
type AppInitError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(
    name = "solchat",
    version,
    about = "Wallet-to-wallet chat over gossip, with a Solana portfolio on the side"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Solana CLI keypair file (overrides `keypair_path` in the config)
    #[arg(long, value_name = "FILE")]
    keypair: Option<PathBuf>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Run a headless relay node (no UI, store and forward only)
    Relay,
    /// Generate a new keypair file
    Keygen {
        #[arg(long, value_name = "FILE", default_value = "data/id.json")]
        out: PathBuf,
    },
    /// Print the SOL balance of an address
    Balance { address: String },
    /// Print balances and USD values (defaults to the connected wallet)
    Portfolio { address: Option<String> },
    /// Request devnet SOL for the connected wallet and wait for confirmation
    Airdrop {
        #[arg(long, default_value_t = 1.0)]
        sol: f64,
    },
    /// Print a collection's floor price
    Floor { symbol: String },
    /// Send SOL, or an SPL token with --mint, from the connected wallet
    Send {
        to: String,
        amount: f64,
        /// Token mint address; omit to send SOL
        #[arg(long, value_name = "MINT")]
        mint: Option<String>,
    },
    /// Create a new SPL token and mint its initial supply to the connected wallet
    CreateToken {
        #[arg(long, default_value_t = 9)]
        decimals: u8,
        #[arg(long)]
        supply: f64,
    },
    /// List NFTs held by an address (defaults to the connected wallet)
    Nfts { address: Option<String> },
    /// Manage the address watchlist
    Watch {
        #[command(subcommand)]
        action: WatchAction,
    },
}

#[derive(Subcommand)]
enum WatchAction {
    Add { address: String },
    Remove { address: String },
    List,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let app_config = config::load_config(&cli.config);
    let keypair_path = cli.keypair.clone().or_else(|| app_config.keypair_path.clone());

    match cli.mode {
        None => run_full_client(app_config, keypair_path.as_deref()).await,
        Some(Mode::Relay) => run_relay_node(app_config, keypair_path.as_deref()).await,
        Some(Mode::Keygen { out }) => {
            let identity = WalletIdentity::generate();
            identity.save(&out)?;
            println!("Wrote keypair for {} to {}", identity.address(), out.display());
            Ok(())
        }
        Some(Mode::Balance { address }) => {
            let address = parse_address(&address)?;
            let lamports = rpc_client(&app_config).get_balance(&address).await?;
            println!("{address}: {} SOL", lamports_to_sol(lamports));
            Ok(())
        }
        Some(Mode::Portfolio { address }) => {
            let owner = match address {
                Some(address) => address,
                None => require_identity(keypair_path.as_deref())?.address().to_string(),
            };
            let clients = solana_clients(&app_config);
            let portfolio = load_portfolio(&clients.rpc, &clients.prices, &owner).await?;
            println!("{} ({})", portfolio.owner, explorer_url(&portfolio.owner));
            println!(
                "  SOL   {:.4}  {}",
                portfolio.sol,
                format_usd(portfolio.sol_value_usd())
            );
            for token in &portfolio.tokens {
                println!(
                    "  {}  {}  {}",
                    token.mint,
                    token.amount,
                    format_usd(token.usd_value)
                );
            }
            println!("  Total {}", format_usd(portfolio.total_usd()));
            Ok(())
        }
        Some(Mode::Airdrop { sol }) => {
            let identity = require_identity(keypair_path.as_deref())?;
            let lamports = sol_to_lamports(sol)?;
            let rpc = rpc_client(&app_config);
            let signature = rpc.request_airdrop(identity.address(), lamports).await?;
            println!("Airdrop requested: {signature}");
            rpc.confirm_signature(&signature).await?;
            println!("Airdrop of {sol} SOL was confirmed!");
            Ok(())
        }
        Some(Mode::Floor { symbol }) => {
            let floor = FloorClient::new(reqwest::Client::new(), &app_config.floor_api_url)
                .floor_price(&symbol)
                .await?;
            println!("{symbol}: {floor} SOL");
            Ok(())
        }
        Some(Mode::Send { to, amount, mint }) => {
            let identity = require_identity(keypair_path.as_deref())?;
            let rpc = rpc_client(&app_config);
            let signature = match mint {
                None => send_sol(&rpc, &identity, &to, sol_to_lamports(amount)?).await?,
                Some(mint) => send_token(&rpc, &identity, &mint, &to, amount).await?,
            };
            println!("Transaction confirmed: {signature}");
            Ok(())
        }
        Some(Mode::CreateToken { decimals, supply }) => {
            let identity = require_identity(keypair_path.as_deref())?;
            let token = create_token(&rpc_client(&app_config), &identity, decimals, supply).await?;
            println!("Token created! Mint address: {}", token.mint);
            println!("  token account {}", token.token_account);
            println!("  signature     {}", token.signature);
            Ok(())
        }
        Some(Mode::Nfts { address }) => {
            let owner = match address {
                Some(address) => parse_address(&address)?,
                None => require_identity(keypair_path.as_deref())?.address().to_string(),
            };
            let nfts = load_nfts(&rpc_client(&app_config), &owner).await?;
            if nfts.is_empty() {
                println!("No NFTs found for {owner}");
            }
            for nft in nfts {
                println!("{}  {}  {}", nft.mint, nft.name, nft.uri);
            }
            Ok(())
        }
        Some(Mode::Watch { action }) => {
            let mut watchlist = Watchlist::load(&app_config.watchlist_path);
            match action {
                WatchAction::Add { address } => {
                    if !watchlist.add(&address)? {
                        println!("Already watching {}", address.trim());
                    }
                }
                WatchAction::Remove { address } => {
                    if !watchlist.remove(&address)? {
                        println!("Not watching {}", address.trim());
                    }
                }
                WatchAction::List => {}
            }
            for address in watchlist.entries() {
                println!("{address}");
            }
            Ok(())
        }
    }
}

fn load_identity(path: Option<&Path>) -> Result<Option<WalletIdentity>, BoxError> {
    match path {
        Some(path) => Ok(Some(WalletIdentity::load(path)?)),
        None => {
            log::warn!("No keypair configured; running without a wallet");
            Ok(None)
        }
    }
}

fn require_identity(path: Option<&Path>) -> Result<WalletIdentity, BoxError> {
    load_identity(path)?.ok_or_else(|| solchat::Error::WalletNotConnected.into())
}

fn rpc_client(config: &AppConfig) -> RpcClient {
    RpcClient::new(reqwest::Client::new(), &config.rpc_url)
}

fn solana_clients(config: &AppConfig) -> SolanaClients {
    let http = reqwest::Client::new();
    SolanaClients {
        rpc: Arc::new(RpcClient::new(http.clone(), &config.rpc_url)),
        prices: Arc::new(PriceClient::new(http.clone(), &config.price_api_url)),
        floor: Arc::new(FloorClient::new(http, &config.floor_api_url)),
    }
}

fn relay_options(config: &AppConfig) -> RelayOptions {
    RelayOptions {
        topic: config.relay_topic.clone(),
        listen_addr: config.listen_addr.clone(),
        bootstrap_peers: parse_bootstrap_peers(&config.bootstrap_nodes),
        log_path: Some(config.relay_log_path.clone()),
    }
}

fn transport_key(identity: Option<&WalletIdentity>) -> Keypair {
    identity
        .map(WalletIdentity::transport_keypair)
        .unwrap_or_else(Keypair::generate_ed25519)
}

async fn run_relay_node(config: AppConfig, keypair_path: Option<&Path>) -> Result<(), BoxError> {
    let identity = load_identity(keypair_path)?;
    let relay = GossipRelay::spawn(relay_options(&config), transport_key(identity.as_ref()), None)?;
    log::info!(
        "Relay node {} serving topic `{}`",
        relay.local_peer_id(),
        config.relay_topic
    );

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down relay node");
    relay.shutdown().await;
    Ok(())
}

async fn run_full_client(config: AppConfig, keypair_path: Option<&Path>) -> Result<(), BoxError> {
    let identity = load_identity(keypair_path)?;
    let address = identity.as_ref().map(|id| id.address().to_string());

    // UI -> services
    let (chat_tx, chat_rx) = mpsc::channel(100);
    let (wallet_tx, wallet_rx) = mpsc::channel(100);
    // services -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    let relay: Arc<dyn Relay> = Arc::new(GossipRelay::spawn(
        relay_options(&config),
        transport_key(identity.as_ref()),
        Some(event_tx.clone()),
    )?);

    let http = reqwest::Client::new();
    let backup: Arc<dyn BackupUploader> = match PinningUploader::new(
        http,
        &config.pinning_url,
        &config.gateway_url,
        config.pinning_jwt.clone(),
    ) {
        Ok(uploader) => Arc::new(uploader),
        Err(err) => {
            log::warn!("Backups disabled: {err}");
            Arc::new(DisabledBackup::new(err.to_string()))
        }
    };

    let policy = if config.require_signatures {
        SignaturePolicy::Required
    } else {
        SignaturePolicy::IfPresent
    };
    let view_model = ChatViewModel::new(identity.clone(), relay, backup).with_policy(policy);
    tokio::spawn(ChatService::new(view_model, chat_rx, event_tx.clone()).run());

    let intervals = RefreshIntervals {
        portfolio: Duration::from_secs(config.portfolio_refresh_secs),
        floor: Duration::from_secs(config.floor_refresh_secs),
    };
    let wallet = WalletService::new(
        identity,
        solana_clients(&config),
        Watchlist::load(&config.watchlist_path),
        intervals,
        wallet_rx,
        event_tx,
    );
    tokio::spawn(wallet.run());

    if let Some(symbol) = config.floor_collection.clone() {
        if let Err(err) = wallet_tx.try_send(WalletCommand::TrackFloor { symbol }) {
            log::warn!("Could not start floor tracking: {err}");
        }
    }

    let options = eframe::NativeOptions::default();
    let mut event_rx = Some(event_rx);

    eframe::run_native(
        "Solana Chat",
        options,
        Box::new(move |cc: &eframe::CreationContext<'_>| -> Result<Box<dyn eframe::App>, AppInitError> {
            let event_receiver = event_rx
                .take()
                .ok_or("ChatApp initialized more than once")?;
            log::info!("Client started for {}", address.as_deref().unwrap_or("no wallet"));
            Ok(Box::new(ChatApp::new(
                cc,
                address.clone(),
                chat_tx.clone(),
                wallet_tx.clone(),
                event_receiver,
            )))
        }),
    )?;
    Ok(())
}
