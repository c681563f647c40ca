/// Commands the UI sends to the chat service.
#[derive(Debug, Clone)]
pub enum ChatCommand {
    /// Replace the compose box contents.
    Draft { receiver: String, message: String },
    /// Send whatever is in the compose box.
    Send,
}

/// Commands the UI sends to the wallet service.
#[derive(Debug, Clone)]
pub enum WalletCommand {
    /// Reload balance, token holdings and prices for the connected wallet.
    RefreshPortfolio,
    /// Ask the cluster faucet for SOL and wait for confirmation.
    RequestAirdrop { sol: f64 },
    /// One-off balance lookup for any address (watchlist "Fetch Info").
    FetchBalance { address: String },
    AddWatch { address: String },
    RemoveWatch { address: String },
    /// Start polling the floor price of a marketplace collection.
    TrackFloor { symbol: String },
    /// Transfer SOL from the connected wallet.
    SendSol { to: String, sol: f64 },
    /// Transfer `amount` whole tokens of `mint`, opening the recipient's token
    /// account if needed.
    SendToken { mint: String, to: String, amount: f64 },
    /// Create a new SPL mint owned by the connected wallet and mint `supply`
    /// tokens to it.
    CreateToken { decimals: u8, supply: f64 },
    /// List the NFTs the connected wallet holds.
    LoadNfts,
}
