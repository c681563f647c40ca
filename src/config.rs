use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config/solchat.json";
pub const DEFAULT_TOPIC: &str = "solana-chat";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Relay nodes to dial, as multiaddrs ending in `/p2p/<PeerId>`.
    pub bootstrap_nodes: Vec<String>,
    pub listen_addr: String,
    pub relay_topic: String,
    pub relay_log_path: PathBuf,
    /// Solana CLI keypair; no keypair means the wallet is not connected.
    pub keypair_path: Option<PathBuf>,
    pub watchlist_path: PathBuf,
    pub rpc_url: String,
    pub pinning_url: String,
    pub gateway_url: String,
    /// Bearer token for the pinning service. Normally from `PINATA_JWT`.
    #[serde(skip_serializing)]
    pub pinning_jwt: Option<String>,
    pub price_api_url: String,
    pub floor_api_url: String,
    pub floor_collection: Option<String>,
    pub portfolio_refresh_secs: u64,
    pub floor_refresh_secs: u64,
    /// Drop relay records that carry no signature.
    pub require_signatures: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bootstrap_nodes: Vec::new(),
            listen_addr: "/ip4/0.0.0.0/tcp/0".to_string(),
            relay_topic: DEFAULT_TOPIC.to_string(),
            relay_log_path: PathBuf::from("data/relay.db"),
            keypair_path: None,
            watchlist_path: PathBuf::from("data/watchlist.json"),
            rpc_url: "https://api.devnet.solana.com".to_string(),
            pinning_url: "https://api.pinata.cloud/pinning/pinJSONToIPFS".to_string(),
            gateway_url: "https://gateway.pinata.cloud".to_string(),
            pinning_jwt: None,
            price_api_url: "https://api.coingecko.com/api/v3".to_string(),
            floor_api_url: "https://api-mainnet.magiceden.dev/v2".to_string(),
            floor_collection: None,
            portfolio_refresh_secs: 360,
            floor_refresh_secs: 60,
            require_signatures: true,
        }
    }
}

impl AppConfig {
    /// Environment values win over the file.
    fn apply_env(&mut self) {
        if let Ok(jwt) = env::var("PINATA_JWT") {
            if !jwt.trim().is_empty() {
                self.pinning_jwt = Some(jwt.trim().to_string());
            }
        }
        if let Ok(url) = env::var("SOLANA_RPC_URL") {
            if !url.trim().is_empty() {
                self.rpc_url = url.trim().to_string();
            }
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let mut config = read_config_file(Path::new(path));
    config.apply_env();
    config
}

fn read_config_file(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solchat.json");
        fs::write(
            &path,
            r#"{"relay_topic":"devnet-chat","bootstrap_nodes":["/ip4/1.2.3.4/tcp/4001/p2p/x"]}"#,
        )
        .unwrap();

        let config = read_config_file(&path);
        assert_eq!(config.relay_topic, "devnet-chat");
        assert_eq!(config.bootstrap_nodes.len(), 1);
        assert_eq!(config.floor_refresh_secs, 60);
        assert!(config.require_signatures);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solchat.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(read_config_file(&path).relay_topic, DEFAULT_TOPIC);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = read_config_file(Path::new("/nonexistent/solchat.json"));
        assert_eq!(config.portfolio_refresh_secs, 360);
        assert!(config.keypair_path.is_none());
    }

    #[test]
    fn jwt_is_never_written_back() {
        let config = AppConfig {
            pinning_jwt: Some("secret".into()),
            ..AppConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
