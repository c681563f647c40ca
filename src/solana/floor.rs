//! Magic Eden collection floor prices.

use serde::Deserialize;

use super::address::lamports_to_sol;
use crate::error::{Error, Result};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionStats {
    floor_price: Option<u64>,
}

pub struct FloorClient {
    http: reqwest::Client,
    base_url: String,
}

impl FloorClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Floor price of a collection, in SOL.
    pub async fn floor_price(&self, symbol: &str) -> Result<f64> {
        let symbol = validate_symbol(symbol)?;
        let response = self
            .http
            .get(format!("{}/collections/{symbol}/stats", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        let stats: CollectionStats = response.json().await?;
        floor_in_sol(symbol, stats)
    }
}

fn floor_in_sol(symbol: &str, stats: CollectionStats) -> Result<f64> {
    stats
        .floor_price
        .map(lamports_to_sol)
        .ok_or_else(|| Error::InvalidInput(format!("collection {symbol} has no floor price")))
}

pub fn validate_symbol(symbol: &str) -> Result<&str> {
    let symbol = symbol.trim();
    let valid = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(symbol)
    } else {
        Err(Error::InvalidInput(format!("bad collection symbol {symbol:?}")))
    }
}
