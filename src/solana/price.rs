//! CoinGecko USD quotes for SOL and SPL mints.

use std::collections::HashMap;

use crate::error::{Error, Result};

type Quotes = HashMap<String, HashMap<String, f64>>;

pub struct PriceClient {
    http: reqwest::Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn quotes(&self, path: &str, query: &[(&str, &str)]) -> Result<Quotes> {
        let response = self
            .http
            .get(format!("{}/{path}", self.base_url))
            .query(query)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    pub async fn sol_usd(&self) -> Result<f64> {
        let quotes = self
            .quotes("simple/price", &[("ids", "solana"), ("vs_currencies", "usd")])
            .await?;
        usd_quote(&quotes, "solana")
            .ok_or_else(|| Error::InvalidInput("no USD quote for solana".to_string()))
    }

    /// USD price per mint. Mints CoinGecko does not list are absent from the map.
    pub async fn token_prices(&self, mints: &[String]) -> Result<HashMap<String, f64>> {
        if mints.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = mints.join(",");
        let quotes = self
            .quotes(
                "simple/token_price/solana",
                &[("contract_addresses", joined.as_str()), ("vs_currencies", "usd")],
            )
            .await?;
        Ok(mints
            .iter()
            .filter_map(|mint| usd_quote(&quotes, mint).map(|usd| (mint.clone(), usd)))
            .collect())
    }
}

// CoinGecko lowercases contract addresses in some responses.
fn usd_quote(quotes: &Quotes, id: &str) -> Option<f64> {
    quotes
        .get(id)
        .or_else(|| quotes.get(&id.to_lowercase()))
        .and_then(|prices| prices.get("usd"))
        .copied()
}

pub fn format_usd(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("${value:.2}"),
        None => "N/A".to_string(),
    }
}
