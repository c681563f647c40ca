use std::collections::HashMap;

use super::address::{lamports_to_sol, parse_address};
use super::price::PriceClient;
use super::rpc::{RpcClient, TokenBalance};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenHolding {
    pub mint: String,
    pub amount: f64,
    pub decimals: u8,
    pub usd_value: Option<f64>,
}

/// Balances for one wallet. Missing quotes leave the USD fields empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub owner: String,
    pub sol: f64,
    pub sol_usd: Option<f64>,
    pub tokens: Vec<TokenHolding>,
}

impl Portfolio {
    pub fn sol_value_usd(&self) -> Option<f64> {
        self.sol_usd.map(|price| price * self.sol)
    }

    pub fn total_usd(&self) -> Option<f64> {
        let tokens: f64 = self.tokens.iter().filter_map(|t| t.usd_value).sum();
        self.sol_value_usd().map(|sol| sol + tokens)
    }
}

/// Balances must load; prices are best effort, each one on its own.
pub async fn load_portfolio(
    rpc: &RpcClient,
    prices: &PriceClient,
    owner: &str,
) -> Result<Portfolio> {
    let owner = parse_address(owner)?;
    let (lamports, balances) =
        tokio::try_join!(rpc.get_balance(&owner), rpc.get_token_balances(&owner))?;

    let mints: Vec<String> = balances.iter().map(|b| b.mint.clone()).collect();
    let (sol_usd, token_prices) = tokio::join!(prices.sol_usd(), prices.token_prices(&mints));
    let sol_usd = sol_usd
        .inspect_err(|err| log::warn!("Error fetching SOL price: {err}"))
        .ok();
    let token_prices = token_prices
        .inspect_err(|err| log::warn!("Error fetching token prices: {err}"))
        .unwrap_or_default();

    Ok(assemble(owner, lamports, sol_usd, balances, &token_prices))
}

fn assemble(
    owner: String,
    lamports: u64,
    sol_usd: Option<f64>,
    balances: Vec<TokenBalance>,
    token_prices: &HashMap<String, f64>,
) -> Portfolio {
    let tokens = balances
        .into_iter()
        .map(|balance| TokenHolding {
            usd_value: token_prices.get(&balance.mint).map(|p| p * balance.amount),
            mint: balance.mint,
            amount: balance.amount,
            decimals: balance.decimals,
        })
        .collect();
    Portfolio {
        owner,
        sol: lamports_to_sol(lamports),
        sol_usd,
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpriced_tokens_keep_their_balance() {
        let balances = vec![
            TokenBalance {
                mint: "usdc".into(),
                amount: 10.0,
                decimals: 6,
            },
            TokenBalance {
                mint: "obscure".into(),
                amount: 3.0,
                decimals: 0,
            },
        ];
        let prices = HashMap::from([("usdc".to_string(), 1.0)]);
        let portfolio = assemble("me".into(), 2_000_000_000, Some(100.0), balances, &prices);

        assert_eq!(portfolio.sol, 2.0);
        assert_eq!(portfolio.sol_value_usd(), Some(200.0));
        assert_eq!(portfolio.tokens[0].usd_value, Some(10.0));
        assert_eq!(portfolio.tokens[1].usd_value, None);
        assert_eq!(portfolio.tokens[1].amount, 3.0);
        assert_eq!(portfolio.total_usd(), Some(210.0));
    }

    #[test]
    fn no_sol_quote_means_no_total() {
        let portfolio = assemble("me".into(), 1, None, vec![], &HashMap::new());
        assert_eq!(portfolio.total_usd(), None);
    }
}
