//! Minimal Solana JSON-RPC client: balances, token accounts, airdrops and
//! submitting signed transactions.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::address::TOKEN_PROGRAM_ID;
use super::pubkey::decode_32;
use super::transaction::Transaction;
use crate::error::{Error, Result};

const CONFIRM_ATTEMPTS: usize = 30;
const CONFIRM_INTERVAL: Duration = Duration::from_secs(1);
/// `getMultipleAccounts` limit per request.
const MAX_ACCOUNTS_PER_CALL: usize = 100;

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct KeyedAccount {
    account: ParsedAccount,
}

#[derive(Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Deserialize)]
struct ParsedData {
    parsed: ParsedToken,
}

#[derive(Deserialize)]
struct ParsedToken {
    info: TokenInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAmount {
    ui_amount: Option<f64>,
    decimals: u8,
}

#[derive(Deserialize)]
struct LatestBlockhash {
    blockhash: String,
}

/// Account fetched with `base64` encoding: `data` is `[payload, "base64"]`.
#[derive(Deserialize)]
struct EncodedAccount {
    data: (String, String),
}

#[derive(Deserialize)]
struct MintAccount {
    data: MintData,
}

#[derive(Deserialize)]
struct MintData {
    parsed: ParsedMint,
}

#[derive(Deserialize)]
struct ParsedMint {
    info: MintInfo,
}

#[derive(Deserialize)]
struct MintInfo {
    decimals: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub confirmation_status: Option<String>,
    pub err: Option<Value>,
}

/// An SPL token balance as reported by `jsonParsed` encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub mint: String,
    pub amount: f64,
    pub decimals: u8,
}

pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("RPC {method} returned HTTP {status}");
            return Err(Error::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        decode_response(method, &body)
    }

    /// Balance in lamports.
    pub async fn get_balance(&self, address: &str) -> Result<u64> {
        let balance: WithContext<u64> = self.call("getBalance", json!([address])).await?;
        Ok(balance.value)
    }

    pub async fn get_token_balances(&self, owner: &str) -> Result<Vec<TokenBalance>> {
        let accounts: WithContext<Vec<KeyedAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([owner, { "programId": TOKEN_PROGRAM_ID }, { "encoding": "jsonParsed" }]),
            )
            .await?;
        Ok(accounts.value.into_iter().map(TokenBalance::from).collect())
    }

    /// Returns the airdrop transaction signature.
    pub async fn request_airdrop(&self, address: &str, lamports: u64) -> Result<String> {
        self.call("requestAirdrop", json!([address, lamports])).await
    }

    pub async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
            .call("getSignatureStatuses", json!([[signature]]))
            .await?;
        Ok(statuses.value.into_iter().next().flatten())
    }

    /// Most recent blockhash at `confirmed` commitment, for a new transaction.
    pub async fn get_latest_blockhash(&self) -> Result<[u8; 32]> {
        let latest: WithContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        decode_32(&latest.value.blockhash, "blockhash")
    }

    pub async fn get_minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64> {
        self.call("getMinimumBalanceForRentExemption", json!([space]))
            .await
    }

    /// Decimals of an SPL mint. A mint that does not exist is an input error.
    pub async fn get_mint_decimals(&self, mint: &str) -> Result<u8> {
        let account: WithContext<Option<MintAccount>> = self
            .call("getAccountInfo", json!([mint, { "encoding": "jsonParsed" }]))
            .await?;
        account
            .value
            .map(|account| account.data.parsed.info.decimals)
            .ok_or_else(|| Error::InvalidInput(format!("mint {mint} does not exist")))
    }

    /// Raw data of each account, `None` where the account does not exist.
    pub async fn get_multiple_accounts(&self, addresses: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut accounts = Vec::with_capacity(addresses.len());
        for chunk in addresses.chunks(MAX_ACCOUNTS_PER_CALL) {
            let batch: WithContext<Vec<Option<EncodedAccount>>> = self
                .call("getMultipleAccounts", json!([chunk, { "encoding": "base64" }]))
                .await?;
            for account in batch.value {
                accounts.push(account.map(account_data).transpose()?);
            }
        }
        Ok(accounts)
    }

    /// Submits a signed transaction; returns its signature.
    pub async fn send_transaction(&self, transaction: &Transaction) -> Result<String> {
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    transaction.to_base64(),
                    { "encoding": "base64", "preflightCommitment": "confirmed" }
                ]),
            )
            .await?;
        log::info!("Submitted transaction {signature}");
        Ok(signature)
    }

    /// Poll until the transaction is confirmed, fails, or we give up.
    pub async fn confirm_signature(&self, signature: &str) -> Result<()> {
        let mut interval = tokio::time::interval(CONFIRM_INTERVAL);
        for _ in 0..CONFIRM_ATTEMPTS {
            interval.tick().await;
            let Some(status) = self.get_signature_status(signature).await? else {
                continue;
            };
            if let Some(err) = status.err {
                return Err(Error::Rpc {
                    code: 0,
                    message: format!("transaction {signature} failed: {err}"),
                });
            }
            if matches!(
                status.confirmation_status.as_deref(),
                Some("confirmed") | Some("finalized")
            ) {
                return Ok(());
            }
        }
        Err(Error::Rpc {
            code: 0,
            message: format!("transaction {signature} not confirmed in time"),
        })
    }
}

impl From<KeyedAccount> for TokenBalance {
    fn from(account: KeyedAccount) -> Self {
        let info = account.account.data.parsed.info;
        Self {
            mint: info.mint,
            amount: info.token_amount.ui_amount.unwrap_or(0.0),
            decimals: info.token_amount.decimals,
        }
    }
}

fn account_data(account: EncodedAccount) -> Result<Vec<u8>> {
    let (payload, encoding) = account.data;
    if encoding != "base64" {
        return Err(Error::Rpc {
            code: 0,
            message: format!("account data came back as {encoding}, expected base64"),
        });
    }
    BASE64.decode(payload).map_err(|e| Error::Rpc {
        code: 0,
        message: format!("account data is not base64: {e}"),
    })
}

fn decode_response<T: DeserializeOwned>(method: &str, body: &[u8]) -> Result<T> {
    let response: RpcResponse<T> = serde_json::from_slice(body)?;
    if let Some(error) = response.error {
        log::warn!("RPC {method} failed: {} ({})", error.message, error.code);
        return Err(Error::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    response.result.ok_or_else(|| Error::Rpc {
        code: 0,
        message: format!("{method} returned no result"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_balance() {
        let body = br#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":2500000000},"id":1}"#;
        let balance: WithContext<u64> = decode_response("getBalance", body).unwrap();
        assert_eq!(balance.value, 2_500_000_000);
    }

    #[test]
    fn surfaces_rpc_errors() {
        let body = br#"{"jsonrpc":"2.0","error":{"code":429,"message":"Too many requests for a specific RPC call"},"id":1}"#;
        let err = decode_response::<String>("requestAirdrop", body).unwrap_err();
        assert!(matches!(err, Error::Rpc { code: 429, .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn decodes_parsed_token_accounts() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":7},"value":[
            {"pubkey":"acct1","account":{"lamports":2039280,"owner":"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
             "data":{"program":"spl-token","parsed":{"type":"account","info":{
                "isNative":false,"mint":"EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v","owner":"me",
                "state":"initialized","tokenAmount":{"amount":"1250000","decimals":6,"uiAmount":1.25,"uiAmountString":"1.25"}}},"space":165}}},
            {"pubkey":"acct2","account":{"lamports":2039280,"owner":"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
             "data":{"program":"spl-token","parsed":{"type":"account","info":{
                "mint":"So11111111111111111111111111111111111111112","owner":"me",
                "tokenAmount":{"amount":"0","decimals":9,"uiAmount":null,"uiAmountString":"0"}}},"space":165}}}
        ]}}"#;
        let accounts: WithContext<Vec<KeyedAccount>> =
            decode_response("getTokenAccountsByOwner", body).unwrap();
        let balances: Vec<TokenBalance> =
            accounts.value.into_iter().map(TokenBalance::from).collect();
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].amount, 1.25);
        assert_eq!(balances[0].decimals, 6);
        assert_eq!(balances[1].amount, 0.0);
    }

    #[test]
    fn decodes_pending_signature_status() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":9},"value":[null]}}"#;
        let statuses: WithContext<Vec<Option<SignatureStatus>>> =
            decode_response("getSignatureStatuses", body).unwrap();
        assert!(statuses.value[0].is_none());
    }

    #[test]
    fn missing_result_is_an_error() {
        let err = decode_response::<u64>("getBalance", br#"{"jsonrpc":"2.0","id":1}"#).unwrap_err();
        assert!(matches!(err, Error::Rpc { code: 0, .. }));
    }

    #[test]
    fn decodes_base64_accounts_and_gaps() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":3},"value":[
            {"data":["BAUG","base64"],"executable":false,"lamports":5616720,"owner":"metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s","rentEpoch":0},
            null
        ]}}"#;
        let accounts: WithContext<Vec<Option<EncodedAccount>>> =
            decode_response("getMultipleAccounts", body).unwrap();
        let data: Vec<Option<Vec<u8>>> = accounts
            .value
            .into_iter()
            .map(|account| account.map(account_data).transpose())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(data, vec![Some(vec![4, 5, 6]), None]);
    }

    #[test]
    fn decodes_blockhash_and_mint_decimals() {
        let body = br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":2792},"value":{
            "blockhash":"EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N","lastValidBlockHeight":3090}}}"#;
        let latest: WithContext<LatestBlockhash> = decode_response("getLatestBlockhash", body).unwrap();
        assert!(decode_32(&latest.value.blockhash, "blockhash").is_ok());

        let body = br#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":5},"value":{
            "data":{"parsed":{"info":{"decimals":6,"freezeAuthority":null,"isInitialized":true,
            "mintAuthority":"me","supply":"1000000000"},"type":"mint"},"program":"spl-token","space":82},
            "executable":false,"lamports":1461600,"owner":"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"}}}"#;
        let mint: WithContext<Option<MintAccount>> = decode_response("getAccountInfo", body).unwrap();
        assert_eq!(mint.value.map(|m| m.data.parsed.info.decimals), Some(6));
    }
}
