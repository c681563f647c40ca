//! Wallet actions that move value: SOL transfers, SPL token transfers and
//! creating a new token mint.
//!
//! Each action is split into a pure planning step that validates input and
//! builds the instructions, and an async step that signs, submits and waits
//! for confirmation.

use super::address::{parse_address, to_base_units};
use super::instructions::{
    MINT_SIZE, create_account, create_associated_token_account, initialize_mint, mint_to,
    system_transfer, token_transfer,
};
use super::pubkey::{Pubkey, TOKEN_PROGRAM};
use super::rpc::RpcClient;
use super::transaction::{Instruction, Message, Transaction};
use crate::error::{Error, Result};
use crate::identity::WalletIdentity;

/// Largest `decimals` the mint form accepts.
pub const MAX_DECIMALS: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedToken {
    pub mint: String,
    pub token_account: String,
    pub signature: String,
}

/// Parses a transfer destination; the payer's own address is refused.
pub fn check_recipient(payer: &Pubkey, to: &str) -> Result<Pubkey> {
    let to: Pubkey = parse_address(to)?.parse()?;
    if &to == payer {
        return Err(Error::InvalidInput("cannot send to your own wallet".to_string()));
    }
    Ok(to)
}

pub fn plan_sol_transfer(payer: &Pubkey, to: &str, lamports: u64) -> Result<Vec<Instruction>> {
    if lamports == 0 {
        return Err(Error::InvalidInput("amount must be positive".to_string()));
    }
    let to = check_recipient(payer, to)?;
    Ok(vec![system_transfer(payer, &to, lamports)])
}

/// Creates the recipient's token account when missing, then transfers from
/// the payer's associated account.
pub fn plan_token_transfer(
    payer: &Pubkey,
    mint: &Pubkey,
    to: &str,
    amount: u64,
) -> Result<Vec<Instruction>> {
    let to = check_recipient(payer, to)?;
    let source = Pubkey::associated_token_address(payer, mint)?;
    let destination = Pubkey::associated_token_address(&to, mint)?;
    Ok(vec![
        create_associated_token_account(payer, &destination, &to, mint),
        token_transfer(&source, &destination, payer, amount),
    ])
}

/// Allocates and initializes `mint` with `payer` as mint authority, opens the
/// payer's token account and mints `supply` base units into it.
pub fn plan_token_creation(
    payer: &Pubkey,
    mint: &Pubkey,
    rent_lamports: u64,
    decimals: u8,
    supply: u64,
) -> Result<(Vec<Instruction>, Pubkey)> {
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidInput(format!(
            "decimals must be at most {MAX_DECIMALS}"
        )));
    }
    let token_account = Pubkey::associated_token_address(payer, mint)?;
    let instructions = vec![
        create_account(payer, mint, rent_lamports, MINT_SIZE, &TOKEN_PROGRAM),
        initialize_mint(mint, decimals, payer),
        create_associated_token_account(payer, &token_account, payer, mint),
        mint_to(mint, &token_account, payer, supply),
    ];
    Ok((instructions, token_account))
}

fn wallet_key(identity: &WalletIdentity) -> Pubkey {
    Pubkey::new(identity.public_key())
}

/// Signs with a fresh blockhash, submits, and waits for confirmation.
async fn submit(
    rpc: &RpcClient,
    payer: &WalletIdentity,
    instructions: &[Instruction],
    extra_signers: &[&WalletIdentity],
) -> Result<String> {
    let blockhash = rpc.get_latest_blockhash().await?;
    let message = Message::compile(&wallet_key(payer), instructions, blockhash)?;
    let mut signers = vec![payer];
    signers.extend_from_slice(extra_signers);
    let transaction = Transaction::sign(message, &signers)?;
    let signature = rpc.send_transaction(&transaction).await?;
    rpc.confirm_signature(&signature).await?;
    Ok(signature)
}

pub async fn send_sol(
    rpc: &RpcClient,
    payer: &WalletIdentity,
    to: &str,
    lamports: u64,
) -> Result<String> {
    let instructions = plan_sol_transfer(&wallet_key(payer), to, lamports)?;
    let signature = submit(rpc, payer, &instructions, &[]).await?;
    log::info!("Sent {lamports} lamports to {}: {signature}", to.trim());
    Ok(signature)
}

/// `amount` is in whole tokens; the mint's decimals are looked up first.
pub async fn send_token(
    rpc: &RpcClient,
    payer: &WalletIdentity,
    mint: &str,
    to: &str,
    amount: f64,
) -> Result<String> {
    let mint_key: Pubkey = parse_address(mint)?.parse()?;
    let decimals = rpc.get_mint_decimals(&mint_key.to_string()).await?;
    let base_units = to_base_units(amount, decimals)?;
    let instructions = plan_token_transfer(&wallet_key(payer), &mint_key, to, base_units)?;
    let signature = submit(rpc, payer, &instructions, &[]).await?;
    log::info!("Sent {amount} of {mint_key} to {}: {signature}", to.trim());
    Ok(signature)
}

/// One transaction: the new mint keypair co-signs its own account creation.
pub async fn create_token(
    rpc: &RpcClient,
    payer: &WalletIdentity,
    decimals: u8,
    supply: f64,
) -> Result<CreatedToken> {
    let supply = to_base_units(supply, decimals)?;
    let mint = WalletIdentity::generate();
    let mint_key = wallet_key(&mint);
    let rent = rpc.get_minimum_balance_for_rent_exemption(MINT_SIZE).await?;
    let (instructions, token_account) =
        plan_token_creation(&wallet_key(payer), &mint_key, rent, decimals, supply)?;
    let signature = submit(rpc, payer, &instructions, &[&mint]).await?;
    log::info!("Created token mint {mint_key} with {supply} base units: {signature}");
    Ok(CreatedToken {
        mint: mint_key.to_string(),
        token_account: token_account.to_string(),
        signature,
    })
}
