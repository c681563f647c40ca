use crate::error::{Error, Result};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// SPL Token program id.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Check that `address` is base58 text of a 32-byte key. Returns it trimmed.
pub fn parse_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::InvalidInput("wallet address is empty".to_string()));
    }
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| Error::InvalidInput(format!("`{address}` is not base58: {e}")))?;
    if bytes.len() != 32 {
        return Err(Error::InvalidInput(format!(
            "`{address}` decodes to {} bytes, expected 32",
            bytes.len()
        )));
    }
    Ok(address.to_string())
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn sol_to_lamports(sol: f64) -> Result<u64> {
    if !sol.is_finite() || sol <= 0.0 {
        return Err(Error::InvalidInput(format!("{sol} is not a positive SOL amount")));
    }
    Ok((sol * LAMPORTS_PER_SOL as f64).round() as u64)
}

/// `amount` tokens as base units of a mint with `decimals` places.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidInput(format!("{amount} is not a positive token amount")));
    }
    let scaled = (amount * 10f64.powi(i32::from(decimals))).round();
    if scaled < 1.0 || scaled >= u64::MAX as f64 {
        return Err(Error::InvalidInput(format!(
            "{amount} does not fit a token with {decimals} decimals"
        )));
    }
    Ok(scaled as u64)
}

pub fn explorer_url(address: &str) -> String {
    format!("https://solscan.io/account/{address}")
}
