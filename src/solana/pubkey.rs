//! 32-byte account addresses, program ids and program-derived addresses.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";
const MAX_SEED_LEN: usize = 32;
const MAX_SEEDS: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; 32]);

pub const SYSTEM_PROGRAM: Pubkey = Pubkey([0; 32]);
pub const TOKEN_PROGRAM: Pubkey = Pubkey::from_str_const(super::address::TOKEN_PROGRAM_ID);
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey =
    Pubkey::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decodes a base58 literal at compile time. Panics (at compile time when
    /// used in a `const`) on anything that is not 32 bytes of base58.
    pub const fn from_str_const(text: &str) -> Self {
        Self(bs58::decode(text.as_bytes()).into_array_const_unwrap())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// True when the bytes are a valid ed25519 point, i.e. a key someone could
    /// hold the secret for.
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }

    /// `sha256(seeds || program_id || "ProgramDerivedAddress")`, or `None` when
    /// the hash lands on the curve.
    pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Option<Pubkey> {
        if seeds.len() > MAX_SEEDS || seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
            return None;
        }
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update(program_id.as_bytes());
        hasher.update(PDA_MARKER);
        let address = Pubkey(hasher.finalize().into());
        (!address.is_on_curve()).then_some(address)
    }

    /// Highest bump seed (from 255 down) that gives an off-curve address.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
        if seeds.len() >= MAX_SEEDS {
            return Err(Error::InvalidInput(format!(
                "at most {} seeds fit next to the bump",
                MAX_SEEDS - 1
            )));
        }
        for bump in (0..=u8::MAX).rev() {
            let bump_seed = [bump];
            let mut with_bump = seeds.to_vec();
            with_bump.push(&bump_seed);
            if let Some(address) = Self::create_program_address(&with_bump, program_id) {
                return Ok((address, bump));
            }
        }
        Err(Error::InvalidInput(format!(
            "no program address found for program {program_id}"
        )))
    }

    /// The associated token account holding `mint` for `owner`.
    pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey> {
        let seeds: [&[u8]; 3] = [owner.as_bytes(), TOKEN_PROGRAM.as_bytes(), mint.as_bytes()];
        Self::find_program_address(&seeds, &ASSOCIATED_TOKEN_PROGRAM).map(|(address, _)| address)
    }
}

/// Decodes base58 text that must hold exactly 32 bytes (addresses, blockhashes).
pub fn decode_32(text: &str, what: &str) -> Result<[u8; 32]> {
    let text = text.trim();
    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| Error::InvalidInput(format!("{what} `{text}` is not base58: {e}")))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
        Error::InvalidInput(format!(
            "{what} `{text}` decodes to {} bytes, expected 32",
            bytes.len()
        ))
    })
}

impl FromStr for Pubkey {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        decode_32(text, "address").map(Pubkey)
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::WalletIdentity;

    #[test]
    fn program_ids_decode_and_print_back() {
        assert_eq!(SYSTEM_PROGRAM.to_string(), "11111111111111111111111111111111");
        assert_eq!(
            TOKEN_PROGRAM.to_string(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
        let parsed: Pubkey = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL".parse().unwrap();
        assert_eq!(parsed, ASSOCIATED_TOKEN_PROGRAM);
        assert!("abc".parse::<Pubkey>().is_err());
        assert!("0OIl".parse::<Pubkey>().is_err());
    }

    #[test]
    fn wallet_keys_are_on_the_curve() {
        let wallet: Pubkey = WalletIdentity::generate().address().parse().unwrap();
        assert!(wallet.is_on_curve());
    }

    #[test]
    fn derived_addresses_are_off_curve_and_stable() {
        let owner: Pubkey = WalletIdentity::generate().address().parse().unwrap();
        let mint: Pubkey = WalletIdentity::generate().address().parse().unwrap();

        let first = Pubkey::associated_token_address(&owner, &mint).unwrap();
        let again = Pubkey::associated_token_address(&owner, &mint).unwrap();
        assert_eq!(first, again);
        assert!(!first.is_on_curve());
        assert_ne!(first, Pubkey::associated_token_address(&mint, &owner).unwrap());

        let seeds: [&[u8]; 3] = [owner.as_bytes(), TOKEN_PROGRAM.as_bytes(), mint.as_bytes()];
        let (address, bump) = Pubkey::find_program_address(&seeds, &ASSOCIATED_TOKEN_PROGRAM).unwrap();
        let bump_seed = [bump];
        let with_bump: [&[u8]; 4] = [seeds[0], seeds[1], seeds[2], &bump_seed];
        assert_eq!(
            Pubkey::create_program_address(&with_bump, &ASSOCIATED_TOKEN_PROGRAM),
            Some(address)
        );
    }

    #[test]
    fn oversized_seeds_are_refused() {
        let long = [7u8; 33];
        let seeds: [&[u8]; 1] = [&long];
        assert_eq!(Pubkey::create_program_address(&seeds, &TOKEN_PROGRAM), None);
    }
}
