//! Wallet identity: the keypair behind a chat participant.
//!
//! Keys are ed25519, the same curve Solana wallets use, so a Solana CLI
//! keypair file (a JSON array of 64 bytes, secret half first) loads directly
//! and the base58 public key is the wallet address.

use std::fs;
use std::path::Path;

use libp2p::identity::{self, ed25519};

use crate::common::ChatRecord;
use crate::error::{Error, Result};

/// A connected wallet: public address plus signing capability.
#[derive(Clone)]
pub struct WalletIdentity {
    keypair: ed25519::Keypair,
    address: String,
}

impl std::fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("address", &self.address)
            .finish()
    }
}

impl WalletIdentity {
    pub fn generate() -> Self {
        Self::from_keypair(ed25519::Keypair::generate())
    }

    fn from_keypair(keypair: ed25519::Keypair) -> Self {
        let address = bs58::encode(keypair.public().to_bytes()).into_string();
        Self { keypair, address }
    }

    /// Load a Solana CLI keypair file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut bytes: Vec<u8> = serde_json::from_str(&content)?;
        if bytes.len() != 64 {
            return Err(Error::Config(format!(
                "keypair file {} holds {} bytes, expected 64",
                path.display(),
                bytes.len()
            )));
        }
        let keypair = ed25519::Keypair::try_from_bytes(&mut bytes)
            .map_err(|e| Error::Config(format!("invalid keypair in {}: {e}", path.display())))?;
        log::info!("Loaded wallet keypair from {}", path.display());
        Ok(Self::from_keypair(keypair))
    }

    /// Write this keypair in Solana CLI format. Refuses to overwrite.
    pub fn save(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::InvalidInput(format!(
                "{} already exists",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = self.keypair.to_bytes().to_vec();
        fs::write(path, serde_json::to_string(&bytes)?)?;
        Ok(())
    }

    /// Base58 public key.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Raw public key; the bytes behind [`WalletIdentity::address`].
    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public().to_bytes()
    }

    /// Detached ed25519 signature over `message`, as Solana transactions carry.
    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.keypair.sign(message)
    }

    /// The same key as a libp2p identity, for the relay transport.
    pub fn transport_keypair(&self) -> identity::Keypair {
        identity::Keypair::from(self.keypair.clone())
    }

    /// Signs `record` in place; overwrites any existing signature.
    pub fn sign(&self, record: &mut ChatRecord) {
        let signature = self.keypair.sign(&record.signing_bytes());
        record.signature = Some(bs58::encode(signature).into_string());
    }
}

/// Outcome of checking a record's signature against its claimed sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Missing,
    Invalid,
}

pub fn check_signature(record: &ChatRecord) -> SignatureCheck {
    let Some(signature) = record.signature.as_deref() else {
        return SignatureCheck::Missing;
    };
    match verify(record, signature) {
        Ok(true) => SignatureCheck::Valid,
        Ok(false) => SignatureCheck::Invalid,
        Err(err) => {
            log::debug!("Unreadable signature on record {}: {err}", record.id);
            SignatureCheck::Invalid
        }
    }
}

fn verify(record: &ChatRecord, signature: &str) -> Result<bool> {
    let key_bytes = bs58::decode(&record.sender)
        .into_vec()
        .map_err(|e| Error::Signature(format!("sender is not base58: {e}")))?;
    let public = ed25519::PublicKey::try_from_bytes(&key_bytes)
        .map_err(|e| Error::Signature(format!("sender is not an ed25519 key: {e}")))?;
    let signature = bs58::decode(signature)
        .into_vec()
        .map_err(|e| Error::Signature(format!("signature is not base58: {e}")))?;
    Ok(public.verify(&record.signing_bytes(), &signature))
}
