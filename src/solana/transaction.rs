//! Legacy Solana transactions: compile instructions into a message, sign it,
//! and produce the wire bytes `sendTransaction` expects.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::pubkey::Pubkey;
use crate::error::{Error, Result};
use crate::identity::WalletIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompiledInstruction {
    program_id_index: u8,
    accounts: Vec<u8>,
    data: Vec<u8>,
}

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// `[required signatures, read-only signed, read-only unsigned]`
    header: [u8; 3],
    account_keys: Vec<Pubkey>,
    recent_blockhash: [u8; 32],
    instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Orders accounts payer first, then writable signers, read-only signers,
    /// writable non-signers, read-only non-signers. Program ids are read-only
    /// non-signers unless an instruction also lists them otherwise.
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        recent_blockhash: [u8; 32],
    ) -> Result<Self> {
        let mut metas = vec![AccountMeta::writable(*payer, true)];
        let mut merge = |meta: AccountMeta| match metas.iter_mut().find(|m| m.pubkey == meta.pubkey) {
            Some(existing) => {
                existing.is_signer |= meta.is_signer;
                existing.is_writable |= meta.is_writable;
            }
            None => metas.push(meta),
        };
        for instruction in instructions {
            for meta in &instruction.accounts {
                merge(*meta);
            }
            merge(AccountMeta::readonly(instruction.program_id, false));
        }

        // Stable, so the payer stays in front of the other writable signers.
        metas.sort_by_key(|meta| (!meta.is_signer, !meta.is_writable));
        if metas.len() > usize::from(u8::MAX) {
            return Err(Error::InvalidInput(format!(
                "transaction touches {} accounts",
                metas.len()
            )));
        }

        let count = |f: fn(&AccountMeta) -> bool| metas.iter().filter(|m| f(m)).count() as u8;
        let header = [
            count(|m| m.is_signer),
            count(|m| m.is_signer && !m.is_writable),
            count(|m| !m.is_signer && !m.is_writable),
        ];
        let account_keys: Vec<Pubkey> = metas.iter().map(|m| m.pubkey).collect();
        let index_of = |key: &Pubkey| {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| Error::InvalidInput(format!("account {key} missing from message")))
        };

        let compiled = instructions
            .iter()
            .map(|instruction| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&instruction.program_id)?,
                    accounts: instruction
                        .accounts
                        .iter()
                        .map(|meta| index_of(&meta.pubkey))
                        .collect::<Result<_>>()?,
                    data: instruction.data.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys whose signatures the transaction needs, in signature order.
    pub fn signers(&self) -> &[Pubkey] {
        &self.account_keys[..usize::from(self.header[0])]
    }

    pub fn account_keys(&self) -> &[Pubkey] {
        &self.account_keys
    }

    pub fn header(&self) -> [u8; 3] {
        self.header
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + 32 * (self.account_keys.len() + 1));
        out.extend_from_slice(&self.header);
        encode_length(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(&self.recent_blockhash);
        encode_length(&mut out, self.instructions.len());
        for instruction in &self.instructions {
            out.push(instruction.program_id_index);
            encode_length(&mut out, instruction.accounts.len());
            out.extend_from_slice(&instruction.accounts);
            encode_length(&mut out, instruction.data.len());
            out.extend_from_slice(&instruction.data);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    signatures: Vec<Vec<u8>>,
    message: Message,
}

impl Transaction {
    /// Every key in [`Message::signers`] must be among `signers`.
    pub fn sign(message: Message, signers: &[&WalletIdentity]) -> Result<Self> {
        let bytes = message.serialize();
        let signatures = message
            .signers()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|identity| identity.public_key() == key.to_bytes())
                    .map(|identity| identity.sign_bytes(&bytes))
                    .ok_or_else(|| Error::Signature(format!("no keypair for signer {key}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            signatures,
            message,
        })
    }

    /// The first signature, base58. This is the transaction id.
    pub fn signature(&self) -> String {
        self.signatures
            .first()
            .map(|sig| bs58::encode(sig).into_string())
            .unwrap_or_default()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_length(&mut out, self.signatures.len());
        for signature in &self.signatures {
            out.extend_from_slice(signature);
        }
        out.extend_from_slice(&self.message.serialize());
        out
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.serialize())
    }
}

/// Compact-u16 length prefix: 7 bits per byte, high bit means more follows.
fn encode_length(out: &mut Vec<u8>, len: usize) {
    let mut rem = len;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}
