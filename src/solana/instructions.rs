//! Instruction builders for the System, SPL Token and Associated Token programs.

use super::pubkey::{ASSOCIATED_TOKEN_PROGRAM, Pubkey, SYSTEM_PROGRAM, TOKEN_PROGRAM};
use super::transaction::{AccountMeta, Instruction};

/// Bytes of an SPL mint account.
pub const MINT_SIZE: u64 = 82;

const SYSTEM_CREATE_ACCOUNT: u32 = 0;
const SYSTEM_TRANSFER: u32 = 2;

const TOKEN_TRANSFER: u8 = 3;
const TOKEN_MINT_TO: u8 = 7;
const TOKEN_INITIALIZE_MINT2: u8 = 20;

const ATA_CREATE_IDEMPOTENT: u8 = 1;

pub fn system_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    let mut data = SYSTEM_TRANSFER.to_le_bytes().to_vec();
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*to, false),
        ],
        data,
    }
}

pub fn create_account(
    payer: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    let mut data = SYSTEM_CREATE_ACCOUNT.to_le_bytes().to_vec();
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());
    Instruction {
        program_id: SYSTEM_PROGRAM,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*new_account, true),
        ],
        data,
    }
}

/// No freeze authority.
pub fn initialize_mint(mint: &Pubkey, decimals: u8, mint_authority: &Pubkey) -> Instruction {
    let mut data = vec![TOKEN_INITIALIZE_MINT2, decimals];
    data.extend_from_slice(mint_authority.as_bytes());
    data.push(0);
    Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![AccountMeta::writable(*mint, false)],
        data,
    }
}

pub fn mint_to(mint: &Pubkey, destination: &Pubkey, authority: &Pubkey, amount: u64) -> Instruction {
    let mut data = vec![TOKEN_MINT_TO];
    data.extend_from_slice(&amount.to_le_bytes());
    Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*authority, true),
        ],
        data,
    }
}

/// Moves `amount` base units between two token accounts of the same mint.
pub fn token_transfer(source: &Pubkey, destination: &Pubkey, owner: &Pubkey, amount: u64) -> Instruction {
    let mut data = vec![TOKEN_TRANSFER];
    data.extend_from_slice(&amount.to_le_bytes());
    Instruction {
        program_id: TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    }
}

/// Creates `owner`'s associated token account for `mint` if it does not exist yet.
pub fn create_associated_token_account(
    payer: &Pubkey,
    associated: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*associated, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM, false),
            AccountMeta::readonly(TOKEN_PROGRAM, false),
        ],
        data: vec![ATA_CREATE_IDEMPOTENT],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Pubkey {
        Pubkey::new([byte; 32])
    }

    #[test]
    fn create_account_data() {
        let ix = create_account(&key(1), &key(2), 1_461_600, MINT_SIZE, &TOKEN_PROGRAM);
        assert_eq!(ix.data.len(), 4 + 8 + 8 + 32);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(&ix.data[12..20], &82u64.to_le_bytes());
        assert_eq!(&ix.data[20..], TOKEN_PROGRAM.as_bytes());
        assert!(ix.accounts.iter().all(|m| m.is_signer && m.is_writable));
    }

    #[test]
    fn mint_instructions_data() {
        let init = initialize_mint(&key(2), 6, &key(1));
        assert_eq!(init.data[..2], [20, 6]);
        assert_eq!(&init.data[2..34], key(1).as_bytes());
        assert_eq!(init.data[34], 0);

        let mint = mint_to(&key(2), &key(3), &key(1), 1_000_000);
        assert_eq!(mint.data[0], 7);
        assert_eq!(&mint.data[1..], &1_000_000u64.to_le_bytes());
        assert!(mint.accounts[2].is_signer);
    }

    #[test]
    fn token_transfer_is_signed_by_owner_only() {
        let ix = token_transfer(&key(4), &key(5), &key(1), 42);
        assert_eq!(ix.data, [vec![3], 42u64.to_le_bytes().to_vec()].concat());
        let signers: Vec<_> = ix.accounts.iter().filter(|m| m.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, key(1));
    }

    #[test]
    fn associated_account_creation_is_idempotent_variant() {
        let ix = create_associated_token_account(&key(1), &key(6), &key(7), &key(8));
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM);
        assert_eq!(ix.data, vec![1]);
        assert_eq!(ix.accounts.len(), 6);
    }
}
