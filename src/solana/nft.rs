//! NFTs held by a wallet, read from Metaplex token metadata accounts.

use super::pubkey::Pubkey;
use super::rpc::RpcClient;
use crate::error::{Error, Result};

pub const METADATA_PROGRAM: Pubkey =
    Pubkey::from_str_const("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Account discriminator of a `MetadataV1` account.
const METADATA_V1: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftSummary {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    /// Off-chain JSON (image and attributes) location.
    pub uri: String,
}

pub fn metadata_address(mint: &Pubkey) -> Result<Pubkey> {
    let seeds: [&[u8]; 3] = [b"metadata", METADATA_PROGRAM.as_bytes(), mint.as_bytes()];
    Pubkey::find_program_address(&seeds, &METADATA_PROGRAM).map(|(address, _)| address)
}

/// Reads the fixed prefix of a metadata account: key, update authority, mint,
/// then the length-prefixed name, symbol and uri. The on-chain strings are
/// padded with NULs.
pub fn parse_metadata(data: &[u8]) -> Result<NftSummary> {
    let mut reader = Reader { data, offset: 0 };
    let key = reader.take(1)?[0];
    if key != METADATA_V1 {
        return Err(malformed(format!("account key {key} is not MetadataV1")));
    }
    reader.take(32)?;
    let mint = Pubkey::new(reader.array()?);
    let name = reader.string()?;
    let symbol = reader.string()?;
    let uri = reader.string()?;
    Ok(NftSummary {
        mint: mint.to_string(),
        name,
        symbol,
        uri,
    })
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| malformed(format!("truncated at byte {}", self.offset)))?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn array(&mut self) -> Result<[u8; 32]> {
        let mut out = [0; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn string(&mut self) -> Result<String> {
        let mut len = [0; 4];
        len.copy_from_slice(self.take(4)?);
        let bytes = self.take(u32::from_le_bytes(len) as usize)?;
        let text = std::str::from_utf8(bytes).map_err(|e| malformed(e.to_string()))?;
        Ok(text.trim_end_matches('\0').to_string())
    }
}

fn malformed(detail: String) -> Error {
    Error::Rpc {
        code: 0,
        message: format!("malformed token metadata: {detail}"),
    }
}

/// Token accounts with amount 1 and zero decimals whose mint has a metadata
/// account. Mints without one are skipped.
pub async fn load_nfts(rpc: &RpcClient, owner: &str) -> Result<Vec<NftSummary>> {
    let mints: Vec<Pubkey> = rpc
        .get_token_balances(owner)
        .await?
        .into_iter()
        .filter(|balance| balance.decimals == 0 && balance.amount == 1.0)
        .map(|balance| balance.mint.parse())
        .collect::<Result<_>>()?;

    let metadata_accounts = mints
        .iter()
        .map(|mint| metadata_address(mint).map(|address| address.to_string()))
        .collect::<Result<Vec<_>>>()?;
    let accounts = rpc.get_multiple_accounts(&metadata_accounts).await?;

    let mut nfts = Vec::new();
    for (mint, data) in mints.iter().zip(accounts) {
        let Some(data) = data else {
            log::debug!("Mint {mint} has no token metadata");
            continue;
        };
        match parse_metadata(&data) {
            Ok(nft) => nfts.push(nft),
            Err(err) => log::warn!("Skipping NFT {mint}: {err}"),
        }
    }
    log::info!("Found {} NFTs for {owner}", nfts.len());
    Ok(nfts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::WalletIdentity;

    fn padded(text: &str, width: usize) -> Vec<u8> {
        let mut out = (width as u32).to_le_bytes().to_vec();
        out.extend_from_slice(text.as_bytes());
        out.resize(4 + width, 0);
        out
    }

    fn metadata_bytes(mint: &Pubkey) -> Vec<u8> {
        let mut data = vec![METADATA_V1];
        data.extend_from_slice(&[3; 32]);
        data.extend_from_slice(mint.as_bytes());
        data.extend(padded("Degen Ape #1", 32));
        data.extend(padded("DAPE", 10));
        data.extend(padded("https://arweave.net/abc", 200));
        // seller fee basis points and the rest of the account follow
        data.extend_from_slice(&[0xf4, 0x01, 0]);
        data
    }

    #[test]
    fn parses_metadata_prefix() {
        let mint = Pubkey::new(WalletIdentity::generate().public_key());
        let nft = parse_metadata(&metadata_bytes(&mint)).unwrap();
        assert_eq!(
            nft,
            NftSummary {
                mint: mint.to_string(),
                name: "Degen Ape #1".into(),
                symbol: "DAPE".into(),
                uri: "https://arweave.net/abc".into(),
            }
        );
    }

    #[test]
    fn truncated_or_foreign_accounts_are_errors() {
        let mint = Pubkey::new([8; 32]);
        let data = metadata_bytes(&mint);
        assert!(parse_metadata(&data[..80]).is_err());

        let mut edition = data.clone();
        edition[0] = 6;
        assert!(parse_metadata(&edition).is_err());

        let mut huge = data;
        huge[65..69].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(parse_metadata(&huge).is_err());
    }

    #[test]
    fn metadata_address_depends_on_mint() {
        let a = metadata_address(&Pubkey::new([1; 32])).unwrap();
        let b = metadata_address(&Pubkey::new([2; 32])).unwrap();
        assert_ne!(a, b);
        assert!(!a.is_on_curve());
    }
}
