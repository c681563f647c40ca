//! Wallet addresses the user keeps an eye on, persisted as a JSON array.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::solana::parse_address;
use crate::storage::ensure_parent_dir;

#[derive(Debug)]
pub struct Watchlist {
    path: PathBuf,
    entries: Vec<String>,
}

impl Watchlist {
    /// Missing or unreadable files start an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        Self { path, entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.iter().any(|entry| entry == address.trim())
    }

    /// Returns `false` if the address was already watched.
    pub fn add(&mut self, address: &str) -> Result<bool> {
        let address = parse_address(address)?;
        if self.contains(&address) {
            return Ok(false);
        }
        self.entries.push(address);
        self.persist()?;
        Ok(true)
    }

    pub fn remove(&mut self, address: &str) -> Result<bool> {
        let address = address.trim();
        let before = self.entries.len();
        self.entries.retain(|entry| entry != address);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn persist(&self) -> Result<()> {
        ensure_parent_dir(&self.path)?;
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
            Ok(list) => list,
            Err(err) => {
                log::warn!("Failed to parse watchlist {}: {err}", path.display());
                Vec::new()
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            log::warn!("Failed to read watchlist {}: {err}", path.display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const ADDR: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const OTHER: &str = "11111111111111111111111111111111";

    #[test]
    fn survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/watchlist.json");

        let mut list = Watchlist::load(&path);
        assert!(list.entries().is_empty());
        assert!(list.add(&format!("  {ADDR} ")).unwrap());
        assert!(list.add(OTHER).unwrap());

        let reloaded = Watchlist::load(&path);
        assert_eq!(reloaded.entries(), &[ADDR.to_string(), OTHER.to_string()]);
    }

    #[test]
    fn rejects_duplicates_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = Watchlist::load(dir.path().join("w.json"));
        assert!(list.add(ADDR).unwrap());
        assert!(!list.add(ADDR).unwrap());
        assert!(matches!(list.add("   "), Err(Error::InvalidInput(_))));
        assert!(matches!(list.add("not-an-address"), Err(Error::InvalidInput(_))));
        assert_eq!(list.entries().len(), 1);
    }

    #[test]
    fn remove_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        let mut list = Watchlist::load(&path);
        list.add(ADDR).unwrap();
        assert!(list.remove(ADDR).unwrap());
        assert!(!list.remove(ADDR).unwrap());
        assert!(Watchlist::load(&path).entries().is_empty());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Watchlist::load(&path).entries().is_empty());
    }
}
