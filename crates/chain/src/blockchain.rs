//! The simulated blockchain document.
//!
//! A persistable collection of blocks and named addresses. The on-disk form
//! is a versioned JSON document; saving the same chain twice produces
//! byte-identical output.

use crate::address::Address;
use crate::block::Block;
use crate::error::{ChainError, ChainResult, CHAIN_FORMAT_VERSION};
use crate::transaction::Transaction;
use neo_debugger_vm::script_hash;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Timestamp of the genesis block of the simulated chain.
pub const GENESIS_TIMESTAMP: u64 = 1_468_595_301;

/// Seconds between synthesized blocks.
pub const SECONDS_PER_BLOCK: u64 = 15;

/// The simulated blockchain: ordered blocks plus named addresses.
///
/// Invariant: block heights form a contiguous sequence starting at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blockchain {
    version: u32,
    blocks: Vec<Block>,

    #[serde(default)]
    addresses: Vec<Address>,
}

impl Blockchain {
    /// Creates a chain containing only the genesis block.
    pub fn new() -> Self {
        Self {
            version: CHAIN_FORMAT_VERSION,
            blocks: vec![Block::new(0, GENESIS_TIMESTAMP, Vec::new())],
            addresses: Vec::new(),
        }
    }

    /// Loads a chain document, rejecting unknown versions.
    pub fn load(path: &Path) -> ChainResult<Self> {
        let text = fs::read_to_string(path)?;
        let chain: Blockchain = serde_json::from_str(&text)?;
        if chain.version != CHAIN_FORMAT_VERSION {
            return Err(ChainError::UnsupportedVersion {
                found: chain.version,
                expected: CHAIN_FORMAT_VERSION,
            });
        }
        if chain.blocks.is_empty() {
            return Err(ChainError::Malformed("chain has no blocks".to_string()));
        }
        for (height, block) in chain.blocks.iter().enumerate() {
            if block.index as usize != height {
                return Err(ChainError::Malformed(format!(
                    "block at height {height} has index {}",
                    block.index
                )));
            }
        }
        tracing::debug!(
            path = %path.display(),
            height = chain.current_height(),
            addresses = chain.addresses.len(),
            "loaded chain"
        );
        Ok(chain)
    }

    /// Saves the chain document. Output is deterministic for a given chain.
    pub fn save(&self, path: &Path) -> ChainResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        tracing::debug!(path = %path.display(), "saved chain");
        Ok(())
    }

    /// Returns the current height (index of the last block).
    pub fn current_height(&self) -> u32 {
        (self.blocks.len() - 1) as u32
    }

    /// Returns the block at the current height.
    pub fn current_block(&self) -> &Block {
        self.blocks.last().expect("chain always has a genesis block")
    }

    /// Returns the block at `height`, if present.
    pub fn block(&self, height: u32) -> Option<&Block> {
        self.blocks.get(height as usize)
    }

    /// Returns all blocks, ordered by height.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block at the next height and returns it.
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> &Block {
        let index = self.blocks.len() as u32;
        let timestamp = self.current_block().timestamp + SECONDS_PER_BLOCK;
        self.blocks.push(Block::new(index, timestamp, transactions));
        self.current_block()
    }

    /// Deploys contract bytecode under `name`, deriving the script hash from
    /// the bytes. Redeploying under an existing name updates the bytecode in
    /// place. Returns the deployed address.
    pub fn deploy_contract(&mut self, name: &str, byte_code: Vec<u8>) -> &Address {
        let hash = script_hash(&byte_code);
        if let Some(position) = self.addresses.iter().position(|a| a.name() == name) {
            self.addresses[position].redeploy(hash, byte_code);
            tracing::info!(name, "redeployed contract");
            return &self.addresses[position];
        }
        tracing::info!(name, hash = hex::encode(&hash), "deployed contract");
        self.addresses
            .push(Address::new_contract(name, hash, byte_code));
        self.addresses.last().expect("address was just pushed")
    }

    /// Finds an address by name.
    pub fn find_address_by_name(&self, name: &str) -> Option<&Address> {
        self.addresses.iter().find(|a| a.name() == name)
    }

    /// Finds an address by name (mutable).
    pub fn find_address_by_name_mut(&mut self, name: &str) -> Option<&mut Address> {
        self.addresses.iter_mut().find(|a| a.name() == name)
    }

    /// Finds an address by script hash.
    pub fn find_address_by_script_hash(&self, script_hash: &[u8]) -> Option<&Address> {
        self.addresses.iter().find(|a| a.script_hash() == script_hash)
    }

    /// Finds an address by script hash (mutable).
    pub fn find_address_by_script_hash_mut(&mut self, script_hash: &[u8]) -> Option<&mut Address> {
        self.addresses
            .iter_mut()
            .find(|a| a.script_hash() == script_hash)
    }

    /// Returns all addresses.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chain_has_genesis() {
        let chain = Blockchain::new();
        assert_eq!(chain.current_height(), 0);
        assert_eq!(chain.current_block().index, 0);
        assert_eq!(chain.current_block().timestamp, GENESIS_TIMESTAMP);
    }

    #[test]
    fn test_heights_are_contiguous() {
        let mut chain = Blockchain::new();
        chain.add_block(Vec::new());
        chain.add_block(Vec::new());
        assert_eq!(chain.current_height(), 2);
        for (height, block) in chain.blocks().iter().enumerate() {
            assert_eq!(block.index as usize, height);
        }
    }

    #[test]
    fn test_deploy_and_find() {
        let mut chain = Blockchain::new();
        let hash = chain.deploy_contract("token", vec![0x51, 0x66]).script_hash().to_vec();
        assert_eq!(hash, script_hash(&[0x51, 0x66]));

        assert!(chain.find_address_by_name("token").is_some());
        assert!(chain.find_address_by_name("missing").is_none());
        assert!(chain.find_address_by_script_hash(&hash).is_some());
    }

    #[test]
    fn test_redeploy_updates_in_place() {
        let mut chain = Blockchain::new();
        chain.deploy_contract("token", vec![0x51, 0x66]);
        chain.deploy_contract("token", vec![0x52, 0x66]);
        assert_eq!(chain.addresses().len(), 1);
        assert_eq!(
            chain.find_address_by_name("token").unwrap().byte_code(),
            Some(&[0x52, 0x66][..])
        );
    }

    #[test]
    fn test_save_load_save_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.chain");

        let mut chain = Blockchain::new();
        chain.deploy_contract("token", vec![0x51, 0x66]);
        chain
            .find_address_by_name_mut("token")
            .unwrap()
            .storage_put(b"key", b"value");
        chain.add_block(Vec::new());
        chain.save(&path).unwrap();
        let first = std::fs::read(&path).unwrap();

        let loaded = Blockchain::load(&path).unwrap();
        loaded.save(&path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.chain");
        std::fs::write(
            &path,
            r#"{"version": 99, "blocks": [{"index": 0, "timestamp": 1}]}"#,
        )
        .unwrap();
        assert!(matches!(
            Blockchain::load(&path),
            Err(ChainError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_load_rejects_gapped_heights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gap.chain");
        std::fs::write(
            &path,
            r#"{"version": 1, "blocks": [{"index": 0, "timestamp": 1}, {"index": 2, "timestamp": 2}]}"#,
        )
        .unwrap();
        assert!(matches!(
            Blockchain::load(&path),
            Err(ChainError::Malformed(_))
        ));
    }
}
