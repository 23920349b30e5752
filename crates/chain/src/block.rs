//! Blocks of the simulated chain.

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A block in the simulated chain, indexed by height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u32,
    pub timestamp: u64,

    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Creates a block at the given height.
    pub fn new(index: u32, timestamp: u64, transactions: Vec<Transaction>) -> Self {
        Self {
            index,
            timestamp,
            transactions,
        }
    }

    /// Returns the block hash: SHA256d over index, timestamp and the
    /// transaction hashes.
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        for tx in &self.transactions {
            hasher.update(tx.hash());
        }
        Sha256::digest(hasher.finalize()).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_depends_on_content() {
        let a = Block::new(0, 100, Vec::new());
        let b = Block::new(1, 100, Vec::new());
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), Block::new(0, 100, Vec::new()).hash());
    }
}
