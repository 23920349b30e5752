//! Transactions used as VM script containers.

use crate::hex_serde;
use neo_debugger_vm::ScriptContainer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A reference to a previous transaction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(with = "hex_serde")]
    pub prev_hash: Vec<u8>,
    pub prev_index: u16,
}

/// A transfer of an asset to a script hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    #[serde(with = "hex_serde")]
    pub asset_id: Vec<u8>,
    pub amount: f64,
    #[serde(with = "hex_serde")]
    pub to_script_hash: Vec<u8>,
}

/// The signed message the VM executes against. Interop handlers reach it
/// through the engine's script-container handle and downcast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub inputs: Vec<TransactionInput>,

    #[serde(default)]
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transaction carrying the given outputs.
    pub fn with_outputs(outputs: Vec<TransactionOutput>) -> Self {
        Self {
            inputs: Vec::new(),
            outputs,
        }
    }

    /// Returns the transaction hash: SHA256d over the serialized content.
    pub fn hash(&self) -> Vec<u8> {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        Sha256::digest(Sha256::digest(encoded)).to_vec()
    }
}

impl ScriptContainer for Transaction {
    fn container_hash(&self) -> Vec<u8> {
        self.hash()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let tx = Transaction::with_outputs(vec![TransactionOutput {
            asset_id: vec![0xAA; 32],
            amount: 1.5,
            to_script_hash: vec![0x11; 20],
        }]);
        assert_eq!(tx.hash(), tx.hash());
        assert_eq!(tx.hash().len(), 32);
        assert_ne!(tx.hash(), Transaction::new().hash());
    }

    #[test]
    fn test_container_downcast() {
        let tx = Transaction::new();
        let container: &dyn ScriptContainer = &tx;
        assert!(container.as_any().downcast_ref::<Transaction>().is_some());
    }
}
