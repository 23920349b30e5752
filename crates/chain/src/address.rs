//! Simulated on-chain accounts.

use crate::hex_serde;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named account in the simulated chain: a deployed contract with its
/// bytecode and key/value storage, or a plain keypair holder.
///
/// Storage keys and values are arbitrary byte arrays, kept hex-encoded and
/// in insertion order so the persisted document is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    name: String,

    #[serde(with = "hex_serde")]
    script_hash: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_serde::opt")]
    keypair: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_serde::opt")]
    byte_code: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    storage: IndexMap<String, String>,
}

impl Address {
    /// Creates a contract address with deployed bytecode.
    pub fn new_contract(name: &str, script_hash: Vec<u8>, byte_code: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            script_hash,
            keypair: None,
            byte_code: Some(byte_code),
            storage: IndexMap::new(),
        }
    }

    /// Returns the account name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the 20-byte script hash.
    pub fn script_hash(&self) -> &[u8] {
        &self.script_hash
    }

    /// Returns the deployed bytecode, if any.
    pub fn byte_code(&self) -> Option<&[u8]> {
        self.byte_code.as_deref()
    }

    /// Replaces the deployed bytecode and script hash.
    pub fn redeploy(&mut self, script_hash: Vec<u8>, byte_code: Vec<u8>) {
        self.script_hash = script_hash;
        self.byte_code = Some(byte_code);
    }

    /// Returns the keypair bytes, if any.
    pub fn keypair(&self) -> Option<&[u8]> {
        self.keypair.as_deref()
    }

    /// Attaches keypair bytes.
    pub fn set_keypair(&mut self, keypair: Vec<u8>) {
        self.keypair = Some(keypair);
    }

    /// Reads a storage value.
    pub fn storage_get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.storage
            .get(&hex::encode(key))
            .map(|value| hex::decode(value).unwrap_or_default())
    }

    /// Writes a storage value, replacing any previous one.
    pub fn storage_put(&mut self, key: &[u8], value: &[u8]) {
        self.storage.insert(hex::encode(key), hex::encode(value));
    }

    /// Deletes a storage value.
    pub fn storage_delete(&mut self, key: &[u8]) {
        self.storage.shift_remove(&hex::encode(key));
    }

    /// Returns all storage entries in insertion order.
    pub fn storage_entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.storage
            .iter()
            .map(|(key, value)| {
                (
                    hex::decode(key).unwrap_or_default(),
                    hex::decode(value).unwrap_or_default(),
                )
            })
            .collect()
    }
}
