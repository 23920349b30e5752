//! Script representation for the Neo debugger VM.

use crate::instruction::Instruction;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Number of bytes in a contract script hash.
pub const SCRIPT_HASH_SIZE: usize = 20;

/// An immutable byte sequence with cached instruction boundaries.
///
/// Offsets are absolute byte positions into the script. The boundary cache
/// covers the longest prefix of the script that parses cleanly; a malformed
/// tail is reported when execution reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    bytes: Vec<u8>,
    hash: Vec<u8>,
    offsets: Vec<usize>,
}

impl Script {
    /// Creates a new script from raw bytecode.
    pub fn new(bytes: Vec<u8>) -> Self {
        let hash = script_hash(&bytes);
        let offsets = instruction_boundaries(&bytes);
        Self {
            bytes,
            hash,
            offsets,
        }
    }

    /// Returns the raw bytecode.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the script length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the script is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the 20-byte script hash (RIPEMD160 of SHA256 of the bytes).
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    /// Returns the cached instruction start offsets.
    pub fn instruction_offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Returns `true` when `offset` is the start of an instruction.
    pub fn is_instruction_start(&self, offset: usize) -> bool {
        self.offsets.binary_search(&offset).is_ok()
    }
}

impl From<&[u8]> for Script {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

/// Computes the 20-byte script hash of raw bytecode.
pub fn script_hash(bytes: &[u8]) -> Vec<u8> {
    let sha = Sha256::digest(bytes);
    Ripemd160::digest(sha).to_vec()
}

fn instruction_boundaries(bytes: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut position = 0;
    while position < bytes.len() {
        offsets.push(position);
        match Instruction::parse(bytes, position) {
            Ok(instruction) => position += instruction.size(),
            Err(_) => break,
        }
    }
    offsets
}
