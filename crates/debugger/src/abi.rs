//! Contract ABI: declared entry point and function signatures.
//!
//! Parsed from the optional `.abi.json` artifact next to the `.avm`.

use crate::error::{DebuggerError, DebuggerResult};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Parameter and return types declared by a contract ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AbiType {
    Void,
    Boolean,
    Integer,
    ByteArray,
    String,
    Array,
    PublicKey,
    Signature,
    Hash160,
    Hash256,
    InteropInterface,
}

/// A named, typed parameter of an ABI function.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub parameter_type: AbiType,
}

/// One declared contract function.
#[derive(Debug, Clone, Deserialize)]
pub struct AbiFunction {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<AbiParameter>,

    #[serde(default = "default_return_type")]
    pub returntype: AbiType,
}

fn default_return_type() -> AbiType {
    AbiType::Void
}

/// The declared interface of a contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractAbi {
    pub entrypoint: String,

    #[serde(default)]
    pub functions: Vec<AbiFunction>,
}

impl ContractAbi {
    /// Loads an `.abi.json` artifact.
    pub fn load(path: &Path) -> DebuggerResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| DebuggerError::load(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|err| DebuggerError::load(format!("{}: {err}", path.display())))
    }

    /// Returns the entry-point function declaration, if present.
    pub fn entry_function(&self) -> Option<&AbiFunction> {
        self.functions
            .iter()
            .find(|function| function.name == self.entrypoint)
    }

    /// Returns a function declaration by name.
    pub fn function(&self, name: &str) -> Option<&AbiFunction> {
        self.functions.iter().find(|function| function.name == name)
    }
}
