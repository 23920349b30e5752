//! Invocation arguments and their marshalling into loader bytecode.
//!
//! Arguments arrive as a generic tagged tree (typically parsed from JSON in
//! the artifact format). `emit` encodes one argument as pushes; the
//! emulator emits the whole list in reverse so the contract script finds
//! them in order.

use crate::error::{DebuggerError, DebuggerResult};
use neo_debugger_vm::ScriptBuilder;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A contract invocation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractArg {
    Null,
    Bool(bool),
    Int(BigInt),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<ContractArg>),
}

impl ContractArg {
    /// Parses an argument from the JSON artifact representation.
    pub fn from_json(value: &serde_json::Value) -> DebuggerResult<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(ContractArg::Null),
            Value::Bool(b) => Ok(ContractArg::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ContractArg::Int(BigInt::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Ok(ContractArg::Int(BigInt::from(u)))
                } else {
                    Err(DebuggerError::arg_marshal(format!(
                        "non-integer number {n}"
                    )))
                }
            }
            Value::String(s) => {
                // 0x-prefixed strings are byte arrays in the artifact format
                if let Some(hex_digits) = s.strip_prefix("0x") {
                    let bytes = hex::decode(hex_digits).map_err(|err| {
                        DebuggerError::arg_marshal(format!("bad hex string {s}: {err}"))
                    })?;
                    Ok(ContractArg::Bytes(bytes))
                } else {
                    Ok(ContractArg::String(s.clone()))
                }
            }
            Value::Array(values) => {
                let args = values
                    .iter()
                    .map(ContractArg::from_json)
                    .collect::<DebuggerResult<Vec<_>>>()?;
                Ok(ContractArg::List(args))
            }
            Value::Object(_) => Err(DebuggerError::arg_marshal(
                "objects are not encodable as contract arguments",
            )),
        }
    }

    /// Emits this argument onto a loader script.
    pub fn emit(&self, builder: &mut ScriptBuilder) {
        match self {
            ContractArg::Null => {
                builder.emit_push(&[]);
            }
            ContractArg::Bool(b) => {
                builder.emit_push_bool(*b);
            }
            ContractArg::Int(i) => {
                builder.emit_push_int(i);
            }
            ContractArg::String(s) => {
                builder.emit_push_string(s);
            }
            ContractArg::Bytes(bytes) => emit_byte_array(builder, bytes),
            ContractArg::List(items) => {
                // A list whose children are all bytes is the artifact
                // format's encoding of a byte array
                if let Some(bytes) = byte_array_of(items) {
                    emit_byte_array(builder, &bytes);
                    return;
                }
                for item in items.iter().rev() {
                    item.emit(builder);
                }
                builder.emit_pack(items.len());
            }
        }
    }
}

/// Byte arrays become a NEO array of single-byte integers: each byte is
/// pushed (in reverse, so element 0 is the first byte), then packed.
fn emit_byte_array(builder: &mut ScriptBuilder, bytes: &[u8]) {
    for byte in bytes.iter().rev() {
        builder.emit_push_int(&BigInt::from(*byte));
    }
    builder.emit_pack(bytes.len());
}

/// The byte-array detection heuristic: a non-empty list whose children are
/// all integers in 0..=255.
fn byte_array_of(items: &[ContractArg]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| match item {
            ContractArg::Int(i) => i.to_u8(),
            _ => None,
        })
        .collect()
}
