//! Script builder for the Neo debugger VM.
//!
//! Constructs bytecode programmatically; the emulator uses it to build the
//! loader scripts that supply invocation arguments.

use crate::interop_service::MAX_SYSCALL_NAME_LEN;
use crate::op_code::OpCode;
use crate::script::{Script, SCRIPT_HASH_SIZE};
use crate::stack_item::int_to_bytes;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Helps construct VM scripts programmatically.
#[derive(Debug, Default)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    /// Creates a new script builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a single raw byte.
    pub fn emit(&mut self, byte: u8) -> &mut Self {
        self.script.push(byte);
        self
    }

    /// Emits an opcode.
    pub fn emit_opcode(&mut self, op: OpCode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Emits a data push using the shortest encoding: PUSHBYTES for up to
    /// 75 bytes, then PUSHDATA1/2/4.
    pub fn emit_push(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len <= OpCode::PUSHBYTES75 as usize {
            self.emit(len as u8);
        } else if len <= 0xFF {
            self.emit_opcode(OpCode::PUSHDATA1);
            self.emit(len as u8);
        } else if len <= 0xFFFF {
            self.emit_opcode(OpCode::PUSHDATA2);
            self.script.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.emit_opcode(OpCode::PUSHDATA4);
            self.script.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.script.extend_from_slice(data);
        self
    }

    /// Emits an integer push, using the PUSHM1/PUSH0..PUSH16 shortcuts when
    /// possible and the minimal signed little-endian encoding otherwise.
    pub fn emit_push_int(&mut self, value: &BigInt) -> &mut Self {
        if let Some(small) = value.to_i32() {
            if small == -1 {
                return self.emit_opcode(OpCode::PUSHM1);
            }
            if small == 0 {
                return self.emit_opcode(OpCode::PUSH0);
            }
            if (1..=16).contains(&small) {
                self.emit(OpCode::PUSH1 as u8 + (small as u8 - 1));
                return self;
            }
        }
        let bytes = int_to_bytes(value);
        self.emit_push(&bytes)
    }

    /// Emits a boolean push (PUSHT/PUSHF).
    pub fn emit_push_bool(&mut self, value: bool) -> &mut Self {
        if value {
            self.emit_opcode(OpCode::PUSH1)
        } else {
            self.emit_opcode(OpCode::PUSH0)
        }
    }

    /// Emits a string push of the UTF-8 bytes.
    pub fn emit_push_string(&mut self, value: &str) -> &mut Self {
        self.emit_push(value.as_bytes())
    }

    /// Emits a jump-family instruction with a 2-byte signed offset relative
    /// to the instruction start.
    pub fn emit_jump(&mut self, op: OpCode, offset: i16) -> &mut Self {
        debug_assert!(
            matches!(
                op,
                OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT | OpCode::CALL
            ),
            "not a jump opcode"
        );
        self.emit_opcode(op);
        self.script.extend_from_slice(&offset.to_le_bytes());
        self
    }

    /// Emits a SYSCALL of the named interop.
    pub fn emit_syscall(&mut self, api: &str) -> &mut Self {
        let bytes = api.as_bytes();
        debug_assert!(bytes.len() <= MAX_SYSCALL_NAME_LEN, "syscall name too long");
        self.emit_opcode(OpCode::SYSCALL);
        self.emit(bytes.len() as u8);
        self.script.extend_from_slice(bytes);
        self
    }

    /// Emits an APPCALL or TAILCALL of the 20-byte script hash.
    pub fn emit_app_call(&mut self, script_hash: &[u8; SCRIPT_HASH_SIZE], tail: bool) -> &mut Self {
        self.emit_opcode(if tail {
            OpCode::TAILCALL
        } else {
            OpCode::APPCALL
        });
        self.script.extend_from_slice(script_hash);
        self
    }

    /// Emits a PACK of the `count` items below the top of the stack.
    pub fn emit_pack(&mut self, count: usize) -> &mut Self {
        self.emit_push_int(&BigInt::from(count));
        self.emit_opcode(OpCode::PACK)
    }

    /// Converts the builder to a script.
    pub fn to_script(&self) -> Script {
        Script::new(self.script.clone())
    }

    /// Returns the bytes emitted so far.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.script.clone()
    }

    /// Returns the current length of the script.
    pub fn len(&self) -> usize {
        self.script.len()
    }

    /// Returns `true` when nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_push_int_shortcuts() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_int(&BigInt::from(-1));
        builder.emit_push_int(&BigInt::from(0));
        builder.emit_push_int(&BigInt::from(10));
        builder.emit_push_int(&BigInt::from(16));
        assert_eq!(
            builder.to_bytes(),
            vec![
                OpCode::PUSHM1 as u8,
                OpCode::PUSH0 as u8,
                OpCode::PUSH10 as u8,
                OpCode::PUSH16 as u8
            ]
        );
    }

    #[test]
    fn test_emit_push_int_encodes_bytes() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_int(&BigInt::from(300));
        // PUSHBYTES2 0x2C 0x01
        assert_eq!(builder.to_bytes(), vec![0x02, 0x2C, 0x01]);

        let mut builder = ScriptBuilder::new();
        builder.emit_push_int(&BigInt::from(-100));
        // PUSHBYTES1 0x9C
        assert_eq!(builder.to_bytes(), vec![0x01, 0x9C]);
    }

    #[test]
    fn test_emit_push_selects_encoding() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push(&[0xAA; 3]);
        assert_eq!(builder.to_bytes()[0], 0x03);

        let mut builder = ScriptBuilder::new();
        builder.emit_push(&[0xAA; 200]);
        assert_eq!(builder.to_bytes()[0], OpCode::PUSHDATA1 as u8);
        assert_eq!(builder.to_bytes()[1], 200);

        let mut builder = ScriptBuilder::new();
        builder.emit_push(&[0xAA; 300]);
        assert_eq!(builder.to_bytes()[0], OpCode::PUSHDATA2 as u8);
        assert_eq!(&builder.to_bytes()[1..3], &300u16.to_le_bytes());
    }

    #[test]
    fn test_emit_syscall() {
        let mut builder = ScriptBuilder::new();
        builder.emit_syscall("Neo.Runtime.Log");
        let bytes = builder.to_bytes();
        assert_eq!(bytes[0], OpCode::SYSCALL as u8);
        assert_eq!(bytes[1] as usize, "Neo.Runtime.Log".len());
        assert_eq!(&bytes[2..], b"Neo.Runtime.Log");
    }

    #[test]
    fn test_emit_jump_little_endian() {
        let mut builder = ScriptBuilder::new();
        builder.emit_jump(OpCode::JMP, -3);
        assert_eq!(builder.to_bytes(), vec![OpCode::JMP as u8, 0xFD, 0xFF]);
    }

    #[test]
    fn test_built_script_parses() {
        let mut builder = ScriptBuilder::new();
        builder.emit_push_int(&BigInt::from(5));
        builder.emit_push_int(&BigInt::from(2));
        builder.emit_opcode(OpCode::ADD);
        builder.emit_opcode(OpCode::RET);
        let script = builder.to_script();
        assert_eq!(script.instruction_offsets().len(), 4);
    }
}
