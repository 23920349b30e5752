//! Disassembler for `.avm` bytecode.
//!
//! Produces the ordered instruction records behind the assembly view and
//! the offset <-> assembly-line lookups used for breakpoints in that view.

use crate::error::{DebuggerError, DebuggerResult};
use neo_debugger_vm::{Instruction, OpCode};
use std::collections::HashMap;
use std::fmt::Write as _;

/// One decoded instruction record.
#[derive(Debug, Clone)]
pub struct DisassembledInstruction {
    /// Byte offset of the instruction in the script
    pub offset: usize,

    /// The opcode
    pub opcode: OpCode,

    /// The operand payload, if any
    pub operand: Vec<u8>,

    /// The full encoded size
    pub size: usize,
}

/// Parsed assembly of a script with offset <-> line lookups.
///
/// Assembly lines are 1-based, one instruction per line; together the
/// instruction ranges tile the whole script.
#[derive(Debug, Clone)]
pub struct Disassembler {
    instructions: Vec<DisassembledInstruction>,
    text: String,
    offset_to_line: HashMap<usize, u32>,
    line_to_offset: HashMap<u32, usize>,
}

impl Disassembler {
    /// Disassembles raw bytecode, rejecting malformed scripts.
    pub fn new(bytes: &[u8]) -> DebuggerResult<Self> {
        let mut instructions = Vec::new();
        let mut position = 0;
        while position < bytes.len() {
            let instruction = Instruction::parse(bytes, position).map_err(|err| {
                DebuggerError::disassemble(format!("at offset {position}: {err}"))
            })?;
            instructions.push(DisassembledInstruction {
                offset: position,
                opcode: instruction.opcode(),
                operand: instruction.operand().to_vec(),
                size: instruction.size(),
            });
            position += instruction.size();
        }

        let mut text = String::new();
        let mut offset_to_line = HashMap::new();
        let mut line_to_offset = HashMap::new();
        for (index, instruction) in instructions.iter().enumerate() {
            let line = index as u32 + 1;
            offset_to_line.insert(instruction.offset, line);
            line_to_offset.insert(line, instruction.offset);
            let _ = writeln!(text, "{:04X} {}", instruction.offset, render(instruction));
        }

        Ok(Self {
            instructions,
            text,
            offset_to_line,
            line_to_offset,
        })
    }

    /// Returns the decoded instruction records in script order.
    pub fn instructions(&self) -> &[DisassembledInstruction] {
        &self.instructions
    }

    /// Returns the rendered assembly listing.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the 1-based assembly line at `offset`, if it starts an
    /// instruction.
    pub fn line_at_offset(&self, offset: usize) -> Option<u32> {
        self.offset_to_line.get(&offset).copied()
    }

    /// Returns the byte offset of the instruction on the 1-based `line`.
    pub fn offset_at_line(&self, line: u32) -> Option<usize> {
        self.line_to_offset.get(&line).copied()
    }
}

fn render(instruction: &DisassembledInstruction) -> String {
    match instruction.opcode {
        OpCode::SYSCALL => {
            let name = String::from_utf8_lossy(&instruction.operand);
            format!("SYSCALL {name}")
        }
        OpCode::APPCALL | OpCode::TAILCALL => {
            format!("{} 0x{}", instruction.opcode, hex::encode(&instruction.operand))
        }
        OpCode::JMP | OpCode::JMPIF | OpCode::JMPIFNOT | OpCode::CALL => {
            let offset = i16::from_le_bytes([instruction.operand[0], instruction.operand[1]]);
            let target = instruction.offset as i64 + offset as i64;
            format!("{} {target:04X}", instruction.opcode)
        }
        _ if instruction.operand.is_empty() => instruction.opcode.to_string(),
        _ => format!("{} 0x{}", instruction.opcode, hex::encode(&instruction.operand)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_ranges_tile_script() {
        // PUSH1 PUSHBYTES2 aa bb PUSHDATA1 01 cc ADD RET
        let bytes = vec![0x51, 0x02, 0xAA, 0xBB, 0x4C, 0x01, 0xCC, 0x93, 0x66];
        let disassembler = Disassembler::new(&bytes).unwrap();

        let mut position = 0;
        for instruction in disassembler.instructions() {
            assert_eq!(instruction.offset, position);
            position += instruction.size;
        }
        assert_eq!(position, bytes.len());
    }

    #[test]
    fn test_deterministic() {
        let bytes = vec![0x51, 0x52, 0x93, 0x66];
        let a = Disassembler::new(&bytes).unwrap();
        let b = Disassembler::new(&bytes).unwrap();
        assert_eq!(a.text(), b.text());
    }

    #[test]
    fn test_line_lookups_round_trip() {
        let bytes = vec![0x51, 0x52, 0x93, 0x53, 0x95, 0x66];
        let disassembler = Disassembler::new(&bytes).unwrap();
        for instruction in disassembler.instructions() {
            let line = disassembler.line_at_offset(instruction.offset).unwrap();
            assert_eq!(disassembler.offset_at_line(line), Some(instruction.offset));
        }
        assert_eq!(disassembler.line_at_offset(4), Some(5));
        assert!(disassembler.line_at_offset(100).is_none());
    }

    #[test]
    fn test_rejects_truncated_bytecode() {
        // PUSHDATA1 missing its payload
        let result = Disassembler::new(&[0x51, 0x4C, 0x05, 0x01]);
        assert!(matches!(result, Err(DebuggerError::Disassemble { .. })));
    }

    #[test]
    fn test_renders_syscall_names() {
        let name = b"Neo.Runtime.Log";
        let mut bytes = vec![0x68, name.len() as u8];
        bytes.extend_from_slice(name);
        let disassembler = Disassembler::new(&bytes).unwrap();
        assert!(disassembler.text().contains("SYSCALL Neo.Runtime.Log"));
    }
}
