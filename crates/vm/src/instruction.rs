//! Instruction representation and parsing for the Neo debugger VM.

use crate::error::{VmError, VmResult};
use crate::op_code::OpCode;

/// Represents a decoded instruction in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The position of the instruction in the script
    pointer: usize,

    /// The opcode of the instruction
    opcode: OpCode,

    /// The operand payload, without length prefixes
    operand: Vec<u8>,

    /// The full encoded size, including opcode and prefixes
    size: usize,
}

impl Instruction {
    /// Parses the instruction at `position` in `script`.
    ///
    /// Rejects unknown opcodes and truncated operands.
    pub fn parse(script: &[u8], position: usize) -> VmResult<Self> {
        let raw = *script
            .get(position)
            .ok_or_else(|| VmError::parse("Position out of bounds"))?;
        let opcode = OpCode::from_byte(raw).ok_or_else(|| VmError::invalid_opcode(raw))?;

        let layout = opcode.operand_size();
        let operand_start = position + 1;

        let (data_start, data_len) = if layout.has_size_prefix() {
            let prefix = layout.size_prefix();
            let prefix_end = operand_start + prefix;
            if prefix_end > script.len() {
                return Err(VmError::parse(format!(
                    "{opcode} missing {prefix}-byte length prefix"
                )));
            }
            let mut length = 0usize;
            for (i, byte) in script[operand_start..prefix_end].iter().enumerate() {
                length |= (*byte as usize) << (8 * i);
            }
            (prefix_end, length)
        } else {
            (operand_start, layout.size())
        };

        let data_end = data_start + data_len;
        if data_end > script.len() {
            return Err(VmError::parse(format!(
                "Operand of {opcode} exceeds script bounds: {data_start} + {data_len} > {}",
                script.len()
            )));
        }

        Ok(Self {
            pointer: position,
            opcode,
            operand: script[data_start..data_end].to_vec(),
            size: data_end - position,
        })
    }

    /// Returns the position of the instruction in the script.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// Returns the opcode.
    pub fn opcode(&self) -> OpCode {
        self.opcode
    }

    /// Returns the operand payload (inline data, jump offset bytes,
    /// script hash or syscall name, depending on the opcode).
    pub fn operand(&self) -> &[u8] {
        &self.operand
    }

    /// Returns the full encoded size of the instruction.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Reads the operand as a 2-byte little-endian signed jump offset,
    /// relative to the instruction start.
    pub fn jump_offset(&self) -> VmResult<i16> {
        let bytes: [u8; 2] = self
            .operand
            .as_slice()
            .try_into()
            .map_err(|_| VmError::parse(format!("{} operand is not a 2-byte offset", self.opcode)))?;
        Ok(i16::from_le_bytes(bytes))
    }

    /// Reads the operand as an ASCII syscall name.
    pub fn syscall_name(&self) -> VmResult<String> {
        String::from_utf8(self.operand.clone())
            .map_err(|_| VmError::parse("SYSCALL name is not valid ASCII"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_push_bytes() {
        let script = [0x03, 0xAA, 0xBB, 0xCC, 0x66];
        let instruction = Instruction::parse(&script, 0).unwrap();
        assert_eq!(instruction.opcode(), OpCode::PUSHBYTES3);
        assert_eq!(instruction.operand(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(instruction.size(), 4);
    }

    #[test]
    fn test_parse_pushdata1() {
        let script = [0x4C, 0x02, 0x01, 0x02];
        let instruction = Instruction::parse(&script, 0).unwrap();
        assert_eq!(instruction.opcode(), OpCode::PUSHDATA1);
        assert_eq!(instruction.operand(), &[0x01, 0x02]);
        assert_eq!(instruction.size(), 4);
    }

    #[test]
    fn test_parse_syscall() {
        let name = b"Neo.Runtime.Log";
        let mut script = vec![0x68, name.len() as u8];
        script.extend_from_slice(name);
        let instruction = Instruction::parse(&script, 0).unwrap();
        assert_eq!(instruction.opcode(), OpCode::SYSCALL);
        assert_eq!(instruction.syscall_name().unwrap(), "Neo.Runtime.Log");
        assert_eq!(instruction.size(), 2 + name.len());
    }

    #[test]
    fn test_parse_jump_offset() {
        let script = [0x62, 0xFD, 0xFF]; // JMP -3
        let instruction = Instruction::parse(&script, 0).unwrap();
        assert_eq!(instruction.jump_offset().unwrap(), -3);
        assert_eq!(instruction.size(), 3);
    }

    #[test]
    fn test_parse_rejects_truncated_operand() {
        let script = [0x4C]; // PUSHDATA1 without length byte
        assert!(Instruction::parse(&script, 0).is_err());

        let script = [0x67, 0x00, 0x01]; // APPCALL with 2 of 20 hash bytes
        assert!(Instruction::parse(&script, 0).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_opcode() {
        let script = [0x50];
        assert!(matches!(
            Instruction::parse(&script, 0),
            Err(VmError::InvalidOpCode { opcode: 0x50 })
        ));
    }
}
