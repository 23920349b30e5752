//! Constant-push operations.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use crate::stack_item::StackItem;

/// Executes any literal-push instruction (value <= PUSH16).
pub(crate) fn push_literal(
    engine: &mut ExecutionEngine,
    instruction: &Instruction,
) -> VmResult<()> {
    let opcode = instruction.opcode();
    let item = match opcode {
        OpCode::PUSH0 => StackItem::from_byte_array(Vec::new()),
        OpCode::PUSHM1 => StackItem::from_int(-1),
        op if op.is_push_bytes() => data_item(engine, instruction)?,
        OpCode::PUSHDATA1 | OpCode::PUSHDATA2 | OpCode::PUSHDATA4 => {
            data_item(engine, instruction)?
        }
        // PUSH1..=PUSH16 encode the value relative to 0x50
        _ => StackItem::from_int(opcode as u8 - 0x50),
    };
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

fn data_item(engine: &ExecutionEngine, instruction: &Instruction) -> VmResult<StackItem> {
    let data = instruction.operand();
    let limit = engine.limits().max_item_size;
    if data.len() > limit {
        return Err(VmError::ItemTooLarge {
            size: data.len(),
            limit,
        });
    }
    Ok(StackItem::from_byte_array(data.to_vec()))
}
