//! Bitwise logic operations.
//!
//! AND/OR/XOR/INVERT operate on the two's-complement integer interpretation
//! of their operands, as the reference VM does.

use crate::error::VmResult;
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::StackItem;

pub(crate) fn invert(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.evaluation_stack_mut().pop_int()?;
    engine.evaluation_stack_mut().push(StackItem::from_int(!value));
    Ok(())
}

pub(crate) fn and(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = engine.evaluation_stack_mut().pop_int()?;
    let a = engine.evaluation_stack_mut().pop_int()?;
    engine.evaluation_stack_mut().push(StackItem::from_int(a & b));
    Ok(())
}

pub(crate) fn or(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = engine.evaluation_stack_mut().pop_int()?;
    let a = engine.evaluation_stack_mut().pop_int()?;
    engine.evaluation_stack_mut().push(StackItem::from_int(a | b));
    Ok(())
}

pub(crate) fn xor(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = engine.evaluation_stack_mut().pop_int()?;
    let a = engine.evaluation_stack_mut().pop_int()?;
    engine.evaluation_stack_mut().push(StackItem::from_int(a ^ b));
    Ok(())
}

pub(crate) fn equal(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = engine.evaluation_stack_mut().pop()?;
    let a = engine.evaluation_stack_mut().pop()?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_bool(a.equals(&b)));
    Ok(())
}
