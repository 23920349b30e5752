//! Byte-array splice operations.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::ops::pop_index;
use crate::stack_item::StackItem;

pub(crate) fn cat(engine: &mut ExecutionEngine) -> VmResult<()> {
    let tail = engine.evaluation_stack_mut().pop_bytes()?;
    let mut head = engine.evaluation_stack_mut().pop_bytes()?;
    let limit = engine.limits().max_item_size;
    if head.len() + tail.len() > limit {
        return Err(VmError::ItemTooLarge {
            size: head.len() + tail.len(),
            limit,
        });
    }
    head.extend_from_slice(&tail);
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(head));
    Ok(())
}

/// Extracts `count` bytes starting at `index`, clamped to the input length.
pub(crate) fn substr(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = pop_index(engine, "SUBSTR")?;
    let index = pop_index(engine, "SUBSTR")?;
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    let slice: Vec<u8> = bytes.into_iter().skip(index).take(count).collect();
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(slice));
    Ok(())
}

/// Keeps the first `count` bytes, clamped to the input length.
pub(crate) fn left(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = pop_index(engine, "LEFT")?;
    let mut bytes = engine.evaluation_stack_mut().pop_bytes()?;
    bytes.truncate(count);
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(bytes));
    Ok(())
}

/// Keeps the last `count` bytes; faults when the input is shorter.
pub(crate) fn right(engine: &mut ExecutionEngine) -> VmResult<()> {
    let count = pop_index(engine, "RIGHT")?;
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    if bytes.len() < count {
        return Err(VmError::invalid_operation(
            "RIGHT".to_string(),
            format!("count {count} exceeds length {}", bytes.len()),
        ));
    }
    let slice = bytes[bytes.len() - count..].to_vec();
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(slice));
    Ok(())
}

pub(crate) fn size(engine: &mut ExecutionEngine) -> VmResult<()> {
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_int(bytes.len() as i64));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::execution_engine::ExecutionEngine;
    use crate::interop_service::InteropService;
    use num_bigint::BigInt;

    fn run_script(script: Vec<u8>) -> ExecutionEngine {
        let mut engine = ExecutionEngine::new(InteropService::new());
        engine.load_script(script).unwrap();
        while !engine.state().is_halt() && !engine.state().is_fault() {
            engine.step_into();
        }
        engine
    }

    fn top_bytes(engine: &ExecutionEngine) -> Vec<u8> {
        engine.evaluation_stack().peek(0).unwrap().as_bytes().unwrap()
    }

    #[test]
    fn test_cat() {
        // PUSHBYTES2 01 02, PUSHBYTES1 03, CAT RET
        let engine = run_script(vec![0x02, 0x01, 0x02, 0x01, 0x03, 0x7E, 0x66]);
        assert_eq!(top_bytes(&engine), vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_substr_clamps() {
        // PUSHBYTES3 0A 0B 0C, PUSH1, PUSH16, SUBSTR RET
        let engine = run_script(vec![0x03, 0x0A, 0x0B, 0x0C, 0x51, 0x60, 0x7F, 0x66]);
        assert_eq!(top_bytes(&engine), vec![0x0B, 0x0C]);
    }

    #[test]
    fn test_left_and_right() {
        // PUSHBYTES3 0A 0B 0C, PUSH2, LEFT RET
        let engine = run_script(vec![0x03, 0x0A, 0x0B, 0x0C, 0x52, 0x80, 0x66]);
        assert_eq!(top_bytes(&engine), vec![0x0A, 0x0B]);

        // PUSHBYTES3 0A 0B 0C, PUSH2, RIGHT RET
        let engine = run_script(vec![0x03, 0x0A, 0x0B, 0x0C, 0x52, 0x81, 0x66]);
        assert_eq!(top_bytes(&engine), vec![0x0B, 0x0C]);

        // RIGHT with an oversized count faults
        let engine = run_script(vec![0x01, 0x0A, 0x55, 0x81, 0x66]);
        assert!(engine.state().is_fault());
    }

    #[test]
    fn test_size() {
        // PUSHBYTES3 ... SIZE RET
        let engine = run_script(vec![0x03, 0x0A, 0x0B, 0x0C, 0x82, 0x66]);
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(3)
        );
    }
}
