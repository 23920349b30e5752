//! Stack and alt-stack manipulation operations.

use crate::error::VmResult;
use crate::execution_engine::ExecutionEngine;
use crate::ops::pop_index;

pub(crate) fn dup_from_alt_stack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.alt_stack().peek(0)?.clone();
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

pub(crate) fn to_alt_stack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.evaluation_stack_mut().pop()?;
    engine.alt_stack_mut().push(item);
    Ok(())
}

pub(crate) fn from_alt_stack(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.alt_stack_mut().pop()?;
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

/// Removes the item `n` positions down from the top.
pub(crate) fn xdrop(engine: &mut ExecutionEngine) -> VmResult<()> {
    let n = pop_index(engine, "XDROP")?;
    engine.evaluation_stack_mut().remove(n)?;
    Ok(())
}

/// Swaps the top item with the item `n` positions down.
pub(crate) fn xswap(engine: &mut ExecutionEngine) -> VmResult<()> {
    let n = pop_index(engine, "XSWAP")?;
    if n > 0 {
        engine.evaluation_stack_mut().swap(n)?;
    }
    Ok(())
}

/// Copies the top item to `n` positions down from the top.
pub(crate) fn xtuck(engine: &mut ExecutionEngine) -> VmResult<()> {
    let n = pop_index(engine, "XTUCK")?;
    let item = engine.evaluation_stack().peek(0)?.clone();
    engine.evaluation_stack_mut().insert(n, item)
}

pub(crate) fn depth(engine: &mut ExecutionEngine) -> VmResult<()> {
    let depth = engine.evaluation_stack().len();
    engine
        .evaluation_stack_mut()
        .push(crate::stack_item::StackItem::from_int(depth as i64));
    Ok(())
}

pub(crate) fn drop(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.evaluation_stack_mut().pop()?;
    Ok(())
}

pub(crate) fn dup(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.evaluation_stack().peek(0)?.clone();
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

/// Removes the second item from the top.
pub(crate) fn nip(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.evaluation_stack_mut().remove(1)?;
    Ok(())
}

pub(crate) fn over(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.evaluation_stack().peek(1)?.clone();
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

pub(crate) fn pick(engine: &mut ExecutionEngine) -> VmResult<()> {
    let n = pop_index(engine, "PICK")?;
    let item = engine.evaluation_stack().peek(n)?.clone();
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

pub(crate) fn roll(engine: &mut ExecutionEngine) -> VmResult<()> {
    let n = pop_index(engine, "ROLL")?;
    if n > 0 {
        let item = engine.evaluation_stack_mut().remove(n)?;
        engine.evaluation_stack_mut().push(item);
    }
    Ok(())
}

/// Rotates the top three items.
pub(crate) fn rot(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.evaluation_stack_mut().remove(2)?;
    engine.evaluation_stack_mut().push(item);
    Ok(())
}

pub(crate) fn swap(engine: &mut ExecutionEngine) -> VmResult<()> {
    engine.evaluation_stack_mut().swap(1)
}

/// Copies the top item below the second item.
pub(crate) fn tuck(engine: &mut ExecutionEngine) -> VmResult<()> {
    let item = engine.evaluation_stack().peek(0)?.clone();
    engine.evaluation_stack_mut().insert(2, item)
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

    fn top_ints(engine: &ExecutionEngine, n: usize) -> Vec<i64> {
        (0..n)
            .map(|i| {
                let value = engine.evaluation_stack().peek(i).unwrap().as_int().unwrap();
                i64::try_from(value).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_dup_swap_drop() {
        // PUSH1 PUSH2 DUP DROP SWAP RET
        let engine = run_script(vec![0x51, 0x52, 0x76, 0x75, 0x7C, 0x66]);
        assert!(engine.state().is_halt());
        assert_eq!(top_ints(&engine, 2), vec![1, 2]);
    }

    #[test]
    fn test_alt_stack_round_trip() {
        // PUSH5 TOALTSTACK DUPFROMALTSTACK FROMALTSTACK RET
        let engine = run_script(vec![0x55, 0x6B, 0x6A, 0x6C, 0x66]);
        assert!(engine.state().is_halt());
        assert_eq!(top_ints(&engine, 2), vec![5, 5]);
        assert!(engine.alt_stack().is_empty());
    }

    #[test]
    fn test_pick_and_roll() {
        // PUSH1 PUSH2 PUSH3 PUSH2 PICK -> copies the 1
        let engine = run_script(vec![0x51, 0x52, 0x53, 0x52, 0x79, 0x66]);
        assert_eq!(top_ints(&engine, 4), vec![1, 3, 2, 1]);

        // PUSH1 PUSH2 PUSH3 PUSH2 ROLL -> moves the 1
        let engine = run_script(vec![0x51, 0x52, 0x53, 0x52, 0x7A, 0x66]);
        assert_eq!(top_ints(&engine, 3), vec![1, 3, 2]);
    }

    #[test]
    fn test_rot_over_tuck() {
        // PUSH1 PUSH2 PUSH3 ROT RET
        let engine = run_script(vec![0x51, 0x52, 0x53, 0x7B, 0x66]);
        assert_eq!(top_ints(&engine, 3), vec![1, 3, 2]);

        // PUSH1 PUSH2 OVER RET
        let engine = run_script(vec![0x51, 0x52, 0x78, 0x66]);
        assert_eq!(top_ints(&engine, 3), vec![1, 2, 1]);

        // PUSH1 PUSH2 TUCK RET
        let engine = run_script(vec![0x51, 0x52, 0x7D, 0x66]);
        assert_eq!(top_ints(&engine, 3), vec![2, 1, 2]);
    }

    #[test]
    fn test_depth() {
        // PUSH1 PUSH1 DEPTH RET
        let engine = run_script(vec![0x51, 0x51, 0x74, 0x66]);
        assert_eq!(top_ints(&engine, 1), vec![2]);
    }

    #[test]
    fn test_underflow_faults() {
        // DROP on empty stack
        let engine = run_script(vec![0x75]);
        assert!(engine.state().is_fault());
    }
}
