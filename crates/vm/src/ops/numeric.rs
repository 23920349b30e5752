//! Arithmetic, comparison and boolean operations on unbounded integers.
//!
//! Operands and arithmetic results are limited to the engine's maximum
//! integer size; exceeding it faults the VM.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::stack_item::{int_to_bytes, StackItem};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

fn require_in_range(engine: &ExecutionEngine, operation: &str, value: &BigInt) -> VmResult<()> {
    let size = int_to_bytes(value).len();
    let limit = engine.limits().max_integer_size;
    if size > limit {
        return Err(VmError::number_out_of_range(operation, size, limit));
    }
    Ok(())
}

fn pop_number(engine: &mut ExecutionEngine, operation: &str) -> VmResult<BigInt> {
    let value = engine.evaluation_stack_mut().pop_int()?;
    require_in_range(engine, operation, &value)?;
    Ok(value)
}

fn push_number(engine: &mut ExecutionEngine, operation: &str, value: BigInt) -> VmResult<()> {
    require_in_range(engine, operation, &value)?;
    engine.evaluation_stack_mut().push(StackItem::from_int(value));
    Ok(())
}

pub(crate) fn inc(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_number(engine, "INC")?;
    push_number(engine, "INC", value + 1)
}

pub(crate) fn dec(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_number(engine, "DEC")?;
    push_number(engine, "DEC", value - 1)
}

pub(crate) fn sign(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_number(engine, "SIGN")?;
    let sign = match value.sign() {
        num_bigint::Sign::Minus => -1,
        num_bigint::Sign::NoSign => 0,
        num_bigint::Sign::Plus => 1,
    };
    engine.evaluation_stack_mut().push(StackItem::from_int(sign));
    Ok(())
}

pub(crate) fn negate(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_number(engine, "NEGATE")?;
    push_number(engine, "NEGATE", -value)
}

pub(crate) fn abs(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_number(engine, "ABS")?;
    push_number(engine, "ABS", value.abs())
}

pub(crate) fn not(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = engine.evaluation_stack_mut().pop_bool()?;
    engine.evaluation_stack_mut().push(StackItem::from_bool(!value));
    Ok(())
}

/// Pushes whether the popped number is non-zero.
pub(crate) fn nz(engine: &mut ExecutionEngine) -> VmResult<()> {
    let value = pop_number(engine, "NZ")?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_bool(!value.is_zero()));
    Ok(())
}

pub(crate) fn add(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "ADD")?;
    let a = pop_number(engine, "ADD")?;
    push_number(engine, "ADD", a + b)
}

pub(crate) fn sub(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "SUB")?;
    let a = pop_number(engine, "SUB")?;
    push_number(engine, "SUB", a - b)
}

pub(crate) fn mul(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "MUL")?;
    let a = pop_number(engine, "MUL")?;
    push_number(engine, "MUL", a * b)
}

/// Division truncates toward zero.
pub(crate) fn div(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "DIV")?;
    let a = pop_number(engine, "DIV")?;
    if b.is_zero() {
        return Err(VmError::division_by_zero("DIV"));
    }
    push_number(engine, "DIV", a / b)
}

/// Remainder takes the sign of the dividend.
pub(crate) fn modulo(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "MOD")?;
    let a = pop_number(engine, "MOD")?;
    if b.is_zero() {
        return Err(VmError::division_by_zero("MOD"));
    }
    push_number(engine, "MOD", a % b)
}

pub(crate) fn shl(engine: &mut ExecutionEngine) -> VmResult<()> {
    let shift = shift_amount(engine, "SHL")?;
    let value = pop_number(engine, "SHL")?;
    push_number(engine, "SHL", value << shift)
}

pub(crate) fn shr(engine: &mut ExecutionEngine) -> VmResult<()> {
    let shift = shift_amount(engine, "SHR")?;
    let value = pop_number(engine, "SHR")?;
    push_number(engine, "SHR", value >> shift)
}

fn shift_amount(engine: &mut ExecutionEngine, operation: &str) -> VmResult<usize> {
    let shift = engine.evaluation_stack_mut().pop_int()?;
    let limit = engine.limits().max_shift as usize;
    match shift.to_usize() {
        Some(shift) if shift <= limit => Ok(shift),
        _ => Err(VmError::invalid_operation(
            operation.to_string(),
            format!("invalid shift amount {shift}"),
        )),
    }
}

pub(crate) fn bool_and(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = engine.evaluation_stack_mut().pop_bool()?;
    let a = engine.evaluation_stack_mut().pop_bool()?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_bool(a && b));
    Ok(())
}

pub(crate) fn bool_or(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = engine.evaluation_stack_mut().pop_bool()?;
    let a = engine.evaluation_stack_mut().pop_bool()?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_bool(a || b));
    Ok(())
}

pub(crate) fn num_equal(engine: &mut ExecutionEngine) -> VmResult<()> {
    compare(engine, "NUMEQUAL", |a, b| a == b)
}

pub(crate) fn num_not_equal(engine: &mut ExecutionEngine) -> VmResult<()> {
    compare(engine, "NUMNOTEQUAL", |a, b| a != b)
}

pub(crate) fn lt(engine: &mut ExecutionEngine) -> VmResult<()> {
    compare(engine, "LT", |a, b| a < b)
}

pub(crate) fn gt(engine: &mut ExecutionEngine) -> VmResult<()> {
    compare(engine, "GT", |a, b| a > b)
}

pub(crate) fn lte(engine: &mut ExecutionEngine) -> VmResult<()> {
    compare(engine, "LTE", |a, b| a <= b)
}

pub(crate) fn gte(engine: &mut ExecutionEngine) -> VmResult<()> {
    compare(engine, "GTE", |a, b| a >= b)
}

fn compare<F>(engine: &mut ExecutionEngine, operation: &str, predicate: F) -> VmResult<()>
where
    F: FnOnce(&BigInt, &BigInt) -> bool,
{
    let b = pop_number(engine, operation)?;
    let a = pop_number(engine, operation)?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_bool(predicate(&a, &b)));
    Ok(())
}

pub(crate) fn min(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "MIN")?;
    let a = pop_number(engine, "MIN")?;
    push_number(engine, "MIN", a.min(b))
}

pub(crate) fn max(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "MAX")?;
    let a = pop_number(engine, "MAX")?;
    push_number(engine, "MAX", a.max(b))
}

/// Pushes whether `a <= x < b` for popped bounds b, a and value x.
pub(crate) fn within(engine: &mut ExecutionEngine) -> VmResult<()> {
    let b = pop_number(engine, "WITHIN")?;
    let a = pop_number(engine, "WITHIN")?;
    let x = pop_number(engine, "WITHIN")?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_bool(a <= x && x < b));
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

    fn top_int(engine: &ExecutionEngine) -> BigInt {
        engine.evaluation_stack().peek(0).unwrap().as_int().unwrap()
    }

    fn top_bool(engine: &ExecutionEngine) -> bool {
        engine.evaluation_stack().peek(0).unwrap().as_bool().unwrap()
    }

    #[test]
    fn test_arithmetic() {
        // PUSH2 PUSH5 ADD RET
        let engine = run_script(vec![0x52, 0x55, 0x93, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(7));

        // PUSH2 PUSH5 SUB RET -> -3
        let engine = run_script(vec![0x52, 0x55, 0x94, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(-3));

        // PUSH7 PUSH2 DIV RET -> 3 (truncated toward zero)
        let engine = run_script(vec![0x57, 0x52, 0x96, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(3));

        // PUSH7 PUSH2 MOD RET -> 1
        let engine = run_script(vec![0x57, 0x52, 0x97, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(1));
    }

    #[test]
    fn test_negative_division_truncates_toward_zero() {
        // PUSHM1 PUSH7 MUL PUSH2 DIV RET -> -3
        let engine = run_script(vec![0x4F, 0x57, 0x95, 0x52, 0x96, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(-3));
    }

    #[test]
    fn test_division_by_zero_faults() {
        // PUSH1 PUSH0 DIV
        let engine = run_script(vec![0x51, 0x00, 0x96]);
        assert!(engine.state().is_fault());

        // PUSH1 PUSH0 MOD
        let engine = run_script(vec![0x51, 0x00, 0x97]);
        assert!(engine.state().is_fault());
    }

    #[test]
    fn test_shifts() {
        // PUSH1 PUSH4 SHL RET -> 16
        let engine = run_script(vec![0x51, 0x54, 0x98, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(16));

        // PUSH16 PUSH2 SHR RET -> 4
        let engine = run_script(vec![0x60, 0x52, 0x99, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(4));

        // Negative shift faults: PUSH1 PUSHM1 SHL
        let engine = run_script(vec![0x51, 0x4F, 0x98]);
        assert!(engine.state().is_fault());
    }

    #[test]
    fn test_comparisons() {
        // PUSH2 PUSH5 LT RET
        let engine = run_script(vec![0x52, 0x55, 0x9F, 0x66]);
        assert!(top_bool(&engine));

        // PUSH5 PUSH5 GTE RET
        let engine = run_script(vec![0x55, 0x55, 0xA2, 0x66]);
        assert!(top_bool(&engine));

        // PUSH3 PUSH1 PUSH5 WITHIN RET -> 1 <= 3 < 5
        let engine = run_script(vec![0x53, 0x51, 0x55, 0xA5, 0x66]);
        assert!(top_bool(&engine));
    }

    #[test]
    fn test_min_max_sign_abs() {
        // PUSH2 PUSH5 MIN RET
        let engine = run_script(vec![0x52, 0x55, 0xA3, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(2));

        // PUSH2 PUSH5 MAX RET
        let engine = run_script(vec![0x52, 0x55, 0xA4, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(5));

        // PUSHM1 SIGN RET
        let engine = run_script(vec![0x4F, 0x8D, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(-1));

        // PUSHM1 ABS RET
        let engine = run_script(vec![0x4F, 0x90, 0x66]);
        assert_eq!(top_int(&engine), BigInt::from(1));
    }

    #[test]
    fn test_oversized_operand_faults() {
        // A 33-byte operand exceeds the integer limit for ADD
        let mut script = vec![0x21]; // PUSHBYTES33
        script.extend_from_slice(&[0x01; 33]);
        script.extend_from_slice(&[0x51, 0x93]); // PUSH1 ADD
        let engine = run_script(script);
        assert!(engine.state().is_fault());
    }
}
