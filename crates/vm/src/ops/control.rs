//! Flow-control operations.
//!
//! CALL/RET/APPCALL/TAILCALL/SYSCALL manipulate the invocation stack and are
//! implemented on the engine itself; this module covers jumps and throws.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::op_code::OpCode;

/// Executes JMP, JMPIF or JMPIFNOT.
pub(crate) fn jump(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    let taken = match instruction.opcode() {
        OpCode::JMP => true,
        OpCode::JMPIF => engine.evaluation_stack_mut().pop_bool()?,
        OpCode::JMPIFNOT => !engine.evaluation_stack_mut().pop_bool()?,
        other => {
            return Err(VmError::invalid_operation(
                other.to_string(),
                "not a jump".to_string(),
            ))
        }
    };
    if taken {
        engine.jump(instruction)?;
    }
    Ok(())
}

/// Executes THROW: always faults.
pub(crate) fn throw(_engine: &mut ExecutionEngine) -> VmResult<()> {
    Err(VmError::invalid_operation("THROW", "script threw an exception"))
}

/// Executes THROWIFNOT: faults unless the popped value is true.
pub(crate) fn throw_if_not(engine: &mut ExecutionEngine) -> VmResult<()> {
    if engine.evaluation_stack_mut().pop_bool()? {
        Ok(())
    } else {
        Err(VmError::invalid_operation(
            "THROWIFNOT",
            "condition was false",
        ))
    }
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

    #[test]
    fn test_jmpif_taken() {
        // PUSH1 JMPIF +4 -> skips PUSH2; PUSH3 RET
        let engine = run_script(vec![0x51, 0x63, 0x04, 0x00, 0x52, 0x53, 0x66]);
        assert!(engine.state().is_halt());
        assert_eq!(engine.evaluation_stack().len(), 1);
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(3)
        );
    }

    #[test]
    fn test_jmpifnot_not_taken() {
        // PUSH1 JMPIFNOT +4; PUSH2 PUSH3 RET
        let engine = run_script(vec![0x51, 0x64, 0x04, 0x00, 0x52, 0x53, 0x66]);
        assert!(engine.state().is_halt());
        assert_eq!(engine.evaluation_stack().len(), 2);
    }

    #[test]
    fn test_jump_out_of_bounds_faults() {
        // JMP +100
        let engine = run_script(vec![0x62, 0x64, 0x00]);
        assert!(engine.state().is_fault());
    }

    #[test]
    fn test_throwifnot() {
        // PUSH0 THROWIFNOT
        let engine = run_script(vec![0x00, 0xF1]);
        assert!(engine.state().is_fault());

        // PUSH1 THROWIFNOT RET
        let engine = run_script(vec![0x51, 0xF1, 0x66]);
        assert!(engine.state().is_halt());
    }
}
