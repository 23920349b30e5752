//! Instruction dispatch for the Neo debugger VM.
//!
//! Opcode semantics are grouped by family; each handler takes the engine
//! and the decoded instruction, mirroring the instruction tables of the VM.

pub mod bitwise;
pub mod compound;
pub mod control;
pub mod crypto;
pub mod numeric;
pub mod push;
pub mod splice;
pub mod stack;

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use crate::instruction::Instruction;
use crate::op_code::OpCode;
use num_traits::ToPrimitive;

/// Executes one decoded instruction against the engine.
pub(crate) fn execute(engine: &mut ExecutionEngine, instruction: &Instruction) -> VmResult<()> {
    use OpCode::*;

    let opcode = instruction.opcode();
    if opcode.is_push() {
        return push::push_literal(engine, instruction);
    }
    match opcode {
        // Flow control
        NOP => Ok(()),
        JMP | JMPIF | JMPIFNOT => control::jump(engine, instruction),
        CALL => engine.call(instruction),
        RET => {
            engine.ret();
            Ok(())
        }
        APPCALL => engine.app_call(instruction, false),
        TAILCALL => engine.app_call(instruction, true),
        SYSCALL => engine.syscall(instruction),
        THROW => control::throw(engine),
        THROWIFNOT => control::throw_if_not(engine),

        // Alt stack and stack manipulation
        DUPFROMALTSTACK => stack::dup_from_alt_stack(engine),
        TOALTSTACK => stack::to_alt_stack(engine),
        FROMALTSTACK => stack::from_alt_stack(engine),
        XDROP => stack::xdrop(engine),
        XSWAP => stack::xswap(engine),
        XTUCK => stack::xtuck(engine),
        DEPTH => stack::depth(engine),
        DROP => stack::drop(engine),
        DUP => stack::dup(engine),
        NIP => stack::nip(engine),
        OVER => stack::over(engine),
        PICK => stack::pick(engine),
        ROLL => stack::roll(engine),
        ROT => stack::rot(engine),
        SWAP => stack::swap(engine),
        TUCK => stack::tuck(engine),

        // Splice
        CAT => splice::cat(engine),
        SUBSTR => splice::substr(engine),
        LEFT => splice::left(engine),
        RIGHT => splice::right(engine),
        SIZE => splice::size(engine),

        // Bitwise logic
        INVERT => bitwise::invert(engine),
        AND => bitwise::and(engine),
        OR => bitwise::or(engine),
        XOR => bitwise::xor(engine),
        EQUAL => bitwise::equal(engine),

        // Arithmetic and comparison
        INC => numeric::inc(engine),
        DEC => numeric::dec(engine),
        SIGN => numeric::sign(engine),
        NEGATE => numeric::negate(engine),
        ABS => numeric::abs(engine),
        NOT => numeric::not(engine),
        NZ => numeric::nz(engine),
        ADD => numeric::add(engine),
        SUB => numeric::sub(engine),
        MUL => numeric::mul(engine),
        DIV => numeric::div(engine),
        MOD => numeric::modulo(engine),
        SHL => numeric::shl(engine),
        SHR => numeric::shr(engine),
        BOOLAND => numeric::bool_and(engine),
        BOOLOR => numeric::bool_or(engine),
        NUMEQUAL => numeric::num_equal(engine),
        NUMNOTEQUAL => numeric::num_not_equal(engine),
        LT => numeric::lt(engine),
        GT => numeric::gt(engine),
        LTE => numeric::lte(engine),
        GTE => numeric::gte(engine),
        MIN => numeric::min(engine),
        MAX => numeric::max(engine),
        WITHIN => numeric::within(engine),

        // Crypto
        SHA1 => crypto::sha1(engine),
        SHA256 => crypto::sha256(engine),
        HASH160 => crypto::hash160(engine),
        HASH256 => crypto::hash256(engine),
        CHECKSIG => crypto::check_sig(engine),
        VERIFY => crypto::verify(engine),
        CHECKMULTISIG => crypto::check_multisig(engine),

        // Compound types
        ARRAYSIZE => compound::array_size(engine),
        PACK => compound::pack(engine),
        UNPACK => compound::unpack(engine),
        PICKITEM => compound::pick_item(engine),
        SETITEM => compound::set_item(engine),
        NEWARRAY => compound::new_array(engine),
        NEWSTRUCT => compound::new_struct(engine),
        NEWMAP => compound::new_map(engine),
        APPEND => compound::append(engine),
        REVERSE => compound::reverse(engine),
        REMOVE => compound::remove(engine),
        HASKEY => compound::has_key(engine),
        KEYS => compound::keys(engine),
        VALUES => compound::values(engine),

        // Literal pushes were dispatched above
        _ => Err(VmError::invalid_opcode(opcode as u8)),
    }
}

/// Pops a non-negative stack index, faulting on negative or oversized values.
pub(crate) fn pop_index(engine: &mut ExecutionEngine, operation: &str) -> VmResult<usize> {
    let value = engine.evaluation_stack_mut().pop_int()?;
    value.to_usize().ok_or_else(|| {
        VmError::invalid_operation(operation.to_string(), format!("invalid index {value}"))
    })
}
