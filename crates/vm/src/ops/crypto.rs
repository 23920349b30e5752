//! Crypto operations.
//!
//! Hash opcodes compute real digests. Signature checks are simulated: the
//! emulator does not verify signatures against a real chain, so CHECKSIG,
//! VERIFY and CHECKMULTISIG pop their operands and succeed.

use crate::error::VmResult;
use crate::execution_engine::ExecutionEngine;
use crate::ops::pop_index;
use crate::script::script_hash;
use crate::stack_item::StackItem;
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub(crate) fn sha1(engine: &mut ExecutionEngine) -> VmResult<()> {
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    let digest = Sha1::digest(&bytes).to_vec();
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(digest));
    Ok(())
}

pub(crate) fn sha256(engine: &mut ExecutionEngine) -> VmResult<()> {
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    let digest = Sha256::digest(&bytes).to_vec();
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(digest));
    Ok(())
}

/// RIPEMD160 of SHA256.
pub(crate) fn hash160(engine: &mut ExecutionEngine) -> VmResult<()> {
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(script_hash(&bytes)));
    Ok(())
}

/// SHA256 of SHA256.
pub(crate) fn hash256(engine: &mut ExecutionEngine) -> VmResult<()> {
    let bytes = engine.evaluation_stack_mut().pop_bytes()?;
    let digest = Sha256::digest(Sha256::digest(&bytes)).to_vec();
    engine
        .evaluation_stack_mut()
        .push(StackItem::from_byte_array(digest));
    Ok(())
}

/// Pops public key and signature, pushes true.
pub(crate) fn check_sig(engine: &mut ExecutionEngine) -> VmResult<()> {
    let _pubkey = engine.evaluation_stack_mut().pop_bytes()?;
    let _signature = engine.evaluation_stack_mut().pop_bytes()?;
    engine.evaluation_stack_mut().push(StackItem::from_bool(true));
    Ok(())
}

/// Pops public key, signature and message, pushes true.
pub(crate) fn verify(engine: &mut ExecutionEngine) -> VmResult<()> {
    let _pubkey = engine.evaluation_stack_mut().pop_bytes()?;
    let _signature = engine.evaluation_stack_mut().pop_bytes()?;
    let _message = engine.evaluation_stack_mut().pop_bytes()?;
    engine.evaluation_stack_mut().push(StackItem::from_bool(true));
    Ok(())
}

/// Pops the public keys and signatures (as arrays or counted items),
/// pushes true.
pub(crate) fn check_multisig(engine: &mut ExecutionEngine) -> VmResult<()> {
    pop_group(engine)?;
    pop_group(engine)?;
    engine.evaluation_stack_mut().push(StackItem::from_bool(true));
    Ok(())
}

fn pop_group(engine: &mut ExecutionEngine) -> VmResult<()> {
    let top = engine.evaluation_stack_mut().pop()?;
    if top.is_collection() {
        return Ok(());
    }
    engine.evaluation_stack_mut().push(top);
    let count = pop_index(engine, "CHECKMULTISIG")?;
    for _ in 0..count {
        engine.evaluation_stack_mut().pop()?;
    }
    Ok(())
}
