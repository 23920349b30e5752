//! Execution engine for the Neo debugger VM.
//!
//! A single-stepping interpreter over an invocation-context stack, with
//! per-script breakpoints and SYSCALL dispatch through the interop registry.

use crate::error::{VmError, VmResult};
use crate::evaluation_stack::EvaluationStack;
use crate::execution_context::ExecutionContext;
use crate::instruction::Instruction;
use crate::interop_service::InteropService;
use crate::op_code::OpCode;
use crate::ops;
use crate::script::{Script, SCRIPT_HASH_SIZE};
use crate::vm_state::VMState;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Resolves 20-byte script hashes to contract bytecode for APPCALL/TAILCALL.
pub trait ScriptTable: Send + Sync {
    /// Returns the bytecode deployed under `script_hash`, if any.
    fn get_script(&self, script_hash: &[u8]) -> Option<Vec<u8>>;
}

/// The transaction-like object the VM considers "the signed message".
///
/// Interop handlers downcast through `as_any` to reach concrete fields.
pub trait ScriptContainer: Send + Sync {
    /// Returns the container hash.
    fn container_hash(&self) -> Vec<u8>;

    /// Allows downcasting to the concrete container type.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Restrictions on the VM.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionEngineLimits {
    /// Maximum depth of the invocation stack.
    pub max_invocation_stack_size: usize,

    /// Maximum size of a byte array or string item.
    pub max_item_size: usize,

    /// Maximum size in bytes of integers used in arithmetic.
    pub max_integer_size: usize,

    /// Maximum number of elements in an array produced by PACK/NEWARRAY.
    pub max_array_size: usize,

    /// Maximum shift amount for SHL/SHR.
    pub max_shift: u32,
}

impl Default for ExecutionEngineLimits {
    fn default() -> Self {
        Self {
            max_invocation_stack_size: 1024,
            max_item_size: 1024 * 1024,
            max_integer_size: 32,
            max_array_size: 1024,
            max_shift: 256,
        }
    }
}

/// The execution engine for the Neo VM.
pub struct ExecutionEngine {
    /// The current state of the VM
    state: VMState,

    /// Set by flow-control handlers that manage the instruction pointer
    /// themselves
    is_jumping: bool,

    /// Restrictions on the VM
    limits: ExecutionEngineLimits,

    /// The invocation stack of the VM
    invocation_stack: Vec<ExecutionContext>,

    /// The evaluation stack, shared across invocation contexts
    evaluation_stack: EvaluationStack,

    /// The auxiliary alt stack
    alt_stack: EvaluationStack,

    /// Breakpoint offsets, keyed by script hash
    breakpoints: HashMap<Vec<u8>, HashSet<usize>>,

    /// Registry used for SYSCALL dispatch
    interop_service: InteropService,

    /// Resolves APPCALL/TAILCALL target hashes to bytecode
    script_table: Option<Arc<dyn ScriptTable>>,

    /// The signed message visible to interop handlers
    script_container: Option<Arc<dyn ScriptContainer>>,

    /// The opcode executed by the most recent step
    last_opcode: Option<OpCode>,

    /// The syscall name resolved by the most recent SYSCALL step
    last_syscall: Option<String>,
}

impl ExecutionEngine {
    /// Creates a new execution engine with the given interop registry.
    pub fn new(interop_service: InteropService) -> Self {
        Self {
            state: VMState::NONE,
            is_jumping: false,
            limits: ExecutionEngineLimits::default(),
            invocation_stack: Vec::new(),
            evaluation_stack: EvaluationStack::new(),
            alt_stack: EvaluationStack::new(),
            breakpoints: HashMap::new(),
            interop_service,
            script_table: None,
            script_container: None,
            last_opcode: None,
            last_syscall: None,
        }
    }

    /// Assigns the script table used to resolve contract calls.
    pub fn set_script_table(&mut self, table: Arc<dyn ScriptTable>) {
        self.script_table = Some(table);
    }

    /// Assigns the script container.
    pub fn set_script_container(&mut self, container: Arc<dyn ScriptContainer>) {
        self.script_container = Some(container);
    }

    /// Returns the script container, if assigned.
    pub fn script_container(&self) -> Option<&Arc<dyn ScriptContainer>> {
        self.script_container.as_ref()
    }

    /// Returns the current state of the VM.
    pub fn state(&self) -> VMState {
        self.state
    }

    /// Clears the BREAK flag so the next step resumes.
    pub fn clear_break(&mut self) {
        self.state.remove(VMState::BREAK);
    }

    /// Returns the execution limits configured for this engine.
    pub fn limits(&self) -> &ExecutionEngineLimits {
        &self.limits
    }

    /// Returns the invocation stack, bottom first.
    pub fn invocation_stack(&self) -> &[ExecutionContext] {
        &self.invocation_stack
    }

    /// Returns the current context, if any.
    pub fn current_context(&self) -> Option<&ExecutionContext> {
        self.invocation_stack.last()
    }

    /// Returns the current context (mutable), if any.
    pub fn current_context_mut(&mut self) -> Option<&mut ExecutionContext> {
        self.invocation_stack.last_mut()
    }

    /// Returns the entry context, if any.
    pub fn entry_context(&self) -> Option<&ExecutionContext> {
        self.invocation_stack.first()
    }

    /// Returns the evaluation stack.
    pub fn evaluation_stack(&self) -> &EvaluationStack {
        &self.evaluation_stack
    }

    /// Returns the evaluation stack (mutable).
    pub fn evaluation_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.evaluation_stack
    }

    /// Returns the alt stack.
    pub fn alt_stack(&self) -> &EvaluationStack {
        &self.alt_stack
    }

    /// Returns the alt stack (mutable).
    pub fn alt_stack_mut(&mut self) -> &mut EvaluationStack {
        &mut self.alt_stack
    }

    /// Returns the interop registry (mutable), for dynamic registration.
    pub fn interop_service_mut(&mut self) -> &mut InteropService {
        &mut self.interop_service
    }

    /// Returns the interop registry.
    pub fn interop_service(&self) -> &InteropService {
        &self.interop_service
    }

    /// Returns the opcode executed by the most recent step.
    pub fn last_opcode(&self) -> Option<OpCode> {
        self.last_opcode
    }

    /// Returns the syscall name resolved by the most recent SYSCALL step.
    pub fn last_syscall(&self) -> Option<&str> {
        self.last_syscall.as_deref()
    }

    /// Pushes a new invocation context executing `bytes` from position 0.
    pub fn load_script(&mut self, bytes: Vec<u8>) -> VmResult<()> {
        let script = Arc::new(Script::new(bytes));
        self.push_context(ExecutionContext::new(script))
    }

    /// Adds a breakpoint at `position` in the currently-top script.
    pub fn add_breakpoint(&mut self, position: usize) {
        if let Some(context) = self.invocation_stack.last() {
            let hash = context.script_hash().to_vec();
            self.add_breakpoint_for(&hash, position);
        }
    }

    /// Removes a breakpoint from the currently-top script.
    pub fn remove_breakpoint(&mut self, position: usize) {
        if let Some(context) = self.invocation_stack.last() {
            let hash = context.script_hash().to_vec();
            self.remove_breakpoint_for(&hash, position);
        }
    }

    /// Adds a breakpoint at `position` in the script with the given hash.
    pub fn add_breakpoint_for(&mut self, script_hash: &[u8], position: usize) {
        self.breakpoints
            .entry(script_hash.to_vec())
            .or_default()
            .insert(position);
    }

    /// Removes a breakpoint from the script with the given hash.
    pub fn remove_breakpoint_for(&mut self, script_hash: &[u8], position: usize) {
        if let Some(positions) = self.breakpoints.get_mut(script_hash) {
            positions.remove(&position);
        }
    }

    /// Clears all breakpoints.
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    fn is_breakpoint(&self, script_hash: &[u8], position: usize) -> bool {
        self.breakpoints
            .get(script_hash)
            .is_some_and(|positions| positions.contains(&position))
    }

    /// Executes one instruction in the top context.
    ///
    /// Advances the instruction pointer past the instruction and its inline
    /// operand, then raises BREAK when the new position is a breakpoint. On
    /// a fault the pointer is left at the faulting offset.
    pub fn step_into(&mut self) -> VMState {
        if self.state.is_halt() || self.state.is_fault() {
            return self.state;
        }

        if let Err(err) = self.execute_next() {
            log::debug!("VM fault: {err}");
            self.state.insert(VMState::FAULT);
        }

        if !self.state.is_halt() && !self.state.is_fault() {
            if let Some(context) = self.current_context() {
                if self.is_breakpoint(context.script_hash(), context.instruction_pointer()) {
                    self.state.insert(VMState::BREAK);
                }
            }
        }

        self.state
    }

    fn execute_next(&mut self) -> VmResult<()> {
        // A step that only unwinds finished contexts executes no opcode
        self.last_opcode = None;

        // Unwind contexts whose pointer has run off the end of the script.
        // An implicit RET does not consume the step; execution continues in
        // the caller unless it sits on a breakpoint.
        loop {
            let Some(context) = self.invocation_stack.last() else {
                self.state.insert(VMState::HALT);
                return Ok(());
            };
            if context.instruction_pointer() < context.script().len() {
                break;
            }
            self.invocation_stack.pop();
            match self.invocation_stack.last() {
                None => {
                    self.state.insert(VMState::HALT);
                    return Ok(());
                }
                Some(context) => {
                    if self.is_breakpoint(context.script_hash(), context.instruction_pointer()) {
                        self.state.insert(VMState::BREAK);
                        return Ok(());
                    }
                }
            }
        }

        let context = self
            .invocation_stack
            .last()
            .ok_or_else(|| VmError::invalid_operation("step", "no current context"))?;
        let instruction = Instruction::parse(context.script().bytes(), context.instruction_pointer())?;

        self.last_opcode = Some(instruction.opcode());
        self.is_jumping = false;

        ops::execute(self, &instruction)?;

        if !self.is_jumping {
            if let Some(context) = self.invocation_stack.last_mut() {
                context.set_instruction_pointer(instruction.pointer() + instruction.size());
            }
        }

        Ok(())
    }

    fn push_context(&mut self, context: ExecutionContext) -> VmResult<()> {
        if self.invocation_stack.len() >= self.limits.max_invocation_stack_size {
            return Err(VmError::CallDepthExceeded {
                depth: self.invocation_stack.len(),
                limit: self.limits.max_invocation_stack_size,
            });
        }
        self.invocation_stack.push(context);
        Ok(())
    }

    fn jump_target(&self, instruction: &Instruction) -> VmResult<usize> {
        let offset = instruction.jump_offset()? as i64;
        let target = instruction.pointer() as i64 + offset;
        let script_len = self
            .current_context()
            .map(|context| context.script().len())
            .unwrap_or(0);
        if target < 0 || target > script_len as i64 {
            return Err(VmError::InvalidJump { target });
        }
        Ok(target as usize)
    }

    /// Transfers control within the current script.
    pub(crate) fn jump(&mut self, instruction: &Instruction) -> VmResult<()> {
        let target = self.jump_target(instruction)?;
        let context = self
            .current_context_mut()
            .ok_or_else(|| VmError::invalid_operation("JMP", "no current context"))?;
        context.set_instruction_pointer(target);
        self.is_jumping = true;
        Ok(())
    }

    /// Pushes a new context at the target offset of the current script.
    pub(crate) fn call(&mut self, instruction: &Instruction) -> VmResult<()> {
        let target = self.jump_target(instruction)?;
        let return_position = instruction.pointer() + instruction.size();
        let context = self
            .current_context_mut()
            .ok_or_else(|| VmError::invalid_operation("CALL", "no current context"))?;
        context.set_instruction_pointer(return_position);

        let script = context.script_arc();
        let mut callee = ExecutionContext::new(script);
        callee.set_instruction_pointer(target);
        self.push_context(callee)?;
        self.is_jumping = true;
        Ok(())
    }

    /// Pops the current invocation context.
    pub(crate) fn ret(&mut self) {
        self.invocation_stack.pop();
        if self.invocation_stack.is_empty() {
            self.state.insert(VMState::HALT);
        }
        self.is_jumping = true;
    }

    /// Invokes the contract named by the instruction operand. A zero hash
    /// resolves dynamically from the evaluation stack. `tail` replaces the
    /// current context instead of stacking a new one.
    pub(crate) fn app_call(&mut self, instruction: &Instruction, tail: bool) -> VmResult<()> {
        let mut hash = instruction.operand().to_vec();
        if hash.iter().all(|&byte| byte == 0) {
            hash = self.evaluation_stack.pop_bytes()?;
            if hash.len() != SCRIPT_HASH_SIZE {
                return Err(VmError::invalid_operation(
                    "APPCALL",
                    "dynamic script hash must be 20 bytes",
                ));
            }
        }

        let table = self
            .script_table
            .as_ref()
            .ok_or_else(|| VmError::invalid_operation("APPCALL", "no script table"))?;
        let bytes = table
            .get_script(&hash)
            .ok_or_else(|| VmError::ScriptNotFound {
                hash: hex::encode(&hash),
            })?;

        let return_position = instruction.pointer() + instruction.size();
        if tail {
            self.invocation_stack.pop();
        } else if let Some(context) = self.current_context_mut() {
            context.set_instruction_pointer(return_position);
        }

        let script = Arc::new(Script::new(bytes));
        self.push_context(ExecutionContext::new(script))?;
        self.is_jumping = true;
        Ok(())
    }

    /// Dispatches a SYSCALL through the interop registry.
    pub(crate) fn syscall(&mut self, instruction: &Instruction) -> VmResult<()> {
        let name = instruction.syscall_name()?;
        self.last_syscall = Some(name.clone());

        // The registry is detached during the call so the handler can borrow
        // the engine mutably.
        let service = std::mem::take(&mut self.interop_service);
        let result = service.invoke(self, &name);
        self.interop_service = service;

        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(VmError::SyscallFailed { name }),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack_item::StackItem;
    use num_bigint::BigInt;

    fn engine_with(script: Vec<u8>) -> ExecutionEngine {
        let mut engine = ExecutionEngine::new(InteropService::new());
        engine.load_script(script).unwrap();
        engine
    }

    fn run(engine: &mut ExecutionEngine) -> VMState {
        loop {
            let state = engine.step_into();
            if state.is_halt() || state.is_fault() || state.is_break() {
                return state;
            }
        }
    }

    #[test]
    fn test_push_add_halt() {
        // PUSH1 PUSH2 ADD RET
        let mut engine = engine_with(vec![0x51, 0x52, 0x93, 0x66]);
        let state = run(&mut engine);
        assert!(state.is_halt());
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(3)
        );
    }

    #[test]
    fn test_divide_by_zero_faults_at_offset() {
        // PUSH1 PUSH0 DIV RET
        let mut engine = engine_with(vec![0x51, 0x00, 0x96, 0x66]);
        let state = run(&mut engine);
        assert!(state.is_fault());
        assert_eq!(
            engine.current_context().unwrap().instruction_pointer(),
            2
        );
        assert_eq!(engine.last_opcode(), Some(OpCode::DIV));
    }

    #[test]
    fn test_breakpoint_halts_at_exact_offset() {
        // PUSH1 PUSH2 ADD PUSH3 MUL RET
        let mut engine = engine_with(vec![0x51, 0x52, 0x93, 0x53, 0x95, 0x66]);
        engine.add_breakpoint(4);
        let state = run(&mut engine);
        assert!(state.is_break());
        assert_eq!(engine.current_context().unwrap().instruction_pointer(), 4);

        engine.clear_break();
        let state = run(&mut engine);
        assert!(state.is_halt());
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(9)
        );
    }

    #[test]
    fn test_loader_script_feeds_contract() {
        // Contract: ADD RET, loader pushes 5 then 2
        let mut engine = ExecutionEngine::new(InteropService::new());
        engine.load_script(vec![0x93, 0x66]).unwrap();
        engine.load_script(vec![0x55, 0x52]).unwrap();
        let state = run(&mut engine);
        assert!(state.is_halt());
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(7)
        );
    }

    #[test]
    fn test_call_and_ret() {
        // 0: CALL +5 -> 5
        // 3: RET          (returns to caller of the whole script)
        // 4: (padding) NOP
        // 5: PUSH7 RET
        let mut engine = engine_with(vec![0x65, 0x05, 0x00, 0x66, 0x61, 0x57, 0x66]);
        let state = run(&mut engine);
        assert!(state.is_halt());
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(7)
        );
    }

    #[test]
    fn test_jmp_skips_instruction() {
        // 0: JMP +4 -> 4, 3: PUSH1 (skipped), 4: PUSH2 RET
        let mut engine = engine_with(vec![0x62, 0x04, 0x00, 0x51, 0x52, 0x66]);
        let state = run(&mut engine);
        assert!(state.is_halt());
        assert_eq!(engine.evaluation_stack().len(), 1);
        assert_eq!(
            engine.evaluation_stack().peek(0).unwrap().as_int().unwrap(),
            BigInt::from(2)
        );
    }

    #[test]
    fn test_syscall_sets_last_syscall() {
        let mut service = InteropService::new();
        service.register("Test.Echo", 0.5, |engine| {
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_bool(true));
            Ok(true)
        });

        let name = b"Test.Echo";
        let mut script = vec![0x68, name.len() as u8];
        script.extend_from_slice(name);
        script.push(0x66);

        let mut engine = ExecutionEngine::new(service);
        engine.load_script(script).unwrap();
        let state = run(&mut engine);
        assert!(state.is_halt());
        assert_eq!(engine.last_syscall(), Some("Test.Echo"));
    }

    #[test]
    fn test_unregistered_syscall_faults() {
        let name = b"No.Such.Call";
        let mut script = vec![0x68, name.len() as u8];
        script.extend_from_slice(name);
        let mut engine = engine_with(script);
        let state = run(&mut engine);
        assert!(state.is_fault());
        assert_eq!(engine.last_syscall(), Some("No.Such.Call"));
    }

    #[test]
    fn test_invalid_opcode_faults() {
        let mut engine = engine_with(vec![0x50]);
        let state = run(&mut engine);
        assert!(state.is_fault());
    }
}
