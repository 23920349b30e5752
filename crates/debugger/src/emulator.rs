//! The emulator: a gas-metering stepper around the execution engine.
//!
//! Owns the engine, the executing address, the current transaction, the
//! breakpoint set and the gas counters, and translates engine flags into
//! observable debugger states.

use crate::args::ContractArg;
use crate::error::{DebuggerError, DebuggerResult};
use crate::interop::{
    default_interop_service, InteropState, RuntimeEvent, SharedInteropState, TriggerType,
    WitnessMode,
};
use crate::profiler::{Profiler, STORAGE_OPCODE};
use neo_debugger_chain::{Blockchain, Transaction};
use neo_debugger_vm::{
    ExecutionEngine, InteropService, OpCode, ScriptBuilder, ScriptTable, StackItem, VmResult,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The observable kind of a debugger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerStateKind {
    /// No contract is loaded or the emulator was never reset.
    Invalid,
    /// Counters are zeroed and execution is rewound to offset 0.
    Reset,
    /// The last step executed normally.
    Running,
    /// The script halted.
    Finished,
    /// The VM faulted; the offset is the faulting instruction.
    Exception,
    /// Execution is paused at a breakpoint.
    Break,
}

/// One observable debugger state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerState {
    pub kind: DebuggerStateKind,
    pub offset: usize,
}

impl DebuggerState {
    fn new(kind: DebuggerStateKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Resolves APPCALL targets against the simulated chain.
struct BlockchainScriptTable(Arc<Mutex<Blockchain>>);

impl ScriptTable for BlockchainScriptTable {
    fn get_script(&self, script_hash: &[u8]) -> Option<Vec<u8>> {
        self.0
            .lock()
            .find_address_by_script_hash(script_hash)
            .and_then(|address| address.byte_code().map(<[u8]>::to_vec))
    }
}

/// Steps a contract while tracking gas, breakpoints and debugger state.
pub struct Emulator {
    blockchain: Arc<Mutex<Blockchain>>,
    contract_hash: Vec<u8>,
    interop_state: SharedInteropState,
    interop_service: InteropService,
    engine: Option<ExecutionEngine>,

    /// Transaction to use for the next reset; consumed by it
    pending_transaction: Option<Transaction>,

    /// Breakpoint byte offsets into the contract script. Re-armed on the
    /// engine after every reset, because reset rebuilds the engine.
    breakpoints: BTreeSet<usize>,

    used_gas: f64,
    used_opcode_count: u64,
    last_state: DebuggerState,
    profiler: Profiler,
}

impl Emulator {
    /// Creates an emulator for the contract deployed under `contract_hash`.
    pub fn new(blockchain: Arc<Mutex<Blockchain>>, contract_hash: Vec<u8>) -> Self {
        let interop_state = Arc::new(Mutex::new(InteropState::new(Arc::clone(&blockchain))));
        let interop_service = default_interop_service(Arc::clone(&interop_state));
        Self {
            blockchain,
            contract_hash,
            interop_state,
            interop_service,
            engine: None,
            pending_transaction: None,
            breakpoints: BTreeSet::new(),
            used_gas: 0.0,
            used_opcode_count: 0,
            last_state: DebuggerState::new(DebuggerStateKind::Invalid, 0),
            profiler: Profiler::new(),
        }
    }

    /// Registers an additional syscall, available from the next reset and
    /// on the live engine.
    pub fn register_syscall<F>(&mut self, name: &str, price: f64, handler: F)
    where
        F: Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync + Clone + 'static,
    {
        self.interop_service.register(name, price, handler.clone());
        if let Some(engine) = self.engine.as_mut() {
            engine.interop_service_mut().register(name, price, handler);
        }
    }

    /// Returns the witness-mode override.
    pub fn witness_mode(&self) -> WitnessMode {
        self.interop_state.lock().witness_mode
    }

    /// Sets the witness-mode override.
    pub fn set_witness_mode(&mut self, mode: WitnessMode) {
        self.interop_state.lock().witness_mode = mode;
    }

    /// Sets the trigger reported to the contract.
    pub fn set_trigger(&mut self, trigger: TriggerType) {
        self.interop_state.lock().trigger = trigger;
    }

    /// Sets or clears the timestamp override for Runtime.GetTime.
    pub fn set_timestamp(&mut self, timestamp: Option<u64>) {
        self.interop_state.lock().timestamp = timestamp;
    }

    /// Stages a transaction for the next reset. Without one, reset
    /// synthesizes an empty transaction against the current block.
    pub fn set_transaction(&mut self, transaction: Transaction) {
        self.pending_transaction = Some(transaction);
    }

    /// Adds a breakpoint at a byte offset of the contract script.
    pub fn add_breakpoint(&mut self, offset: usize) {
        self.breakpoints.insert(offset);
        if let Some(engine) = self.engine.as_mut() {
            engine.add_breakpoint_for(&self.contract_hash, offset);
        }
    }

    /// Removes a breakpoint.
    pub fn remove_breakpoint(&mut self, offset: usize) {
        self.breakpoints.remove(&offset);
        if let Some(engine) = self.engine.as_mut() {
            engine.remove_breakpoint_for(&self.contract_hash, offset);
        }
    }

    /// Returns the breakpoint offsets.
    pub fn breakpoints(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Returns the gas consumed since the last reset.
    pub fn used_gas(&self) -> f64 {
        self.used_gas
    }

    /// Returns the number of opcodes executed since the last reset.
    pub fn used_opcode_count(&self) -> u64 {
        self.used_opcode_count
    }

    /// Returns the most recent debugger state.
    pub fn last_state(&self) -> DebuggerState {
        self.last_state
    }

    /// Returns the item on top of the evaluation stack, if any.
    pub fn result_value(&self) -> Option<StackItem> {
        self.engine
            .as_ref()
            .and_then(|engine| engine.evaluation_stack().peek(0).ok().cloned())
    }

    /// Returns the events emitted since the last reset.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.interop_state.lock().events.clone()
    }

    /// Returns the profiler.
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Returns the profiler (mutable).
    pub fn profiler_mut(&mut self) -> &mut Profiler {
        &mut self.profiler
    }

    /// Rewinds the emulator: zeroes the counters, rebuilds the engine with
    /// the (possibly synthesized) transaction as script container, loads
    /// the contract and an argument loader script, and re-arms all
    /// breakpoints. Idempotent when already in `Reset`.
    pub fn reset(&mut self, args: &[ContractArg]) -> DebuggerResult<()> {
        if self.last_state.kind == DebuggerStateKind::Reset {
            return Ok(());
        }

        self.used_gas = 0.0;
        self.used_opcode_count = 0;

        // A staged transaction is consumed here; the next reset without one
        // starts from a fresh transaction again, dropping its outputs
        let transaction = self
            .pending_transaction
            .take()
            .unwrap_or_else(Transaction::new);

        let byte_code = self
            .blockchain
            .lock()
            .find_address_by_script_hash(&self.contract_hash)
            .and_then(|address| address.byte_code().map(<[u8]>::to_vec))
            .ok_or_else(|| {
                DebuggerError::load(format!(
                    "no contract deployed under hash {}",
                    hex::encode(&self.contract_hash)
                ))
            })?;

        {
            let mut state = self.interop_state.lock();
            state.script_hash = self.contract_hash.clone();
            state.transaction = transaction.clone();
            state.events.clear();
            state.last_storage_bytes = 0;
        }

        let mut engine = ExecutionEngine::new(self.interop_service.clone());
        engine.set_script_table(Arc::new(BlockchainScriptTable(Arc::clone(&self.blockchain))));
        engine.set_script_container(Arc::new(transaction));
        engine.load_script(byte_code)?;

        // The loader supplies the arguments: pushed in reverse so the
        // contract pops them in declaration order
        let mut builder = ScriptBuilder::new();
        for arg in args.iter().rev() {
            arg.emit(&mut builder);
        }
        engine.load_script(builder.to_bytes())?;

        for &offset in &self.breakpoints {
            engine.add_breakpoint_for(&self.contract_hash, offset);
        }

        self.engine = Some(engine);
        self.last_state = DebuggerState::new(DebuggerStateKind::Reset, 0);
        tracing::debug!(args = args.len(), "emulator reset");
        Ok(())
    }

    /// Advances execution by one instruction and returns the new state.
    pub fn step(&mut self) -> DebuggerState {
        match self.last_state.kind {
            DebuggerStateKind::Finished | DebuggerStateKind::Invalid => return self.last_state,
            _ => {}
        }
        let Some(engine) = self.engine.as_mut() else {
            return self.last_state;
        };

        if self.last_state.kind == DebuggerStateKind::Reset {
            engine.clear_break();
        }

        engine.step_into();

        // On a fault mid-fetch there may be no context left; keep the
        // previous offset in that case
        let offset = engine
            .current_context()
            .map(|context| context.instruction_pointer())
            .unwrap_or(self.last_state.offset);

        if let Some(opcode) = engine.last_opcode() {
            let engine = self.engine.as_ref().expect("engine was just used");
            let (label, cost) = opcode_cost(engine, &self.interop_state, opcode);
            self.used_gas += cost;
            self.used_opcode_count += 1;
            self.profiler.on_step(&label, cost);
        }

        let engine = self.engine.as_mut().expect("engine was just used");
        let vm_state = engine.state();
        let kind = if vm_state.is_fault() {
            DebuggerStateKind::Exception
        } else if vm_state.is_break() {
            engine.clear_break();
            DebuggerStateKind::Break
        } else if vm_state.is_halt() {
            DebuggerStateKind::Finished
        } else {
            DebuggerStateKind::Running
        };

        self.last_state = DebuggerState::new(kind, offset);
        self.last_state
    }

    /// Steps until the state is no longer `Running` and returns the
    /// terminal state. A breakpoint placed at a reachable offset halts the
    /// loop at that offset.
    pub fn run(&mut self) -> DebuggerState {
        loop {
            let state = self.step();
            if state.kind != DebuggerStateKind::Running {
                return state;
            }
        }
    }
}

/// The opcode cost table. Literal pushes and NOP are free; signature checks
/// and hashes carry fixed costs; SYSCALL bills the registered interop
/// price, size-scaled for storage writes; everything else costs 0.001.
fn opcode_cost(
    engine: &ExecutionEngine,
    interop_state: &SharedInteropState,
    opcode: OpCode,
) -> (String, f64) {
    let label = opcode.to_string();
    if opcode.is_push() {
        return (label, 0.0);
    }
    match opcode {
        OpCode::CHECKSIG | OpCode::CHECKMULTISIG => (label, 0.1),
        OpCode::APPCALL | OpCode::TAILCALL | OpCode::SHA256 | OpCode::SHA1 => (label, 0.01),
        OpCode::HASH256 | OpCode::HASH160 => (label, 0.02),
        OpCode::NOP => (label, 0.0),
        OpCode::SYSCALL => {
            let Some(name) = engine.last_syscall() else {
                return (label, 0.0);
            };
            let base = engine.interop_service().price(name).unwrap_or(0.0);
            if name.ends_with("Storage.Put") {
                let bytes = {
                    let mut state = interop_state.lock();
                    std::mem::take(&mut state.last_storage_bytes)
                };
                let multiplier = bytes.div_ceil(1024).max(1);
                (STORAGE_OPCODE.to_string(), base * multiplier as f64)
            } else {
                (label, base)
            }
        }
        _ => (label, 0.001),
    }
}
