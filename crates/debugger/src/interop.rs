//! Standard syscall surface of the emulator.
//!
//! Handlers are registered explicitly into an `InteropService` and close
//! over a shared [`InteropState`]: the simulated blockchain, the executing
//! address, the current transaction, and the debugger overrides. Everything
//! a syscall observes or mutates goes through that state, which keeps each
//! step's side effects serialized with the stepper loop.

use neo_debugger_chain::{Blockchain, Transaction, TransactionOutput, SECONDS_PER_BLOCK};
use neo_debugger_vm::{
    ExecutionEngine, InteropInterface, InteropService, StackItem, VmError, VmResult,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Debugger override controlling `CheckWitness` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WitnessMode {
    /// The simulated chain treats every requested witness as present.
    #[default]
    Default,
    AlwaysTrue,
    AlwaysFalse,
}

/// Execution context hint for the contract under debug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TriggerType {
    Verification = 0x00,
    #[default]
    Application = 0x10,
}

/// A runtime notification or log emitted by the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    Log(String),
    Notify(String),
}

/// Emulator-visible state shared with the registered syscall handlers.
pub struct InteropState {
    /// The simulated chain syscalls read and write
    pub blockchain: Arc<Mutex<Blockchain>>,

    /// Script hash of the executing contract address
    pub script_hash: Vec<u8>,

    /// The transaction serving as script container
    pub transaction: Transaction,

    /// Override for CheckWitness results
    pub witness_mode: WitnessMode,

    /// Trigger reported to the contract
    pub trigger: TriggerType,

    /// Timestamp override for Runtime.GetTime
    pub timestamp: Option<u64>,

    /// Notifications and logs emitted so far
    pub events: Vec<RuntimeEvent>,

    /// Size of the value written by the most recent Storage.Put
    pub last_storage_bytes: usize,
}

impl InteropState {
    /// Creates state bound to a chain, with default overrides.
    pub fn new(blockchain: Arc<Mutex<Blockchain>>) -> Self {
        Self {
            blockchain,
            script_hash: Vec::new(),
            transaction: Transaction::new(),
            witness_mode: WitnessMode::default(),
            trigger: TriggerType::default(),
            timestamp: None,
            events: Vec::new(),
            last_storage_bytes: 0,
        }
    }
}

/// Shared handle to the interop state.
pub type SharedInteropState = Arc<Mutex<InteropState>>;

/// The storage context pushed by `Storage.GetContext`.
#[derive(Debug, Clone)]
pub struct StorageContextInterface {
    pub script_hash: Vec<u8>,
}

impl InteropInterface for StorageContextInterface {
    fn interface_type(&self) -> &str {
        "StorageContext"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A transaction handle pushed by `ExecutionEngine.GetScriptContainer`.
#[derive(Debug, Clone)]
pub struct TransactionInterface(pub Transaction);

impl InteropInterface for TransactionInterface {
    fn interface_type(&self) -> &str {
        "Transaction"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A transaction output handle.
#[derive(Debug, Clone)]
pub struct OutputInterface(pub TransactionOutput);

impl InteropInterface for OutputInterface {
    fn interface_type(&self) -> &str {
        "TransactionOutput"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A block header handle pushed by `Blockchain.GetHeader`.
#[derive(Debug, Clone)]
pub struct HeaderInterface {
    pub index: u32,
    pub timestamp: u64,
    pub hash: Vec<u8>,
}

impl InteropInterface for HeaderInterface {
    fn interface_type(&self) -> &str {
        "Header"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn pop_interface<T: Clone + 'static>(engine: &mut ExecutionEngine, expected: &str) -> VmResult<T> {
    let item = engine.evaluation_stack_mut().pop()?;
    match &item {
        StackItem::InteropInterface(interface) => interface
            .as_any()
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| VmError::invalid_type(interface.interface_type().to_string(), expected.to_string())),
        other => Err(VmError::invalid_type(
            other.type_name().to_string(),
            expected.to_string(),
        )),
    }
}

fn register_aliased<F>(
    service: &mut InteropService,
    prefixes: &[&str],
    suffix: &str,
    price: f64,
    handler: F,
) where
    F: Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync + Clone + 'static,
{
    for prefix in prefixes {
        service.register(&format!("{prefix}.{suffix}"), price, handler.clone());
    }
}

const RUNTIME_PREFIXES: &[&str] = &["Neo", "System"];
const LEGACY_PREFIXES: &[&str] = &["Neo", "AntShares"];

/// Builds the registry of standard syscalls, all closing over `state`.
///
/// Gas prices are base costs; the stepper applies the storage-size
/// multiplier to `Storage.Put` on top.
pub fn default_interop_service(state: SharedInteropState) -> InteropService {
    let mut service = InteropService::new();

    // --- Runtime ---

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Runtime.GetTrigger",
        0.001,
        move |engine| {
            let trigger = shared.lock().trigger as u8;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_int(trigger));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Runtime.CheckWitness",
        0.2,
        move |engine| {
            let _hash_or_pubkey = engine.evaluation_stack_mut().pop_bytes()?;
            let result = match shared.lock().witness_mode {
                WitnessMode::AlwaysFalse => false,
                // On the simulated chain every requested witness is present
                WitnessMode::Default | WitnessMode::AlwaysTrue => true,
            };
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_bool(result));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Runtime.Notify",
        0.001,
        move |engine| {
            let item = engine.evaluation_stack_mut().pop()?;
            let rendered = format!("{item:?}");
            tracing::debug!(event = %rendered, "runtime notify");
            shared.lock().events.push(RuntimeEvent::Notify(rendered));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Runtime.Log",
        0.001,
        move |engine| {
            let bytes = engine.evaluation_stack_mut().pop_bytes()?;
            let message = String::from_utf8_lossy(&bytes).into_owned();
            tracing::info!(message = %message, "contract log");
            shared.lock().events.push(RuntimeEvent::Log(message));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Runtime.GetTime",
        0.001,
        move |engine| {
            let state = shared.lock();
            let time = state.timestamp.unwrap_or_else(|| {
                state.blockchain.lock().current_block().timestamp + SECONDS_PER_BLOCK
            });
            drop(state);
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_int(time));
            Ok(true)
        },
    );

    // --- Blockchain ---

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Blockchain.GetHeight",
        0.001,
        move |engine| {
            let height = shared.lock().blockchain.lock().current_height();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_int(height));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Blockchain.GetHeader",
        0.01,
        move |engine| {
            let selector = engine.evaluation_stack_mut().pop()?;
            let state = shared.lock();
            let blockchain = state.blockchain.lock();
            let block = match &selector {
                StackItem::ByteArray(bytes) if bytes.len() == 32 => blockchain
                    .blocks()
                    .iter()
                    .find(|block| block.hash() == *bytes),
                item => {
                    let height = item.as_int()?;
                    u32::try_from(height)
                        .ok()
                        .and_then(|height| blockchain.block(height))
                }
            };
            let Some(block) = block else {
                return Ok(false);
            };
            let header = HeaderInterface {
                index: block.index,
                timestamp: block.timestamp,
                hash: block.hash(),
            };
            drop(blockchain);
            drop(state);
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_interface(header));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Header.GetTimestamp",
        0.001,
        move |engine| {
            let header: HeaderInterface = pop_interface(engine, "Header")?;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_int(header.timestamp));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Header.GetIndex",
        0.001,
        move |engine| {
            let header: HeaderInterface = pop_interface(engine, "Header")?;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_int(header.index));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Header.GetHash",
        0.001,
        move |engine| {
            let header: HeaderInterface = pop_interface(engine, "Header")?;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_byte_array(header.hash));
            Ok(true)
        },
    );

    // --- Storage ---

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Storage.GetContext",
        0.001,
        move |engine| {
            let script_hash = shared.lock().script_hash.clone();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_interface(StorageContextInterface {
                    script_hash,
                }));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Storage.Get",
        0.1,
        move |engine| {
            let context: StorageContextInterface = pop_interface(engine, "StorageContext")?;
            let key = engine.evaluation_stack_mut().pop_bytes()?;
            let value = shared
                .lock()
                .blockchain
                .lock()
                .find_address_by_script_hash(&context.script_hash)
                .and_then(|address| address.storage_get(&key))
                .unwrap_or_default();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_byte_array(value));
            Ok(true)
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Storage.Put",
        1.0,
        move |engine| {
            let context: StorageContextInterface = pop_interface(engine, "StorageContext")?;
            let key = engine.evaluation_stack_mut().pop_bytes()?;
            let value = engine.evaluation_stack_mut().pop_bytes()?;
            let mut state = shared.lock();
            state.last_storage_bytes = value.len();
            let mut blockchain = state.blockchain.lock();
            match blockchain.find_address_by_script_hash_mut(&context.script_hash) {
                Some(address) => {
                    address.storage_put(&key, &value);
                    Ok(true)
                }
                None => Ok(false),
            }
        },
    );

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        RUNTIME_PREFIXES,
        "Storage.Delete",
        1.0,
        move |engine| {
            let context: StorageContextInterface = pop_interface(engine, "StorageContext")?;
            let key = engine.evaluation_stack_mut().pop_bytes()?;
            let state = shared.lock();
            let mut blockchain = state.blockchain.lock();
            match blockchain.find_address_by_script_hash_mut(&context.script_hash) {
                Some(address) => {
                    address.storage_delete(&key);
                    Ok(true)
                }
                None => Ok(false),
            }
        },
    );

    // --- Script container ---

    let shared = Arc::clone(&state);
    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "ExecutionEngine.GetScriptContainer",
        0.001,
        move |engine| {
            let transaction = shared.lock().transaction.clone();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_interface(TransactionInterface(transaction)));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "ExecutionEngine.GetExecutingScriptHash",
        0.001,
        move |engine| {
            let hash = engine
                .current_context()
                .map(|context| context.script_hash().to_vec())
                .unwrap_or_default();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_byte_array(hash));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Transaction.GetHash",
        0.001,
        move |engine| {
            let transaction: TransactionInterface = pop_interface(engine, "Transaction")?;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_byte_array(transaction.0.hash()));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Transaction.GetOutputs",
        0.001,
        move |engine| {
            let transaction: TransactionInterface = pop_interface(engine, "Transaction")?;
            let outputs = transaction
                .0
                .outputs
                .iter()
                .map(|output| StackItem::from_interface(OutputInterface(output.clone())))
                .collect();
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_array(outputs));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Output.GetValue",
        0.001,
        move |engine| {
            let output: OutputInterface = pop_interface(engine, "TransactionOutput")?;
            // Fixed8 representation
            let value = (output.0.amount * 100_000_000.0).round() as i64;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_int(value));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Output.GetScriptHash",
        0.001,
        move |engine| {
            let output: OutputInterface = pop_interface(engine, "TransactionOutput")?;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_byte_array(output.0.to_script_hash));
            Ok(true)
        },
    );

    register_aliased(
        &mut service,
        LEGACY_PREFIXES,
        "Output.GetAssetId",
        0.001,
        move |engine| {
            let output: OutputInterface = pop_interface(engine, "TransactionOutput")?;
            engine
                .evaluation_stack_mut()
                .push(StackItem::from_byte_array(output.0.asset_id));
            Ok(true)
        },
    );

    service
}
