//! # Neo Debugger
//!
//! Core of a source-level debugger and emulator for Neo smart contracts.
//!
//! The [`DebugManager`] façade loads a compiled `.avm` with its sibling
//! artifacts (`.abi.json`, `.debug.json`, `.chain`), deploys the bytecode
//! onto a simulated blockchain, and drives an [`Emulator`] step by step.
//! Each step advances the VM one instruction, meters gas, and yields a
//! [`DebuggerState`] suitable for a UI: Running, Break, Finished or
//! Exception. Breakpoints are placed by source line (through the debug map)
//! or by assembly line (through the disassembler), depending on the active
//! view mode.
//!
//! ## Example
//!
//! ```rust,no_run
//! use neo_debugger::{DebugManager, DebuggerStateKind};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), neo_debugger::DebuggerError> {
//! let manager = DebugManager::new();
//! manager.load_avm(Path::new("contract.avm"))?;
//!
//! manager.add_breakpoint(42)?;
//! let result = manager.run()?;
//!
//! if result.state.kind == DebuggerStateKind::Break {
//!     println!("paused at line {:?}", result.line);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

/// Contract ABI parsing
pub mod abi;
/// Invocation arguments and loader-script marshalling
pub mod args;
/// Offset <-> source-line resolution
pub mod debug_map;
/// Bytecode disassembly and the assembly view
pub mod disassembler;
/// The gas-metering stepper
pub mod emulator;
/// Debugger error types
pub mod error;
/// The standard syscall surface
pub mod interop;
/// The session façade
pub mod manager;
/// Per-opcode and per-line cost accounting
pub mod profiler;

pub use abi::{AbiFunction, AbiParameter, AbiType, ContractAbi};
pub use args::ContractArg;
pub use debug_map::{DebugMap, DebugMapEntry};
pub use disassembler::{DisassembledInstruction, Disassembler};
pub use emulator::{DebuggerState, DebuggerStateKind, Emulator};
pub use error::{DebuggerError, DebuggerResult};
pub use interop::{
    default_interop_service, InteropState, RuntimeEvent, SharedInteropState, TriggerType,
    WitnessMode,
};
pub use manager::{DebugManager, DebugMode, DebugParameters, StepResult};
pub use profiler::{LineStats, OpcodeStats, Profiler, STORAGE_OPCODE};
