//! # Neo Debugger VM
//!
//! A Neo 2.x virtual machine interpreter built for source-level debugging.
//!
//! The engine executes contract bytecode one instruction at a time, keeps
//! per-script breakpoints, and dispatches SYSCALL instructions through an
//! explicit interop registry. It is deliberately single-threaded: one
//! debugger session owns one engine.
//!
//! ## Example
//!
//! ```rust
//! use neo_debugger_vm::{ExecutionEngine, InteropService};
//!
//! // PUSH1 PUSH2 ADD RET
//! let mut engine = ExecutionEngine::new(InteropService::new());
//! engine.load_script(vec![0x51, 0x52, 0x93, 0x66]).unwrap();
//!
//! while !engine.state().is_halt() && !engine.state().is_fault() {
//!     engine.step_into();
//! }
//!
//! let top = engine.evaluation_stack().peek(0).unwrap();
//! assert_eq!(top.as_int().unwrap(), 3.into());
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

/// VM error types and result handling
pub mod error;
/// Evaluation and alt stack implementation
pub mod evaluation_stack;
/// Invocation context of a running script
pub mod execution_context;
/// The stepping interpreter
pub mod execution_engine;
/// Decoded instruction representation
pub mod instruction;
/// Interop (syscall) registry
pub mod interop_service;
/// OpCode definitions and operand layouts
pub mod op_code;
/// Instruction dispatch, grouped by opcode family
pub mod ops;
/// Script bytes with cached instruction boundaries
pub mod script;
/// Programmatic bytecode construction
pub mod script_builder;
/// Values manipulated by the interpreter
pub mod stack_item;
/// VM state flags
pub mod vm_state;

pub use error::{VmError, VmResult};
pub use evaluation_stack::EvaluationStack;
pub use execution_context::ExecutionContext;
pub use execution_engine::{
    ExecutionEngine, ExecutionEngineLimits, ScriptContainer, ScriptTable,
};
pub use instruction::Instruction;
pub use interop_service::{InteropDescriptor, InteropHandler, InteropService};
pub use op_code::{OpCode, OperandSize};
pub use script::{script_hash, Script, SCRIPT_HASH_SIZE};
pub use script_builder::ScriptBuilder;
pub use stack_item::{InteropInterface, StackItem};
pub use vm_state::VMState;
