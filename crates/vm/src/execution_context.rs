//! Invocation context for the Neo debugger VM.

use crate::script::Script;
use std::sync::Arc;

/// Represents one entry of the invocation stack: a script and the
/// instruction pointer within it.
///
/// Evaluation and alt stacks are engine-owned and shared across contexts,
/// which is what allows a loader script to leave arguments for the contract
/// script below it.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    script: Arc<Script>,
    instruction_pointer: usize,
}

impl ExecutionContext {
    /// Creates a new context at the start of `script`.
    pub fn new(script: Arc<Script>) -> Self {
        Self {
            script,
            instruction_pointer: 0,
        }
    }

    /// Returns the script executed by this context.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Returns a shared handle to the script.
    pub fn script_arc(&self) -> Arc<Script> {
        Arc::clone(&self.script)
    }

    /// Returns the 20-byte hash of the script.
    pub fn script_hash(&self) -> &[u8] {
        self.script.hash()
    }

    /// Returns the current instruction pointer.
    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    /// Sets the instruction pointer.
    pub fn set_instruction_pointer(&mut self, position: usize) {
        self.instruction_pointer = position;
    }
}
