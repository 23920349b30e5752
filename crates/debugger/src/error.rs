//! Error types for the debugger core.
//!
//! VM faults are deliberately absent: they surface as
//! `DebuggerState::Exception` transitions, never as errors.

use neo_debugger_chain::ChainError;
use neo_debugger_vm::VmError;
use thiserror::Error;

/// Debugger errors.
#[derive(Debug, Error)]
pub enum DebuggerError {
    /// Missing or unreadable artifact, unsupported chain version, legacy
    /// map file, or a debug map referencing a missing source file
    #[error("Load error: {message}")]
    Load { message: String },

    /// Malformed bytecode
    #[error("Disassemble error: {message}")]
    Disassemble { message: String },

    /// An invocation argument the marshaller cannot encode
    #[error("Argument marshalling error: {message}")]
    ArgMarshal { message: String },

    /// Simulated blockchain failure
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// VM-level failure outside script execution (e.g. malformed loader)
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl DebuggerError {
    /// Creates a new load error.
    pub fn load<S: Into<String>>(message: S) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    /// Creates a new disassemble error.
    pub fn disassemble<S: Into<String>>(message: S) -> Self {
        Self::Disassemble {
            message: message.into(),
        }
    }

    /// Creates a new argument marshalling error.
    pub fn arg_marshal<S: Into<String>>(message: S) -> Self {
        Self::ArgMarshal {
            message: message.into(),
        }
    }
}

/// Result type for debugger operations.
pub type DebuggerResult<T> = std::result::Result<T, DebuggerError>;
