//! Error types for the Neo debugger VM crate.
//!
//! This module provides error handling for instruction parsing, execution
//! and stack management.

use thiserror::Error;

/// VM execution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Parse error with context
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Invalid opcode
    #[error("Invalid opcode: {opcode:#04x}")]
    InvalidOpCode { opcode: u8 },

    /// Stack underflow
    #[error(
        "Stack underflow: attempted to access {requested} items, but only {available} available"
    )]
    StackUnderflow { requested: usize, available: usize },

    /// Division by zero
    #[error("Division by zero in operation: {operation}")]
    DivisionByZero { operation: String },

    /// Integer exceeds the permitted size for an operation
    #[error("Number out of range in operation {operation}: {size} bytes, limit {limit}")]
    NumberOutOfRange {
        operation: String,
        size: usize,
        limit: usize,
    },

    /// Invalid type conversion
    #[error("Invalid type conversion: cannot convert {from} to {to}")]
    InvalidType { from: String, to: String },

    /// Jump or call target outside of the script
    #[error("Invalid jump target: {target}")]
    InvalidJump { target: i64 },

    /// Invocation stack depth limit exceeded
    #[error("Call depth limit exceeded: depth {depth}, limit {limit}")]
    CallDepthExceeded { depth: usize, limit: usize },

    /// Item larger than the engine permits
    #[error("Item too large: {size} bytes, limit {limit}")]
    ItemTooLarge { size: usize, limit: usize },

    /// Syscall name not present in the interop registry
    #[error("Syscall not registered: {name}")]
    SyscallNotFound { name: String },

    /// Syscall handler reported failure
    #[error("Syscall failed: {name}")]
    SyscallFailed { name: String },

    /// Referenced contract script could not be resolved
    #[error("Script not found for hash: {hash}")]
    ScriptNotFound { hash: String },

    /// Invalid operation with context
    #[error("Invalid operation: {operation}, reason: {reason}")]
    InvalidOperation { operation: String, reason: String },
}

impl VmError {
    /// Creates a new parse error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a new invalid opcode error.
    pub fn invalid_opcode(opcode: u8) -> Self {
        Self::InvalidOpCode { opcode }
    }

    /// Creates a new stack underflow error.
    pub fn stack_underflow(requested: usize, available: usize) -> Self {
        Self::StackUnderflow {
            requested,
            available,
        }
    }

    /// Creates a new division by zero error.
    pub fn division_by_zero<S: Into<String>>(operation: S) -> Self {
        Self::DivisionByZero {
            operation: operation.into(),
        }
    }

    /// Creates a new number out of range error.
    pub fn number_out_of_range<S: Into<String>>(operation: S, size: usize, limit: usize) -> Self {
        Self::NumberOutOfRange {
            operation: operation.into(),
            size,
            limit,
        }
    }

    /// Creates a new invalid type error.
    pub fn invalid_type<S: Into<String>>(from: S, to: S) -> Self {
        Self::InvalidType {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(operation: S, reason: S) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for VM operations.
pub type VmResult<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VmError::invalid_opcode(0xFF);
        assert_eq!(err.to_string(), "Invalid opcode: 0xff");

        let err = VmError::stack_underflow(2, 1);
        assert!(err.to_string().contains("2 items"));

        let err = VmError::division_by_zero("DIV");
        assert!(err.to_string().contains("DIV"));
    }
}
