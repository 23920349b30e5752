//! Interop (syscall) registry for the Neo debugger VM.
//!
//! SYSCALL instructions carry a length-prefixed ASCII name that is resolved
//! here. Handlers are registered explicitly, at construction time or later,
//! and perform their side effects on emulator-visible state.

use crate::error::{VmError, VmResult};
use crate::execution_engine::ExecutionEngine;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum length of a syscall name in bytes.
pub const MAX_SYSCALL_NAME_LEN: usize = 252;

/// A registered syscall implementation.
///
/// Returns `Ok(true)` on success; `Ok(false)` or an error faults the VM.
pub type InteropHandler = Arc<dyn Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync>;

/// Describes one registered syscall.
#[derive(Clone)]
pub struct InteropDescriptor {
    name: String,
    price: f64,
    handler: InteropHandler,
}

impl InteropDescriptor {
    /// Returns the registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the base gas cost billed per invocation.
    pub fn price(&self) -> f64 {
        self.price
    }
}

/// Registry mapping syscall names to handlers and gas costs.
#[derive(Clone, Default)]
pub struct InteropService {
    methods: HashMap<String, InteropDescriptor>,
}

impl InteropService {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a syscall handler under `name` with the given base gas cost.
    ///
    /// Re-registering a name replaces the previous handler.
    pub fn register<F>(&mut self, name: &str, price: f64, handler: F)
    where
        F: Fn(&mut ExecutionEngine) -> VmResult<bool> + Send + Sync + 'static,
    {
        debug_assert!(name.len() <= MAX_SYSCALL_NAME_LEN, "syscall name too long");
        self.methods.insert(
            name.to_string(),
            InteropDescriptor {
                name: name.to_string(),
                price,
                handler: Arc::new(handler),
            },
        );
    }

    /// Returns `true` when `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Returns the base gas cost of `name`, if registered.
    pub fn price(&self, name: &str) -> Option<f64> {
        self.methods.get(name).map(|descriptor| descriptor.price)
    }

    /// Returns an iterator over the registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Resolves `name` and invokes its handler against `engine`.
    pub fn invoke(&self, engine: &mut ExecutionEngine, name: &str) -> VmResult<bool> {
        let descriptor = self
            .methods
            .get(name)
            .ok_or_else(|| VmError::SyscallNotFound {
                name: name.to_string(),
            })?;
        (descriptor.handler)(engine)
    }
}
