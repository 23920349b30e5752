//! # Neo Debugger Chain
//!
//! A simulated blockchain for the Neo debugger: named addresses holding
//! contract bytecode and key/value storage, ordered blocks, and the
//! transactions the VM executes against. The whole chain persists to a
//! versioned `.chain` JSON document.
//!
//! Nothing here networks or validates consensus rules; the chain exists so
//! syscalls made by a contract under debug observe plausible state.

#![warn(rustdoc::missing_crate_level_docs)]

/// Named accounts with bytecode and storage
pub mod address;
/// Blocks indexed by height
pub mod block;
/// The persistable chain document
pub mod blockchain;
/// Chain error types
pub mod error;
/// Hex encoding adapters for serde
mod hex_serde;
/// Transactions and outputs
pub mod transaction;

pub use address::Address;
pub use block::Block;
pub use blockchain::{Blockchain, GENESIS_TIMESTAMP, SECONDS_PER_BLOCK};
pub use error::{ChainError, ChainResult, CHAIN_FORMAT_VERSION};
pub use transaction::{Transaction, TransactionInput, TransactionOutput};
