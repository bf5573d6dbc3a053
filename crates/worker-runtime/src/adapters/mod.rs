//! # Adapter Implementations
//!
//! Resource managers the worker ships with, behind the port traits in
//! [`ports`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 OUTER LAYER (Adapters)                      │
//! │        MemoryStore (databaseProvider "memory")              │
//! │        NullLedger  (blockchainWorkerProvider "null")        │
//! └─────────────────────────────────────────────────────────────┘
//!                        ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 MIDDLE LAYER (Ports)                        │
//! │        trait ResourceManager, trait SessionStore            │
//! └─────────────────────────────────────────────────────────────┘
//!                        ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────┐
//! │            INNER LAYER (Dispatcher, Processors)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod memory_store;
pub mod null_ledger;
pub mod ports;

pub use memory_store::{MemoryStore, TxCounters};
pub use null_ledger::{LedgerStep, NullLedger};
pub use ports::{ResourceManager, SessionStore};
