//! ScopeDB Core: ordered byte-keyed storage engines
//!
//! The engines behind the `scopedb` scoping layer. Both keep the live
//! keyspace in an ordered in-RAM map and hand out snapshot cursors; they
//! differ only in durability.
//!
//! # Architecture
//!
//! - **[`Engine`]**: the contract (get / atomic batch / snapshot cursor / close)
//! - **[`DiskEngine`]**: WAL-first writes, RAM reads, WAL replay on open
//! - **[`MemoryEngine`]**: same contract, nothing persisted
//!
//! Keys and values are arbitrary byte strings, compared as unsigned bytes.

pub mod config;
pub mod disk;
pub mod engine;
pub mod error;
pub mod format;
mod memtable;
pub mod memory;
pub mod platform_durability;
pub mod wal;

// Re-export key types for convenience
pub use config::{Options, ReadOptions, WriteOptions};
pub use disk::DiskEngine;
pub use engine::{Engine, RawCursor};
pub use error::{StoreError, StoreResult};
pub use format::{BatchOp, Operation};
pub use memory::MemoryEngine;
pub use memtable::SnapshotCursor;
pub use wal::{Recovery, WalReader, WalWriter};
