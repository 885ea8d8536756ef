//! The engine contract shared by every backing store.
//!
//! An [`Engine`] is an ordered byte-keyed map with atomic batches and
//! snapshot cursors. [`DiskEngine`](crate::DiskEngine) and
//! [`MemoryEngine`](crate::MemoryEngine) both implement it, and everything
//! layered on top only ever sees `dyn Engine`.

use crate::config::{ReadOptions, WriteOptions};
use crate::error::StoreResult;
use crate::format::BatchOp;

/// Ordered key-value storage backend.
///
/// Guarantees:
/// - iteration is in lexicographic order of unsigned key bytes
/// - a handle reads its own writes
/// - `apply_batch` is all-or-nothing
/// - once `close` has run, every call fails with `StoreError::Closed`
pub trait Engine: Send + Sync {
    /// Value stored under `key`, or `None` when absent.
    fn get(&self, key: &[u8], opts: &ReadOptions) -> StoreResult<Option<Vec<u8>>>;

    /// Apply every op in order, atomically.
    fn apply_batch(&self, ops: &[BatchOp], opts: &WriteOptions) -> StoreResult<()>;

    /// A cursor over a point-in-time snapshot of the whole keyspace.
    fn new_cursor(&self) -> StoreResult<Box<dyn RawCursor>>;

    /// Flush what needs flushing and refuse all further work.
    fn close(&self) -> StoreResult<()>;

    fn is_closed(&self) -> bool;

    fn put(&self, key: &[u8], value: &[u8], opts: &WriteOptions) -> StoreResult<()> {
        self.apply_batch(
            &[BatchOp::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            }],
            opts,
        )
    }

    fn delete(&self, key: &[u8], opts: &WriteOptions) -> StoreResult<()> {
        self.apply_batch(&[BatchOp::Delete { key: key.to_vec() }], opts)
    }
}

/// Positionable cursor over an engine snapshot.
///
/// Position is one of before-first, at a key, or past-last. Stepping off
/// either end parks the cursor on the matching sentinel; `next` from
/// before-first and `prev` from past-last re-enter the keyspace, while
/// `prev` at before-first and `next` at past-last stay put.
pub trait RawCursor: Send {
    /// Position at the first key `>= target`.
    fn seek(&mut self, target: &[u8]) -> StoreResult<()>;

    fn seek_first(&mut self) -> StoreResult<()>;

    fn seek_last(&mut self) -> StoreResult<()>;

    fn next(&mut self) -> StoreResult<()>;

    fn prev(&mut self) -> StoreResult<()>;

    fn valid(&self) -> bool;

    /// Current key, `None` unless `valid()`.
    fn key(&self) -> Option<&[u8]>;

    /// Current value, `None` unless `valid()`.
    fn value(&self) -> Option<&[u8]>;

    /// The owning engine has been closed.
    fn is_closed(&self) -> bool;
}
