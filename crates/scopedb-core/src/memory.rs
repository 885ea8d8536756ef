//! Ephemeral engine: the ordered table without a WAL.

use tracing::{debug, trace};

use crate::config::{Options, ReadOptions, WriteOptions};
use crate::engine::{Engine, RawCursor};
use crate::error::StoreResult;
use crate::format::BatchOp;
use crate::memtable::{MemTable, Table};

/// In-memory [`Engine`]. Nothing survives the handle; `sync` is accepted and
/// has nothing to flush. Size limits and close semantics match
/// [`DiskEngine`](crate::DiskEngine).
pub struct MemoryEngine {
    table: MemTable,
    options: Options,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Only the entry size limits of `options` apply.
    pub fn with_options(options: Options) -> Self {
        Self {
            table: MemTable::new(Table::new()),
            options,
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn get(&self, key: &[u8], _opts: &ReadOptions) -> StoreResult<Option<Vec<u8>>> {
        self.table.get(key)
    }

    fn apply_batch(&self, ops: &[BatchOp], _opts: &WriteOptions) -> StoreResult<()> {
        self.table.ensure_open()?;
        for op in ops {
            self.options.check_entry(op.key(), op.value())?;
        }
        // Checked again under the table's write lock
        self.table.apply(ops)?;
        trace!(ops = ops.len(), "applied batch to memory engine");
        Ok(())
    }

    fn new_cursor(&self) -> StoreResult<Box<dyn RawCursor>> {
        Ok(Box::new(self.table.cursor()?))
    }

    fn close(&self) -> StoreResult<()> {
        if self.table.close() {
            debug!(entries = self.table.len(), "closed memory engine");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.table.is_closed()
    }
}
