//! Persistent engine: ordered RAM table rebuilt from a write-ahead log.
//!
//! **Read path**: RAM only, via the shared table's read lock
//! **Write path**: WAL record first, then RAM, both under the WAL mutex
//! **Open path**: replay every WAL file in sequence order
//!
//! Directory layout:
//!
//! ```text
//! <path>/
//! ├── CURRENT        marker; its presence means "a database lives here"
//! └── wal/
//!     ├── wal-0000000000000000.log
//!     └── wal-0000000000000001.log
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::config::{Options, ReadOptions, WriteOptions};
use crate::engine::{Engine, RawCursor};
use crate::error::{StoreError, StoreResult};
use crate::format::BatchOp;
use crate::memtable::{MemTable, Table};
use crate::platform_durability::{durable_sync, sync_dir};
use crate::wal::{WalReader, WalWriter};

const CURRENT_FILE: &str = "CURRENT";
const CURRENT_CONTENTS: &[u8] = b"scopedb-wal-1\n";
const WAL_DIR: &str = "wal";

/// WAL-backed [`Engine`].
///
/// All methods take `&self`. Readers share the table's read lock; writers
/// serialize on the WAL mutex so WAL order always equals apply order.
pub struct DiskEngine {
    table: MemTable,
    /// `None` once closed
    wal: Mutex<Option<WalWriter>>,
    path: PathBuf,
    options: Options,
}

impl DiskEngine {
    /// Open the database in `path`, honouring `create_if_missing` and
    /// `error_if_exists`, and replay its WAL.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> StoreResult<Self> {
        options.validate()?;
        let path = path.as_ref().to_path_buf();
        let marker = path.join(CURRENT_FILE);
        let exists = marker.is_file();

        if !exists && !options.create_if_missing {
            return Err(StoreError::Missing { path });
        }
        if exists && options.error_if_exists {
            return Err(StoreError::AlreadyExists { path });
        }

        let wal_dir = path.join(WAL_DIR);
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| StoreError::io_at(&wal_dir, &e, "failed to create WAL directory"))?;
        if !exists {
            Self::write_marker(&path, &marker)?;
            debug!(path = %path.display(), "created database");
        }

        let recovery = WalReader::new(&wal_dir)
            .paranoid(options.paranoid_checks)
            .recover()?;
        // Appends resume in the newest file, right after its last whole record
        recovery.truncate_torn_tail()?;
        let batches = recovery.batches;
        let mut table = Table::new();
        for op in batches.iter().flatten() {
            match op {
                BatchOp::Put { key, value } => {
                    table.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    table.remove(key);
                }
            }
        }
        if !batches.is_empty() {
            info!(
                path = %path.display(),
                batches = batches.len(),
                entries = table.len(),
                "recovered database from WAL"
            );
        }

        let wal = WalWriter::new(&wal_dir, options.wal_rotation_size_bytes)?;

        Ok(Self {
            table: MemTable::new(table),
            wal: Mutex::new(Some(wal)),
            path,
            options,
        })
    }

    fn write_marker(dir: &Path, marker: &Path) -> StoreResult<()> {
        let mut file = std::fs::File::create(marker)
            .map_err(|e| StoreError::io_at(marker, &e, "failed to create marker"))?;
        file.write_all(CURRENT_CONTENTS)
            .map_err(|e| StoreError::io_at(marker, &e, "failed to write marker"))?;
        durable_sync(&file).map_err(|e| StoreError::io_at(marker, &e, "failed to sync marker"))?;
        sync_dir(dir).map_err(|e| StoreError::io_at(dir, &e, "failed to sync database directory"))
    }

    /// Database directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Engine for DiskEngine {
    fn get(&self, key: &[u8], _opts: &ReadOptions) -> StoreResult<Option<Vec<u8>>> {
        self.table.get(key)
    }

    fn apply_batch(&self, ops: &[BatchOp], opts: &WriteOptions) -> StoreResult<()> {
        for op in ops {
            self.options.check_entry(op.key(), op.value())?;
        }

        let mut wal = self.wal.lock();
        let writer = wal.as_mut().ok_or(StoreError::Closed)?;
        // If the append fails RAM is never touched.
        writer.append(ops, opts.sync)?;
        self.table.apply(ops)?;
        trace!(ops = ops.len(), sync = opts.sync, "applied batch");
        Ok(())
    }

    fn new_cursor(&self) -> StoreResult<Box<dyn RawCursor>> {
        Ok(Box::new(self.table.cursor()?))
    }

    fn close(&self) -> StoreResult<()> {
        let mut wal = self.wal.lock();
        self.table.close();
        if let Some(writer) = wal.take() {
            writer.sync()?;
            debug!(path = %self.path.display(), entries = self.table.len(), "closed database");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.table.is_closed()
    }
}

impl Drop for DiskEngine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "failed to sync WAL on drop");
        }
    }
}
