//! Write-ahead log for the disk engine
//!
//! Write ordering for every batch:
//! 1. Serialize the whole batch into one checksummed record
//! 2. Append the record to the current WAL file
//! 3. If the write asked for `sync`, call durable_sync()
//! 4. Return; only then does the caller apply the batch to RAM
//!
//! Because a batch is a single record, recovery replays either all of its
//! operations or none of them.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::format::{deserialize_batch, serialize_batch, BatchOp, HEADER_SIZE, MAGIC_ARRAY};
use crate::platform_durability::{durable_sync, sync_dir};

const WAL_PREFIX: &str = "wal-";
const WAL_SUFFIX: &str = ".log";

fn wal_file_name(sequence: u64) -> String {
    format!("{}{:016x}{}", WAL_PREFIX, sequence, WAL_SUFFIX)
}

fn parse_sequence(name: &str) -> Option<u64> {
    let hex = name.strip_prefix(WAL_PREFIX)?.strip_suffix(WAL_SUFFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

/// Appends batch records to the current WAL file.
///
/// INVARIANT: `append` returns before the caller touches RAM, so every
/// visible write has a WAL record ahead of it.
pub struct WalWriter {
    file: File,
    path: PathBuf,
    /// Current file size in bytes (tracked to avoid stat calls)
    size: u64,
    wal_dir: PathBuf,
    /// Monotonic sequence number for WAL file naming
    sequence: u64,
    rotation_size: u64,
    /// A failed append left bytes past `size` that could not be cut off
    dirty_tail: bool,
}

impl WalWriter {
    /// Open the WAL in `wal_dir`, resuming the highest-numbered file.
    pub fn new<P: AsRef<Path>>(wal_dir: P, rotation_size: u64) -> StoreResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| StoreError::io_at(&wal_dir, &e, "failed to create WAL directory"))?;

        let sequence = Self::find_max_sequence(&wal_dir)?;
        let path = wal_dir.join(wal_file_name(sequence));
        let file = Self::open_file(&path)?;
        let size = file
            .metadata()
            .map_err(|e| StoreError::io_at(&path, &e, "failed to stat WAL file"))?
            .len();
        sync_dir(&wal_dir)
            .map_err(|e| StoreError::io_at(&wal_dir, &e, "failed to sync WAL directory"))?;

        Ok(Self {
            file,
            path,
            size,
            wal_dir,
            sequence,
            rotation_size,
            dirty_tail: false,
        })
    }

    fn open_file(path: &Path) -> StoreResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::io_at(path, &e, "failed to open WAL file"))
    }

    fn find_max_sequence(wal_dir: &Path) -> StoreResult<u64> {
        let entries = std::fs::read_dir(wal_dir)
            .map_err(|e| StoreError::io_at(wal_dir, &e, "failed to read WAL directory"))?;
        Ok(entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_sequence))
            .max()
            .unwrap_or(0))
    }

    /// Append one batch as a single record; durably sync it when `sync` is set.
    ///
    /// Without `sync` the record sits in the OS page cache and may be lost on
    /// power failure, but never partially: recovery drops a torn tail record.
    pub fn append(&mut self, ops: &[BatchOp], sync: bool) -> StoreResult<()> {
        let record = serialize_batch(ops)?;

        if self.dirty_tail
            || (self.size > 0 && self.size + record.len() as u64 > self.rotation_size)
        {
            self.rotate()?;
        }

        if let Err(e) = self.file.write_all(&record) {
            self.discard_partial();
            return Err(StoreError::io_at(&self.path, &e, "WAL write failed"));
        }
        self.size += record.len() as u64;

        if sync {
            self.sync()?;
        }
        Ok(())
    }

    /// Cut the file back to the last whole record after a failed write, so
    /// the next record does not land behind a partial one.
    fn discard_partial(&mut self) {
        if let Err(e) = self.file.set_len(self.size) {
            warn!(
                path = %self.path.display(),
                size = self.size,
                error = %e,
                "failed to truncate partial WAL record, next append rotates"
            );
            self.dirty_tail = true;
        }
    }

    /// Sync the current file, then switch to a fresh one.
    fn rotate(&mut self) -> StoreResult<()> {
        self.sync()?;

        self.sequence += 1;
        let new_path = self.wal_dir.join(wal_file_name(self.sequence));
        self.file = Self::open_file(&new_path)?;
        sync_dir(&self.wal_dir)
            .map_err(|e| StoreError::io_at(&self.wal_dir, &e, "failed to sync WAL directory"))?;
        debug!(from = %self.path.display(), to = %new_path.display(), "rotated WAL");
        self.path = new_path;
        self.size = 0;
        self.dirty_tail = false;
        Ok(())
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn current_size(&self) -> u64 {
        self.size
    }

    /// Sync the current WAL file without writing anything.
    pub fn sync(&self) -> StoreResult<()> {
        durable_sync(&self.file)
            .map_err(|e| StoreError::io_at(&self.path, &e, "WAL durable_sync failed"))
    }
}

/// Result of replaying the WAL directory.
#[derive(Debug, Default)]
pub struct Recovery {
    /// Every intact batch, in WAL order
    pub batches: Vec<Vec<BatchOp>>,
    /// Newest WAL file and the length of its intact prefix, when bytes
    /// follow the last whole record (a torn write)
    pub torn_tail: Option<(PathBuf, u64)>,
}

impl Recovery {
    /// Drop the torn bytes so new records are appended right after the last
    /// intact one. Without this a later recovery would stop at the torn
    /// record again and lose everything written behind it.
    pub fn truncate_torn_tail(&self) -> StoreResult<()> {
        let Some((path, len)) = &self.torn_tail else {
            return Ok(());
        };
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| StoreError::io_at(path, &e, "failed to open WAL file"))?;
        file.set_len(*len)
            .map_err(|e| StoreError::io_at(path, &e, "failed to truncate torn WAL tail"))?;
        durable_sync(&file)
            .map_err(|e| StoreError::io_at(path, &e, "failed to sync truncated WAL file"))?;
        warn!(path = %path.display(), len, "truncated torn WAL tail");
        Ok(())
    }
}

/// Replays WAL files at open.
pub struct WalReader {
    wal_dir: PathBuf,
    paranoid: bool,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self {
            wal_dir: wal_dir.as_ref().to_path_buf(),
            paranoid: false,
        }
    }

    /// Fail on corrupt records instead of skipping to the next magic.
    pub fn paranoid(mut self, yes: bool) -> Self {
        self.paranoid = yes;
        self
    }

    /// Recover every intact batch, in WAL order.
    ///
    /// Per file:
    /// 1. Check magic at the current offset; on mismatch resync to the next magic
    /// 2. A record that runs past EOF is the crash point: stop
    /// 3. Verify CRC32C; on mismatch skip the record and resync
    pub fn recover_batches(&self) -> StoreResult<Vec<Vec<BatchOp>>> {
        Ok(self.recover()?.batches)
    }

    /// Like [`recover_batches`](Self::recover_batches), also reporting where
    /// the newest file stops being intact.
    pub fn recover(&self) -> StoreResult<Recovery> {
        let dir_entries = std::fs::read_dir(&self.wal_dir)
            .map_err(|e| StoreError::io_at(&self.wal_dir, &e, "failed to read WAL directory"))?;

        let mut wal_files: Vec<(u64, PathBuf)> = Vec::new();
        for entry in dir_entries {
            let entry = entry.map_err(|e| {
                StoreError::io_at(&self.wal_dir, &e, "failed to read directory entry")
            })?;
            if let Some(seq) = entry.file_name().to_str().and_then(parse_sequence) {
                wal_files.push((seq, entry.path()));
            }
        }
        wal_files.sort();

        let mut recovery = Recovery::default();
        for (_, path) in &wal_files {
            let (batches, intact, len) = self.recover_from_file(path)?;
            recovery.batches.extend(batches);
            recovery.torn_tail = (intact < len).then(|| (path.clone(), intact));
        }
        Ok(recovery)
    }

    /// Intact batches of one file, the end offset of its intact prefix, and
    /// its length.
    fn recover_from_file(&self, path: &Path) -> StoreResult<(Vec<Vec<BatchOp>>, u64, u64)> {
        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .map_err(|e| StoreError::io_at(path, &e, "failed to read WAL file"))?;

        let mut batches = Vec::new();
        let mut offset = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            if buffer[offset..offset + 4] != MAGIC_ARRAY {
                self.corruption(path, offset, "bad magic".to_string())?;
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => {
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }

            let length = u32::from_le_bytes([
                buffer[offset + 4],
                buffer[offset + 5],
                buffer[offset + 6],
                buffer[offset + 7],
            ]) as usize;
            let total = HEADER_SIZE + length;

            if offset + total > buffer.len() {
                warn!(
                    path = %path.display(),
                    offset,
                    need = total,
                    have = buffer.len() - offset,
                    "torn WAL record, stopping recovery"
                );
                break;
            }

            match deserialize_batch(&buffer[offset..offset + total]) {
                Ok(record) => {
                    batches.push(record.ops);
                    offset += total;
                }
                Err(e) => {
                    self.corruption(path, offset, e.to_string())?;
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => offset = next,
                        None => break,
                    }
                }
            }
        }

        Ok((batches, offset as u64, buffer.len() as u64))
    }

    fn corruption(&self, path: &Path, offset: usize, reason: String) -> StoreResult<()> {
        if self.paranoid {
            return Err(StoreError::WalCorrupted {
                path: path.to_path_buf(),
                offset: offset as u64,
                reason,
            });
        }
        warn!(path = %path.display(), offset, %reason, "skipping corrupt WAL record");
        Ok(())
    }
}

/// Next occurrence of the record magic at or after `start`.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    if start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(MAGIC_ARRAY.len())
        .position(|w| w == MAGIC_ARRAY)
        .map(|pos| start + pos)
}
