//! Binary format definitions for WAL records
//!
//! One WAL record holds one atomic batch:
//! ChunkHeader (32 bytes) + op_count(u32) + ops, where every op is
//! tag(u8) + key_len(u32) + value_len(u32) + key_bytes + value_bytes.
//! All integers are little-endian. Keys and values are arbitrary bytes.

use std::path::PathBuf;

use crate::error::{StoreError, StoreResult};

/// Magic bytes identifying WAL records: "SKVB"
pub const MAGIC_ARRAY: [u8; 4] = [0x53, 0x4B, 0x56, 0x42];

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Record type for a batch of operations
pub const RECORD_BATCH: u8 = 1;

/// Fixed per-op overhead: tag + key_len + value_len
const OP_OVERHEAD: usize = 1 + 4 + 4;

/// Operation tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Operation {
    /// Insert or update a key-value pair
    Put = 1,
    /// Delete a key
    Delete = 2,
}

impl Operation {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Operation::Put),
            2 => Some(Operation::Delete),
            _ => None,
        }
    }
}

/// A single mutation in engine coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }

    /// Value bytes; empty for deletes.
    pub fn value(&self) -> &[u8] {
        match self {
            BatchOp::Put { value, .. } => value,
            BatchOp::Delete { .. } => &[],
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            BatchOp::Put { .. } => Operation::Put,
            BatchOp::Delete { .. } => Operation::Delete,
        }
    }
}

/// Fixed-size header for each WAL record
///
/// Layout:
///   [0..4]   magic:       [u8;4] - "SKVB"
///   [4..8]   length:      u32    - payload length in bytes
///   [8..12]  checksum:    u32    - CRC32C of payload bytes
///   [12]     record_type: u8
///   [13..16] reserved:    [u8;3]
///   [16..32] padding:     [u8;16]
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct ChunkHeader {
    pub magic: [u8; 4],
    pub length: u32,
    pub checksum: u32,
    pub record_type: u8,
    pub reserved: [u8; 3],
    pub _padding: [u8; 16],
}

impl ChunkHeader {
    pub fn new(length: u32, checksum: u32, record_type: u8) -> Self {
        Self {
            magic: MAGIC_ARRAY,
            length,
            checksum,
            record_type,
            reserved: [0; 3],
            _padding: [0; 16],
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.record_type;
        buf[13..16].copy_from_slice(&self.reserved);
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut padding = [0u8; 16];
        padding.copy_from_slice(&bytes[16..32]);
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            length: read_u32(bytes, 4),
            checksum: read_u32(bytes, 8),
            record_type: bytes[12],
            reserved: [bytes[13], bytes[14], bytes[15]],
            _padding: padding,
        }
    }
}

/// A decoded WAL record
#[derive(Debug, Clone)]
pub struct WalRecord {
    pub header: ChunkHeader,
    pub ops: Vec<BatchOp>,
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn buffer_path() -> PathBuf {
    PathBuf::from("<buffer>")
}

/// Serialize a batch into one complete WAL record.
///
/// Lengths are written as u32; callers validate sizes against
/// [`Options`](crate::Options) limits first.
pub fn serialize_batch(ops: &[BatchOp]) -> StoreResult<Vec<u8>> {
    let payload_size = 4 + ops
        .iter()
        .map(|op| OP_OVERHEAD + op.key().len() + op.value().len())
        .sum::<usize>();
    if payload_size > u32::MAX as usize {
        return Err(StoreError::OversizedEntry {
            entry_size: payload_size as u64,
            max_size: u32::MAX as u64,
            component: "batch",
        });
    }

    let mut payload = Vec::with_capacity(payload_size);
    payload.extend_from_slice(&(ops.len() as u32).to_le_bytes());
    for op in ops {
        payload.push(op.operation() as u8);
        payload.extend_from_slice(&(op.key().len() as u32).to_le_bytes());
        payload.extend_from_slice(&(op.value().len() as u32).to_le_bytes());
        payload.extend_from_slice(op.key());
        payload.extend_from_slice(op.value());
    }

    let checksum = crc32c::crc32c(&payload);
    let header = ChunkHeader::new(payload.len() as u32, checksum, RECORD_BATCH);

    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
    buffer.extend_from_slice(&header.to_bytes());
    buffer.extend_from_slice(&payload);
    Ok(buffer)
}

/// Deserialize one WAL record from the start of `data`.
pub fn deserialize_batch(data: &[u8]) -> StoreResult<WalRecord> {
    let header_bytes: &[u8; HEADER_SIZE] = data
        .get(..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| StoreError::WalCorrupted {
            path: buffer_path(),
            offset: 0,
            reason: format!(
                "record too short: {} bytes, need at least {}",
                data.len(),
                HEADER_SIZE
            ),
        })?;
    let header = ChunkHeader::from_bytes(header_bytes);

    if header.magic != MAGIC_ARRAY {
        return Err(StoreError::NoMagicFound {
            path: buffer_path(),
            offset: 0,
            found_bytes: header.magic,
        });
    }

    let payload_end = HEADER_SIZE + header.length as usize;
    if data.len() < payload_end {
        return Err(StoreError::TornWrite {
            path: buffer_path(),
            expected_size: header.length,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: HEADER_SIZE as u64,
        });
    }
    let payload = &data[HEADER_SIZE..payload_end];

    let computed = crc32c::crc32c(payload);
    if computed != header.checksum {
        return Err(StoreError::ChecksumMismatch {
            path: buffer_path(),
            expected: header.checksum,
            actual: computed,
            offset: HEADER_SIZE as u64,
        });
    }

    if header.record_type != RECORD_BATCH {
        return Err(corrupt(12, format!("unknown record type: {}", header.record_type)));
    }

    let ops = decode_ops(payload)?;
    Ok(WalRecord { header, ops })
}

fn corrupt(offset: usize, reason: String) -> StoreError {
    StoreError::WalCorrupted {
        path: buffer_path(),
        offset: offset as u64,
        reason,
    }
}

fn decode_ops(payload: &[u8]) -> StoreResult<Vec<BatchOp>> {
    if payload.len() < 4 {
        return Err(corrupt(HEADER_SIZE, "payload too short for op count".into()));
    }
    let count = read_u32(payload, 0) as usize;
    // Every op takes at least OP_OVERHEAD bytes, which bounds the allocation.
    if count > (payload.len() - 4) / OP_OVERHEAD {
        return Err(corrupt(HEADER_SIZE, format!("op count {} exceeds payload", count)));
    }

    let mut ops = Vec::with_capacity(count);
    let mut at = 4;
    for _ in 0..count {
        if payload.len() < at + OP_OVERHEAD {
            return Err(corrupt(HEADER_SIZE + at, "truncated op header".into()));
        }
        let operation = Operation::from_tag(payload[at]).ok_or_else(|| {
            corrupt(HEADER_SIZE + at, format!("invalid operation tag: {}", payload[at]))
        })?;
        let key_len = read_u32(payload, at + 1) as usize;
        let value_len = read_u32(payload, at + 5) as usize;
        let key_start = at + OP_OVERHEAD;
        let value_start = key_start + key_len;
        let end = value_start + value_len;
        if payload.len() < end {
            return Err(corrupt(
                HEADER_SIZE + at,
                format!("op needs {} bytes for key({}) + value({})", end - at, key_len, value_len),
            ));
        }

        let key = payload[key_start..value_start].to_vec();
        ops.push(match operation {
            Operation::Put => BatchOp::Put {
                key,
                value: payload[value_start..end].to_vec(),
            },
            Operation::Delete => BatchOp::Delete { key },
        });
        at = end;
    }

    if at != payload.len() {
        return Err(corrupt(HEADER_SIZE + at, "trailing bytes after last op".into()));
    }
    Ok(ops)
}
