//! Ordered in-RAM table shared by both engines.
//!
//! The map lives behind `RwLock<Arc<_>>`. Readers clone the `Arc` to get a
//! snapshot; writers go through `Arc::make_mut`, which copies the map only
//! while some cursor still holds the previous version. A cursor therefore
//! never observes a half-applied batch or a later write.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::engine::RawCursor;
use crate::error::{StoreError, StoreResult};
use crate::format::BatchOp;

pub(crate) type Table = BTreeMap<Vec<u8>, Vec<u8>>;

pub(crate) struct MemTable {
    data: RwLock<Arc<Table>>,
    closed: Arc<AtomicBool>,
}

impl MemTable {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            data: RwLock::new(Arc::new(table)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.data.read().get(key).cloned())
    }

    /// Apply a batch under one write lock. Fails with `Closed` once
    /// [`close`](Self::close) has returned.
    pub(crate) fn apply(&self, ops: &[BatchOp]) -> StoreResult<()> {
        let mut guard = self.data.write();
        self.ensure_open()?;
        let table = Arc::make_mut(&mut guard);
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    table.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    table.remove(key);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn cursor(&self) -> StoreResult<SnapshotCursor> {
        self.ensure_open()?;
        Ok(SnapshotCursor {
            data: Arc::clone(&self.data.read()),
            pos: Position::BeforeFirst,
            closed: Arc::clone(&self.closed),
        })
    }

    /// Mark closed; returns false if it already was. Taken under the write
    /// lock so no batch lands after this returns.
    pub(crate) fn close(&self) -> bool {
        let _guard = self.data.write();
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn len(&self) -> usize {
        self.data.read().len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(Vec<u8>),
    PastLast,
}

/// [`RawCursor`] over one immutable version of the table.
pub struct SnapshotCursor {
    data: Arc<Table>,
    pos: Position,
    closed: Arc<AtomicBool>,
}

impl SnapshotCursor {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn at_or_past(key: Option<(&Vec<u8>, &Vec<u8>)>) -> Position {
        key.map_or(Position::PastLast, |(k, _)| Position::At(k.clone()))
    }

    fn at_or_before(key: Option<(&Vec<u8>, &Vec<u8>)>) -> Position {
        key.map_or(Position::BeforeFirst, |(k, _)| Position::At(k.clone()))
    }
}

impl RawCursor for SnapshotCursor {
    fn seek(&mut self, target: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        let found = self.data.range::<[u8], _>((Included(target), Unbounded)).next();
        self.pos = Self::at_or_past(found);
        Ok(())
    }

    fn seek_first(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.pos = Self::at_or_past(self.data.iter().next());
        Ok(())
    }

    fn seek_last(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.pos = Self::at_or_before(self.data.iter().next_back());
        Ok(())
    }

    fn next(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let next = match &self.pos {
            Position::BeforeFirst => Self::at_or_past(self.data.iter().next()),
            Position::At(key) => Self::at_or_past(
                self.data
                    .range::<[u8], _>((Excluded(key.as_slice()), Unbounded))
                    .next(),
            ),
            Position::PastLast => Position::PastLast,
        };
        self.pos = next;
        Ok(())
    }

    fn prev(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let prev = match &self.pos {
            Position::BeforeFirst => Position::BeforeFirst,
            Position::At(key) => Self::at_or_before(
                self.data
                    .range::<[u8], _>((Unbounded, Excluded(key.as_slice())))
                    .next_back(),
            ),
            Position::PastLast => Self::at_or_before(self.data.iter().next_back()),
        };
        self.pos = prev;
        Ok(())
    }

    fn valid(&self) -> bool {
        matches!(self.pos, Position::At(_))
    }

    fn key(&self) -> Option<&[u8]> {
        match &self.pos {
            Position::At(key) => Some(key),
            _ => None,
        }
    }

    fn value(&self) -> Option<&[u8]> {
        match &self.pos {
            Position::At(key) => self.data.get(key.as_slice()).map(Vec::as_slice),
            _ => None,
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(keys: &[&[u8]]) -> MemTable {
        let mem = MemTable::new(Table::new());
        let ops: Vec<_> = keys
            .iter()
            .map(|k| BatchOp::Put { key: k.to_vec(), value: k.to_vec() })
            .collect();
        mem.apply(&ops).unwrap();
        mem
    }

    #[test]
    fn test_seek_lands_on_first_greater_or_equal() {
        let mem = table(&[b"a", b"b", b"ca", b"cb", b"d"]);
        let mut cur = mem.cursor().unwrap();
        cur.seek(b"c").unwrap();
        assert_eq!(cur.key(), Some(&b"ca"[..]));
        cur.seek(b"cb").unwrap();
        assert_eq!(cur.key(), Some(&b"cb"[..]));
        cur.seek(b"z").unwrap();
        assert!(!cur.valid());
        cur.prev().unwrap();
        assert_eq!(cur.key(), Some(&b"d"[..]));
    }

    #[test]
    fn test_prev_at_before_first_is_noop() {
        let mem = table(&[b"a", b"b"]);
        let mut cur = mem.cursor().unwrap();
        cur.seek_first().unwrap();
        cur.prev().unwrap();
        assert!(!cur.valid());
        cur.prev().unwrap();
        assert!(!cur.valid());
        cur.next().unwrap();
        assert_eq!(cur.key(), Some(&b"a"[..]));
    }

    #[test]
    fn test_next_at_past_last_is_noop() {
        let mem = table(&[b"a"]);
        let mut cur = mem.cursor().unwrap();
        cur.seek_last().unwrap();
        cur.next().unwrap();
        cur.next().unwrap();
        assert!(!cur.valid());
        assert_eq!(cur.value(), None);
        cur.prev().unwrap();
        assert_eq!(cur.value(), Some(&b"a"[..]));
    }

    #[test]
    fn test_empty_table() {
        let mem = table(&[]);
        let mut cur = mem.cursor().unwrap();
        cur.seek_first().unwrap();
        assert!(!cur.valid());
        cur.seek_last().unwrap();
        assert!(!cur.valid());
    }

    #[test]
    fn test_snapshot_ignores_later_writes() {
        let mem = table(&[b"a", b"b"]);
        let mut cur = mem.cursor().unwrap();
        mem.apply(&[
            BatchOp::Delete { key: b"a".to_vec() },
            BatchOp::Put { key: b"c".to_vec(), value: b"c".to_vec() },
        ])
        .unwrap();

        cur.seek_first().unwrap();
        assert_eq!(cur.key(), Some(&b"a"[..]));
        assert_eq!(cur.value(), Some(&b"a"[..]));
        cur.seek_last().unwrap();
        assert_eq!(cur.key(), Some(&b"b"[..]));

        assert_eq!(mem.get(b"a").unwrap(), None);
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn test_close_fails_everything() {
        let mem = table(&[b"a"]);
        let mut cur = mem.cursor().unwrap();
        assert!(mem.close());
        assert!(!mem.close());
        assert!(matches!(mem.get(b"a"), Err(StoreError::Closed)));
        assert!(matches!(cur.seek_first(), Err(StoreError::Closed)));
        assert!(cur.is_closed());
        assert!(matches!(mem.cursor(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_apply_after_close_changes_nothing() {
        let mem = table(&[b"a"]);
        mem.close();
        let result = mem.apply(&[BatchOp::Delete { key: b"a".to_vec() }]);
        assert!(matches!(result, Err(StoreError::Closed)));
        assert_eq!(mem.len(), 1);
    }
}
