//! Bounded forward iteration over a cursor.

use std::borrow::BorrowMut;
use std::iter::FusedIterator;

use crate::cursor::{Cursor, Entry};
use crate::error::Result;
use crate::range::KeyRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not yet positioned at the start bound
    Pending,
    Running,
    Done,
}

/// Entries of a cursor between two bounds, in ascending order.
///
/// Created by [`Cursor::range`] or [`Scope::range`](crate::Scope::range).
/// The underlying cursor is repositioned to the start bound on the first
/// call to `next`, and is left just past the last yielded entry.
pub struct RangeView<C> {
    cursor: C,
    /// Engine keys, already clipped to the cursor's prefix
    range: KeyRange,
    phase: Phase,
}

impl<C: BorrowMut<Cursor>> RangeView<C> {
    pub(crate) fn new(cursor: C, range: KeyRange) -> Self {
        Self {
            cursor,
            range,
            phase: Phase::Pending,
        }
    }

    /// Give the cursor back.
    pub fn into_cursor(self) -> C {
        self.cursor
    }

    fn step(&mut self) -> Result<Option<Entry>> {
        let cursor = self.cursor.borrow_mut();
        match self.phase {
            Phase::Done => return Ok(None),
            Phase::Pending => {
                if self.range.is_empty() {
                    self.phase = Phase::Done;
                    return Ok(None);
                }
                cursor.seek_range_start(&self.range)?;
                self.phase = Phase::Running;
            }
            Phase::Running => {}
        }

        let in_range = cursor
            .engine_key()
            .is_some_and(|k| self.range.before_end(k));
        if !in_range {
            self.phase = Phase::Done;
            return Ok(None);
        }
        let entry = cursor.entry()?;
        cursor.next()?;
        Ok(Some(entry))
    }
}

impl<C: BorrowMut<Cursor>> Iterator for RangeView<C> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.phase = Phase::Done;
                Some(Err(e))
            }
        }
    }
}

impl<C: BorrowMut<Cursor>> FusedIterator for RangeView<C> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeInterval;
    use scopedb_core::{Engine, MemoryEngine, WriteOptions};

    fn engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        let ks: [&[u8]; 5] = [b"aa", b"bb", b"cc", b"dd", b"ee"];
        for k in ks {
            engine.put(k, k, &WriteOptions::default()).unwrap();
        }
        engine
    }

    fn collect(engine: &MemoryEngine, prefix: &[u8], interval: RangeInterval) -> Vec<Vec<u8>> {
        Cursor::new(engine.new_cursor().unwrap(), prefix.to_vec())
            .into_range(interval)
            .map(|e| e.unwrap().key)
            .collect()
    }

    fn keys(ks: &[&[u8]]) -> Vec<Vec<u8>> {
        ks.iter().map(|k| k.to_vec()).collect()
    }

    #[test]
    fn test_inclusivity_combinations() {
        let e = engine();
        let iv = || RangeInterval::between(b"bb", b"dd");
        assert_eq!(collect(&e, b"", iv()), keys(&[b"bb", b"cc"]));
        assert_eq!(collect(&e, b"", iv().end_inclusive(true)), keys(&[b"bb", b"cc", b"dd"]));
        assert_eq!(collect(&e, b"", iv().start_inclusive(false)), keys(&[b"cc"]));
        assert_eq!(
            collect(&e, b"", iv().start_inclusive(false).end_inclusive(true)),
            keys(&[b"cc", b"dd"])
        );
    }

    #[test]
    fn test_open_ended() {
        let e = engine();
        assert_eq!(collect(&e, b"", RangeInterval::all()).len(), 5);
        assert_eq!(
            collect(&e, b"", RangeInterval::all().start(b"b")),
            keys(&[b"bb", b"cc", b"dd", b"ee"])
        );
        assert_eq!(collect(&e, b"", RangeInterval::all().end(b"b")), keys(&[b"aa"]));
    }

    #[test]
    fn test_empty_and_inverted() {
        let e = engine();
        assert!(collect(&e, b"", RangeInterval::between(b"cc", b"cc")).is_empty());
        assert!(collect(&e, b"", RangeInterval::between(b"dd", b"bb")).is_empty());
        assert_eq!(
            collect(&e, b"", RangeInterval::between(b"cc", b"cc").end_inclusive(true)),
            keys(&[b"cc"])
        );
    }

    #[test]
    fn test_range_ignores_current_position() {
        let e = engine();
        let mut cur = Cursor::new(e.new_cursor().unwrap(), Vec::new());
        cur.seek(b"dd").unwrap();
        let got: Vec<_> = cur.range(RangeInterval::all()).map(|r| r.unwrap().key).collect();
        assert_eq!(got.len(), 5);
        assert!(!cur.valid());
    }

    #[test]
    fn test_range_under_prefix() {
        let e = engine();
        e.put(b"b", b"x", &WriteOptions::default()).unwrap();
        assert_eq!(collect(&e, b"b", RangeInterval::all()), keys(&[b"", b"b"]));
        assert_eq!(
            collect(&e, b"b", RangeInterval::all().start(b"").start_inclusive(false)),
            keys(&[b"b"])
        );
    }
}
