//! Prefix-restricted, bidirectional cursor over an engine snapshot.
//!
//! A [`Cursor`] wraps a raw engine cursor together with the restriction
//! prefix it was created under (scope prefix plus any extra iterator prefix).
//! Seek targets are given in local keys, keys come back with the prefix
//! stripped, and the cursor never lands on a key outside the prefix.
//!
//! Position follows the engine's three-state model: before-first, on an
//! entry, or past-last. Stepping off either end parks the cursor; `next`
//! from before-first and `prev` from past-last step back in.

use std::borrow::{Borrow, BorrowMut};
use std::ops::Bound::{Excluded, Included, Unbounded};

use scopedb_core::RawCursor;

use crate::error::{Error, Result};
use crate::range::{KeyRange, RangeInterval};
use crate::range_view::RangeView;

/// An owned key/value pair with the restriction prefix removed from `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Entry {
    pub fn into_pair(self) -> (Vec<u8>, Vec<u8>) {
        (self.key, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeFirst,
    At,
    PastLast,
}

pub struct Cursor {
    raw: Box<dyn RawCursor>,
    prefix: Vec<u8>,
    /// Engine-key range covered by `prefix`
    bounds: KeyRange,
    state: State,
}

impl Cursor {
    pub(crate) fn new(raw: Box<dyn RawCursor>, prefix: Vec<u8>) -> Self {
        let bounds = KeyRange::prefix(&prefix);
        Self {
            raw,
            prefix,
            bounds,
            state: State::BeforeFirst,
        }
    }

    /// Restriction prefix stripped from every key this cursor returns.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    fn ensure_open(&self) -> Result<()> {
        if self.raw.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// After a forward move: on an entry if the raw key is still under the
    /// prefix, otherwise past-last.
    fn settle_forward(&mut self) {
        self.state = match self.raw.key() {
            Some(k) if self.bounds.before_end(k) => State::At,
            _ => State::PastLast,
        };
    }

    fn settle_backward(&mut self) {
        self.state = match self.raw.key() {
            Some(k) if self.bounds.after_start(k) => State::At,
            _ => State::BeforeFirst,
        };
    }

    /// Position at the first entry whose local key is `>= key`.
    pub fn seek(&mut self, key: &[u8]) -> Result<&mut Self> {
        let mut target = self.prefix.clone();
        target.extend_from_slice(key);
        self.raw.seek(&target)?;
        self.settle_forward();
        Ok(self)
    }

    pub fn seek_first(&mut self) -> Result<&mut Self> {
        let start = self.bounds.clone();
        self.seek_range_start(&start)?;
        Ok(self)
    }

    pub fn seek_last(&mut self) -> Result<&mut Self> {
        match self.bounds.end() {
            Excluded(end) => {
                self.raw.seek(end)?;
                if self.raw.valid() {
                    self.raw.prev()?;
                } else {
                    self.raw.seek_last()?;
                }
            }
            // Prefix ranges never carry an inclusive end
            Included(_) | Unbounded => self.raw.seek_last()?,
        }
        self.settle_backward();
        Ok(self)
    }

    /// Step forward. From before-first this lands on the first entry; at
    /// past-last it does nothing.
    pub fn next(&mut self) -> Result<&mut Self> {
        self.ensure_open()?;
        match self.state {
            State::BeforeFirst => return self.seek_first(),
            State::At => {
                self.raw.next()?;
                self.settle_forward();
            }
            State::PastLast => {}
        }
        Ok(self)
    }

    /// Step backward. From past-last this lands on the last entry; at
    /// before-first it does nothing.
    pub fn prev(&mut self) -> Result<&mut Self> {
        self.ensure_open()?;
        match self.state {
            State::PastLast => return self.seek_last(),
            State::At => {
                self.raw.prev()?;
                self.settle_backward();
            }
            State::BeforeFirst => {}
        }
        Ok(self)
    }

    /// Positioned on an entry of a still-open engine.
    pub fn valid(&self) -> bool {
        self.state == State::At && !self.raw.is_closed()
    }

    /// Current local key.
    pub fn key(&self) -> Result<&[u8]> {
        self.ensure_open()?;
        match (self.state, self.raw.key()) {
            (State::At, Some(k)) => Ok(&k[self.prefix.len()..]),
            _ => Err(Error::InvalidPosition),
        }
    }

    pub fn value(&self) -> Result<&[u8]> {
        self.ensure_open()?;
        match (self.state, self.raw.value()) {
            (State::At, Some(v)) => Ok(v),
            _ => Err(Error::InvalidPosition),
        }
    }

    /// Owned copy of the current entry.
    pub fn entry(&self) -> Result<Entry> {
        Ok(Entry {
            key: self.key()?.to_vec(),
            value: self.value()?.to_vec(),
        })
    }

    /// Return the current entry, then advance. Fails with
    /// [`Error::Exhausted`] once the cursor has run off the end.
    pub fn read_next(&mut self) -> Result<Entry> {
        let entry = match self.entry() {
            Err(Error::InvalidPosition) => return Err(Error::Exhausted),
            other => other?,
        };
        self.next()?;
        Ok(entry)
    }

    /// Bounded forward iteration that borrows this cursor.
    ///
    /// Bounds are local keys. An omitted bound reaches to the edge of the
    /// cursor's prefix, not to its current position.
    pub fn range(&mut self, interval: RangeInterval) -> RangeView<&mut Cursor> {
        let range = self.resolve(&interval);
        RangeView::new(self, range)
    }

    /// Like [`range`](Self::range) but takes ownership of the cursor.
    pub fn into_range(self, interval: RangeInterval) -> RangeView<Cursor> {
        let range = self.resolve(&interval);
        RangeView::new(self, range)
    }

    /// Iterate from the current position onward.
    pub fn entries(&mut self) -> Entries<&mut Cursor> {
        Entries::new(self)
    }

    fn resolve(&self, interval: &RangeInterval) -> KeyRange {
        interval.to_key_range(&self.prefix).intersect(&self.bounds)
    }

    /// Raw engine key under the cursor, if positioned.
    pub(crate) fn engine_key(&self) -> Option<&[u8]> {
        match self.state {
            State::At => self.raw.key(),
            _ => None,
        }
    }

    /// Position at the first engine key satisfying `range`'s start bound.
    pub(crate) fn seek_range_start(&mut self, range: &KeyRange) -> Result<()> {
        match range.start() {
            Unbounded => self.raw.seek_first()?,
            Included(start) => self.raw.seek(start)?,
            Excluded(start) => {
                self.raw.seek(start)?;
                if self.raw.key() == Some(start.as_slice()) {
                    self.raw.next()?;
                }
            }
        }
        self.settle_forward();
        Ok(())
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("prefix", &self.prefix.escape_ascii().to_string())
            .field("state", &self.state)
            .finish()
    }
}

/// Iterator over a cursor's entries from its current position onward.
///
/// Built from a fresh cursor it starts at the first entry.
pub struct Entries<C> {
    cursor: C,
    done: bool,
}

impl<C: BorrowMut<Cursor>> Entries<C> {
    fn new(cursor: C) -> Self {
        Self { cursor, done: false }
    }

    pub fn cursor(&self) -> &Cursor {
        self.cursor.borrow()
    }
}

impl<C: BorrowMut<Cursor>> Iterator for Entries<C> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let cursor = self.cursor.borrow_mut();
        if cursor.state == State::BeforeFirst {
            if let Err(e) = cursor.seek_first() {
                self.done = true;
                return Some(Err(e));
            }
        }
        match cursor.read_next() {
            Ok(entry) => Some(Ok(entry)),
            Err(Error::Exhausted) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<C: BorrowMut<Cursor>> std::iter::FusedIterator for Entries<C> {}

impl IntoIterator for Cursor {
    type Item = Result<Entry>;
    type IntoIter = Entries<Cursor>;

    fn into_iter(self) -> Self::IntoIter {
        Entries::new(self)
    }
}

impl<'a> IntoIterator for &'a mut Cursor {
    type Item = Result<Entry>;
    type IntoIter = Entries<&'a mut Cursor>;

    fn into_iter(self) -> Self::IntoIter {
        Entries::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopedb_core::{Engine, MemoryEngine, WriteOptions};

    fn engine(keys: &[&[u8]]) -> MemoryEngine {
        let engine = MemoryEngine::new();
        for k in keys {
            let value = [&b"v:"[..], *k].concat();
            engine.put(k, &value, &WriteOptions::default()).unwrap();
        }
        engine
    }

    fn cursor(engine: &MemoryEngine, prefix: &[u8]) -> Cursor {
        Cursor::new(engine.new_cursor().unwrap(), prefix.to_vec())
    }

    fn keys(cursor: Cursor) -> Vec<Vec<u8>> {
        cursor.into_iter().map(|e| e.unwrap().key).collect()
    }

    #[test]
    fn test_fresh_cursor_is_before_first() {
        let engine = engine(&[b"a"]);
        let mut cur = cursor(&engine, b"");
        assert!(!cur.valid());
        assert!(matches!(cur.key(), Err(Error::InvalidPosition)));
        cur.next().unwrap();
        assert_eq!(cur.key().unwrap(), b"a");
    }

    #[test]
    fn test_prefix_is_stripped_and_enforced() {
        let engine = engine(&[b"a", b"pa", b"pb", b"pc", b"q"]);
        assert_eq!(keys(cursor(&engine, b"p")), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        let mut cur = cursor(&engine, b"p");
        cur.seek_last().unwrap();
        assert_eq!(cur.key().unwrap(), b"c");
        cur.next().unwrap();
        assert!(!cur.valid());
        cur.seek_first().unwrap();
        assert_eq!(cur.key().unwrap(), b"a");
        cur.prev().unwrap();
        assert!(!cur.valid());
    }

    #[test]
    fn test_prefix_equal_key_is_empty_local_key() {
        let engine = engine(&[b"c", b"cd", b"ce", b"d"]);
        assert_eq!(keys(cursor(&engine, b"c")), vec![b"".to_vec(), b"d".to_vec(), b"e".to_vec()]);
    }

    #[test]
    fn test_seek_local_key() {
        let engine = engine(&[b"xa", b"xc", b"xe", b"y"]);
        let mut cur = cursor(&engine, b"x");
        cur.seek(b"b").unwrap();
        assert_eq!(cur.key().unwrap(), b"c");
        assert_eq!(cur.value().unwrap(), b"v:xc");
        cur.seek(b"f").unwrap();
        assert!(!cur.valid());
        cur.prev().unwrap();
        assert_eq!(cur.key().unwrap(), b"e");
    }

    #[test]
    fn test_seek_last_with_ff_prefixes() {
        let engine = engine(&[
            b"\x0f\xff\xfe\xff",
            b"\x0f\xff\xff\x00",
            b"\x0f\xff\xff\x01",
            b"\x0f\xff\xff\xff",
            b"\x10",
            b"\xff\xff\xfe",
            b"\xff\xff\xff\x01",
            b"\xff\xff\xff\xff",
        ]);
        let mut cur = cursor(&engine, b"\x0f\xff\xff");
        cur.seek_last().unwrap();
        assert_eq!(cur.key().unwrap(), b"\xff");

        let mut cur = cursor(&engine, b"\xff\xff\xff");
        cur.seek_last().unwrap();
        assert_eq!(cur.key().unwrap(), b"\xff");
        cur.prev().unwrap();
        assert_eq!(cur.key().unwrap(), b"\x01");
        cur.prev().unwrap();
        assert!(!cur.valid());
    }

    #[test]
    fn test_read_next_then_exhausted() {
        let engine = engine(&[b"a", b"b"]);
        let mut cur = cursor(&engine, b"");
        cur.seek(b"b").unwrap();
        let entry = cur.read_next().unwrap();
        assert_eq!(entry.into_pair(), (b"b".to_vec(), b"v:b".to_vec()));
        assert!(matches!(cur.read_next(), Err(Error::Exhausted)));
        // Stepping back re-enters at the last entry
        cur.prev().unwrap();
        assert_eq!(cur.key().unwrap(), b"b");
    }

    #[test]
    fn test_entries_from_current_position() {
        let engine = engine(&[b"a", b"b", b"c"]);
        let mut cur = cursor(&engine, b"");
        cur.seek(b"b").unwrap();
        let got: Vec<_> = cur.entries().map(|e| e.unwrap().key).collect();
        assert_eq!(got, vec![b"b".to_vec(), b"c".to_vec()]);
        assert!(!cur.valid());
    }

    #[test]
    fn test_empty_prefix_range() {
        let engine = engine(&[b"a", b"c"]);
        let mut cur = cursor(&engine, b"b");
        cur.seek_first().unwrap();
        assert!(!cur.valid());
        cur.seek_last().unwrap();
        assert!(!cur.valid());
        assert!(keys(cur).is_empty());
    }

    #[test]
    fn test_closed_engine() {
        let engine = engine(&[b"a"]);
        let mut cur = cursor(&engine, b"");
        cur.seek_first().unwrap();
        assert!(cur.valid());
        engine.close().unwrap();
        assert!(!cur.valid());
        assert!(matches!(cur.key(), Err(Error::Closed)));
        assert!(matches!(cur.next(), Err(Error::Closed)));
        assert!(matches!(cur.seek(b"a"), Err(Error::Closed)));
    }
}
