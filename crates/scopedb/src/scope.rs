//! Prefix namespaces over a shared engine.
//!
//! A [`Scope`] is a cheap handle: the engine it was derived from plus an
//! accumulated key prefix. Every key passed in is local to that prefix and
//! every key handed back has it stripped, so code written against a scope
//! cannot see or touch keys outside it.

use std::iter::FusedIterator;
use std::sync::Arc;

use scopedb_core::{Engine, ReadOptions, WriteOptions};
use tracing::trace;

use crate::batch::Batch;
use crate::cursor::{Cursor, Entries};
use crate::error::Result;
use crate::range::RangeInterval;
use crate::range_view::RangeView;

#[derive(Clone)]
pub struct Scope {
    engine: Arc<dyn Engine>,
    prefix: Vec<u8>,
}

impl Scope {
    pub(crate) fn root(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            prefix: Vec::new(),
        }
    }

    /// Full engine prefix of this scope; empty for the root.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// A nested scope whose prefix is this scope's prefix followed by
    /// `prefix`. Scoping by an empty prefix yields an equivalent scope.
    pub fn scope(&self, prefix: &[u8]) -> Scope {
        Scope {
            engine: Arc::clone(&self.engine),
            prefix: self.engine_key(prefix),
        }
    }

    fn engine_key(&self, key: &[u8]) -> Vec<u8> {
        [self.prefix.as_slice(), key].concat()
    }

    /// Value under `key`, or `None` if absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.get_with(key, &ReadOptions::default())
    }

    pub fn get_with(&self, key: &[u8], opts: &ReadOptions) -> Result<Option<Vec<u8>>> {
        Ok(self.engine.get(&self.engine_key(key), opts)?)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put_with(key, value, &WriteOptions::default())
    }

    pub fn put_with(&self, key: &[u8], value: &[u8], opts: &WriteOptions) -> Result<()> {
        Ok(self.engine.put(&self.engine_key(key), value, opts)?)
    }

    /// Remove `key`. Deleting an absent key is not an error.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.delete_with(key, &WriteOptions::default())
    }

    pub fn delete_with(&self, key: &[u8], opts: &WriteOptions) -> Result<()> {
        Ok(self.engine.delete(&self.engine_key(key), opts)?)
    }

    /// Apply `batch` atomically, its keys taken relative to this scope.
    pub fn write(&self, batch: &Batch) -> Result<()> {
        self.write_with(batch, &WriteOptions::default())
    }

    pub fn write_with(&self, batch: &Batch, opts: &WriteOptions) -> Result<()> {
        let ops = batch.prefixed(&self.prefix);
        trace!(ops = ops.len(), prefix_len = self.prefix.len(), "writing batch");
        Ok(self.engine.apply_batch(&ops, opts)?)
    }

    /// A cursor over this scope, positioned before the first entry.
    pub fn iterator(&self) -> Result<Cursor> {
        self.prefixed_iterator(b"")
    }

    /// A cursor restricted to local keys starting with `prefix`. Keys it
    /// returns have both this scope's prefix and `prefix` stripped.
    pub fn prefixed_iterator(&self, prefix: &[u8]) -> Result<Cursor> {
        let raw = self.engine.new_cursor()?;
        Ok(Cursor::new(raw, self.engine_key(prefix)))
    }

    /// Entries with local keys inside `interval`.
    pub fn range(&self, interval: RangeInterval) -> Result<RangeView<Cursor>> {
        Ok(self.iterator()?.into_range(interval))
    }

    /// `(key, value)` pairs of the whole scope in key order.
    pub fn iter(&self) -> Result<Iter> {
        Ok(Iter(self.iterator()?.into_iter()))
    }

    pub fn keys(&self) -> Result<Keys> {
        self.keys_with_prefix(b"")
    }

    /// Keys starting with `prefix`, returned with `prefix` removed.
    pub fn keys_with_prefix(&self, prefix: &[u8]) -> Result<Keys> {
        Ok(Keys(self.prefixed_iterator(prefix)?.into_iter()))
    }

    pub fn values(&self) -> Result<Values> {
        self.values_with_prefix(b"")
    }

    pub fn values_with_prefix(&self, prefix: &[u8]) -> Result<Values> {
        Ok(Values(self.prefixed_iterator(prefix)?.into_iter()))
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("prefix", &self.prefix.escape_ascii().to_string())
            .finish_non_exhaustive()
    }
}

/// Iterator returned by [`Scope::iter`].
pub struct Iter(Entries<Cursor>);

impl Iterator for Iter {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|r| r.map(|e| e.into_pair()))
    }
}

impl FusedIterator for Iter {}

/// Iterator returned by [`Scope::keys`].
pub struct Keys(Entries<Cursor>);

impl Iterator for Keys {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|r| r.map(|e| e.key))
    }
}

impl FusedIterator for Keys {}

/// Iterator returned by [`Scope::values`].
pub struct Values(Entries<Cursor>);

impl Iterator for Values {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|r| r.map(|e| e.value))
    }
}

impl FusedIterator for Values {}

#[cfg(test)]
mod tests {
    use super::*;
    use scopedb_core::MemoryEngine;

    fn root() -> (Scope, Arc<MemoryEngine>) {
        let engine = Arc::new(MemoryEngine::new());
        (Scope::root(engine.clone()), engine)
    }

    #[test]
    fn test_scoped_keys_land_under_prefix() {
        let (root, engine) = root();
        let users = root.scope(b"users/");
        users.put(b"alice", b"1").unwrap();
        assert_eq!(
            engine.get(b"users/alice", &ReadOptions::default()).unwrap(),
            Some(b"1".to_vec())
        );
        assert_eq!(users.get(b"alice").unwrap(), Some(b"1".to_vec()));
        assert_eq!(root.get(b"alice").unwrap(), None);
        users.delete(b"alice").unwrap();
        users.delete(b"alice").unwrap();
        assert!(engine.is_empty());
    }

    #[test]
    fn test_nested_scope_accumulates() {
        let (root, _) = root();
        let inner = root.scope(b"a").scope(b"b").scope(b"");
        assert_eq!(inner.prefix(), b"ab");
        inner.put(b"c", b"v").unwrap();
        assert_eq!(root.get(b"abc").unwrap(), Some(b"v".to_vec()));
        assert_eq!(root.scope(b"a").get(b"bc").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_iteration_stays_inside_scope() {
        let (root, _) = root();
        let ks: [&[u8]; 4] = [b"a", b"p1", b"p2", b"q"];
        for k in ks {
            root.put(k, k).unwrap();
        }
        let p = root.scope(b"p");
        let pairs: Vec<_> = p.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(pairs, vec![(b"1".to_vec(), b"p1".to_vec()), (b"2".to_vec(), b"p2".to_vec())]);
        let values: Vec<_> = p.values().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![b"p1".to_vec(), b"p2".to_vec()]);
    }

    #[test]
    fn test_keys_with_prefix_strips_both() {
        let (root, _) = root();
        let s = root.scope(b"s/");
        let ks: [&[u8]; 4] = [b"c", b"cd", b"ce", b"d"];
        for k in ks {
            s.put(k, b"").unwrap();
        }
        let keys: Vec<_> = s.keys_with_prefix(b"c").unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(keys, vec![b"".to_vec(), b"d".to_vec(), b"e".to_vec()]);
        let values: Vec<_> = s.values_with_prefix(b"z").unwrap().collect();
        assert!(values.is_empty());
    }

    #[test]
    fn test_batch_through_scope() {
        let (root, _) = root();
        let s = root.scope(b"x:");
        s.put(b"old", b"1").unwrap();
        let mut batch = Batch::new();
        batch.put(b"new", b"2").delete(b"old");
        s.write(&batch).unwrap();
        let keys: Vec<_> = root.keys().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(keys, vec![b"x:new".to_vec()]);
    }

    #[test]
    fn test_debug_escapes_prefix() {
        let (root, _) = root();
        let dbg = format!("{:?}", root.scope(b"\xffa"));
        assert!(dbg.contains("\\xffa"));
    }
}
