//! Write batches.

use scopedb_core::BatchOp;

/// An ordered list of puts and deletes, applied all-or-nothing by
/// [`Scope::write`](crate::Scope::write).
///
/// Keys are local to whatever scope the batch is written through, so the
/// same batch can be replayed against different scopes. Later operations on
/// a key win over earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        self
    }

    pub fn delete(&mut self, key: &[u8]) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
        self
    }

    /// Drop every queued operation so the batch can be reused.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Copy of the batch with `prefix` prepended to every key.
    pub(crate) fn prefixed(&self, prefix: &[u8]) -> Vec<BatchOp> {
        let join = |key: &[u8]| [prefix, key].concat();
        self.ops
            .iter()
            .map(|op| match op {
                BatchOp::Put { key, value } => BatchOp::Put {
                    key: join(key),
                    value: value.clone(),
                },
                BatchOp::Delete { key } => BatchOp::Delete { key: join(key) },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_clear() {
        let mut batch = Batch::new();
        batch.put(b"a", b"1").delete(b"b").put(b"c", b"3");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.ops()[1], BatchOp::Delete { key: b"b".to_vec() });
        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_prefixed_rewrites_keys_only() {
        let mut batch = Batch::new();
        batch.put(b"k", b"v").delete(b"");
        assert_eq!(
            batch.prefixed(b"ns/"),
            vec![
                BatchOp::Put { key: b"ns/k".to_vec(), value: b"v".to_vec() },
                BatchOp::Delete { key: b"ns/".to_vec() },
            ]
        );
        // Original is untouched
        assert_eq!(batch.ops()[0].key(), b"k");
    }
}
