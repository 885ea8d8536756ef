//! The root database handle.

use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use scopedb_core::{DiskEngine, Engine, MemoryEngine, Options};
use tracing::{debug, warn};

use crate::error::Result;
use crate::scope::Scope;

/// Owns an engine and exposes it as the root [`Scope`].
///
/// Derefs to the root scope, so `db.put(..)`, `db.scope(..)` and friends
/// work directly. Dropping the handle closes the engine; scopes and cursors
/// derived from it then fail with [`Error::Closed`](crate::Error::Closed).
pub struct Db {
    engine: Arc<dyn Engine>,
    root: Scope,
}

impl Db {
    /// Open a persistent database at `path`.
    ///
    /// ```no_run
    /// use scopedb::{Db, Options};
    ///
    /// let db = Db::open("/tmp/scopedb-demo", Options::create())?;
    /// let users = db.scope(b"users/");
    /// users.put(b"alice", b"admin")?;
    /// assert_eq!(users.get(b"alice")?, Some(b"admin".to_vec()));
    /// # Ok::<(), scopedb::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let engine = DiskEngine::open(path.as_ref(), options)?;
        debug!(path = %path.as_ref().display(), "opened database");
        Ok(Self::from_engine(Arc::new(engine)))
    }

    /// An ephemeral database; everything is lost when the handle drops.
    pub fn memory() -> Self {
        Self::from_engine(Arc::new(MemoryEngine::new()))
    }

    /// Wrap any engine. The `Db` closes it on drop, even if other clones of
    /// the `Arc` are still alive.
    pub fn from_engine(engine: Arc<dyn Engine>) -> Self {
        let root = Scope::root(Arc::clone(&engine));
        Self { engine, root }
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Close the engine. Idempotent.
    pub fn close(&self) -> Result<()> {
        Ok(self.engine.close()?)
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_closed()
    }
}

impl Deref for Db {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.root
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        if let Err(e) = self.engine.close() {
            warn!(error = %e, "failed to close database on drop");
        }
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_memory_roundtrip() {
        let db = Db::memory();
        db.put(b"hey", b"1").unwrap();
        assert_eq!(db.get(b"hey").unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.root().prefix(), b"");
    }

    #[test]
    fn test_open_missing_fails() {
        let dir = TempDir::new().unwrap();
        let result = Db::open(dir.path().join("absent"), Options::default());
        assert!(matches!(result, Err(Error::Engine(_))));
    }

    #[test]
    fn test_close_invalidates_scopes() {
        let db = Db::memory();
        let scope = db.scope(b"s");
        scope.put(b"k", b"v").unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(db.is_closed());
        assert!(matches!(scope.get(b"k"), Err(Error::Closed)));
        assert!(matches!(scope.iterator(), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_closes_engine() {
        let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());
        let scope = {
            let db = Db::from_engine(Arc::clone(&engine));
            db.scope(b"x")
        };
        assert!(engine.is_closed());
        assert!(matches!(scope.put(b"k", b"v"), Err(Error::Closed)));
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = TempDir::new().unwrap();
        {
            let db = Db::open(dir.path(), Options::create()).unwrap();
            db.scope(b"a/").put(b"k", b"v").unwrap();
        }
        let db = Db::open(dir.path(), Options::default()).unwrap();
        assert_eq!(db.get(b"a/k").unwrap(), Some(b"v".to_vec()));
    }
}
