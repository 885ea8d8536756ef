//! ScopeDB: nested prefix namespaces and bounded cursors over an ordered
//! key-value engine
//!
//! # Architecture
//!
//! - **[`Db`]**: owns an engine ([`DiskEngine`] or [`MemoryEngine`]) and
//!   derefs to the root [`Scope`]
//! - **[`Scope`]**: a key prefix over the engine; nests by concatenation
//! - **[`Cursor`]**: bidirectional, prefix-restricted, point-in-time
//! - **[`RangeView`]**: a cursor bounded by a [`RangeInterval`]
//! - **[`Batch`]**: puts and deletes applied atomically through a scope
//!
//! ```
//! use scopedb::{Batch, Db, RangeInterval};
//!
//! let db = Db::memory();
//! let logs = db.scope(b"logs/");
//!
//! let mut batch = Batch::new();
//! batch.put(b"001", b"boot").put(b"002", b"ready").put(b"003", b"halt");
//! logs.write(&batch)?;
//!
//! let keys: Vec<_> = logs
//!     .range(RangeInterval::between(b"001", b"003").start_inclusive(false))?
//!     .map(|e| e.map(|e| e.key))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(keys, vec![b"002".to_vec()]);
//!
//! assert_eq!(db.get(b"logs/003")?, Some(b"halt".to_vec()));
//! # Ok::<(), scopedb::Error>(())
//! ```

pub mod batch;
pub mod cursor;
pub mod db;
pub mod error;
pub mod range;
pub mod range_view;
pub mod scope;

pub use batch::Batch;
pub use cursor::{Cursor, Entries, Entry};
pub use db::Db;
pub use error::{Error, Result};
pub use range::{upper_bound, KeyRange, RangeInterval};
pub use range_view::RangeView;
pub use scope::{Iter, Keys, Scope, Values};

// Engine-side types callers need to open or configure a database
pub use scopedb_core::{
    DiskEngine, Engine, MemoryEngine, Options, ReadOptions, StoreError, WriteOptions,
};
