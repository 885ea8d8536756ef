//! Errors surfaced by the scoping layer.

use scopedb_core::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Failure reported by the backing engine.
    #[error(transparent)]
    Engine(StoreError),

    #[error("database is closed")]
    Closed,

    /// `key`/`value` read while the cursor is not on an entry.
    #[error("cursor is not positioned on an entry")]
    InvalidPosition,

    /// `read_next` called after the last entry.
    #[error("cursor is exhausted")]
    Exhausted,
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Closed => Error::Closed,
            other => Error::Engine(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
