//! Error types for engine operations
//!
//! Every failure originating in a storage engine is a [`StoreError`]. The
//! variants carry enough context (paths, offsets, sizes) to diagnose a failed
//! open or a damaged WAL without re-running with extra logging.

use std::path::PathBuf;

use thiserror::Error;

/// Engine error types with detailed context
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// I/O operation failed
    #[error("I/O error{}: {message} ({kind})", fmt_path(.path))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Opening a database that does not exist without `create_if_missing`
    #[error("database {} does not exist (create_if_missing is false)", .path.display())]
    Missing {
        /// Database directory that was requested
        path: PathBuf,
    },

    /// Opening an existing database with `error_if_exists`
    #[error("database {} already exists (error_if_exists is true)", .path.display())]
    AlreadyExists {
        /// Database directory that was requested
        path: PathBuf,
    },

    /// Options failed validation
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// WAL file is corrupted and cannot be recovered
    #[error("WAL corrupted in {} at offset {offset}: {reason}", .path.display())]
    WalCorrupted {
        /// Path to the corrupted WAL file
        path: PathBuf,
        /// Byte offset where corruption was detected
        offset: u64,
        /// Description of the corruption
        reason: String,
    },

    /// Checksum verification failed
    #[error(
        "checksum mismatch in {} at offset {offset}: expected 0x{expected:08x}, got 0x{actual:08x}",
        .path.display()
    )]
    ChecksumMismatch {
        /// File where checksum failed
        path: PathBuf,
        /// Expected checksum value
        expected: u32,
        /// Actual checksum computed
        actual: u32,
        /// Byte offset of the corrupted data
        offset: u64,
    },

    /// Torn write detected (partial record at end of file)
    #[error(
        "torn write in {} at offset {offset}: expected {expected_size} bytes, \
         only {available_bytes} available",
        .path.display()
    )]
    TornWrite {
        /// File with torn write
        path: PathBuf,
        /// Expected payload size
        expected_size: u32,
        /// Actual bytes available
        available_bytes: u64,
        /// Offset where torn write begins
        offset: u64,
    },

    /// Magic bytes not found at expected location
    #[error(
        "magic bytes not found in {} at offset {offset}: found {}",
        .path.display(), hex4(.found_bytes)
    )]
    NoMagicFound {
        /// File being read
        path: PathBuf,
        /// Offset where magic was expected
        offset: u64,
        /// Bytes actually found
        found_bytes: [u8; 4],
    },

    /// Key or value size exceeds the configured maximum
    #[error("entry {component} too large: {entry_size} bytes exceeds limit of {max_size} bytes")]
    OversizedEntry {
        /// Size of the oversized component
        entry_size: u64,
        /// Maximum allowed size
        max_size: u64,
        /// Whether it's the key or value that's oversized
        component: &'static str,
    },

    /// The engine handle has been closed
    #[error("engine is closed")]
    Closed,
}

fn fmt_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

fn hex4(bytes: &[u8; 4]) -> String {
    format!("{:02x}{:02x}{:02x}{:02x}", bytes[0], bytes[1], bytes[2], bytes[3])
}

/// Convert std::io::Error to StoreError::Io
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    /// Build an `Io` error that remembers which file was being touched.
    pub fn io_at(path: impl Into<PathBuf>, err: &std::io::Error, what: &str) -> Self {
        StoreError::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{}: {}", what, err),
        }
    }
}

/// Result type alias for engine operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::ChecksumMismatch {
            path: PathBuf::from("/tmp/test.wal"),
            expected: 0x12345678,
            actual: 0x87654321,
            offset: 1024,
        };

        let display = err.to_string();
        assert!(display.contains("checksum mismatch"));
        assert!(display.contains("0x12345678"));
        assert!(display.contains("0x87654321"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();

        match store_err {
            StoreError::Io { kind, path, .. } => {
                assert_eq!(kind, std::io::ErrorKind::NotFound);
                assert!(path.is_none());
            }
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_display_with_and_without_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let with_path = StoreError::io_at("/data/db/CURRENT", &io_err, "write marker");
        assert!(with_path.to_string().contains("/data/db/CURRENT"));
        assert!(with_path.to_string().contains("write marker"));

        let without_path: StoreError = io_err.into();
        assert!(without_path.to_string().starts_with("I/O error: "));
    }

    #[test]
    fn test_open_errors_name_the_path() {
        let missing = StoreError::Missing { path: PathBuf::from("/nope") };
        assert!(missing.to_string().contains("/nope"));
        let exists = StoreError::AlreadyExists { path: PathBuf::from("/here") };
        assert!(exists.to_string().contains("already exists"));
    }
}
