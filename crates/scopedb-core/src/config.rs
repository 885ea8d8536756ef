//! Configuration for opening engines and issuing reads/writes
//!
//! [`Options`] governs how a database directory is opened and how large its
//! entries may be. [`ReadOptions`] and [`WriteOptions`] are passed per call.

use crate::error::{StoreError, StoreResult};

/// Default WAL file rotation threshold (64MB)
pub const DEFAULT_WAL_ROTATION_SIZE: u64 = 64 * 1024 * 1024;

/// Default maximum key size (64KB)
pub const DEFAULT_MAX_KEY_SIZE: usize = 64 * 1024;

/// Default maximum value size (32MB)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 32 * 1024 * 1024;

/// Options for opening an engine
#[derive(Debug, Clone)]
pub struct Options {
    /// Create the database if the directory holds no database yet
    pub create_if_missing: bool,
    /// Fail if the directory already holds a database
    pub error_if_exists: bool,
    /// Fail the open on the first corrupt WAL record instead of skipping it
    pub paranoid_checks: bool,
    /// WAL file rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl Options {
    /// Options that create the database when it is missing.
    pub fn create() -> Self {
        Self::default().create_if_missing(true)
    }

    pub fn create_if_missing(mut self, yes: bool) -> Self {
        self.create_if_missing = yes;
        self
    }

    pub fn error_if_exists(mut self, yes: bool) -> Self {
        self.error_if_exists = yes;
        self
    }

    pub fn paranoid_checks(mut self, yes: bool) -> Self {
        self.paranoid_checks = yes;
        self
    }

    pub fn wal_rotation_size_bytes(mut self, bytes: u64) -> Self {
        self.wal_rotation_size_bytes = bytes;
        self
    }

    pub fn max_key_size(mut self, bytes: usize) -> Self {
        self.max_key_size = bytes;
        self
    }

    pub fn max_value_size(mut self, bytes: usize) -> Self {
        self.max_value_size = bytes;
        self
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> StoreResult<()> {
        if self.wal_rotation_size_bytes < 64 * 1024 {
            return Err(StoreError::InvalidOptions(
                "wal_rotation_size_bytes must be >= 64KB".into(),
            ));
        }
        if self.max_key_size == 0 || self.max_key_size > u32::MAX as usize {
            return Err(StoreError::InvalidOptions(
                "max_key_size must be in [1, u32::MAX]".into(),
            ));
        }
        if self.max_value_size > u32::MAX as usize {
            return Err(StoreError::InvalidOptions(
                "max_value_size must be <= u32::MAX".into(),
            ));
        }
        Ok(())
    }

    /// Reject keys and values larger than the configured limits.
    pub fn check_entry(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.len() > self.max_key_size {
            return Err(StoreError::OversizedEntry {
                entry_size: key.len() as u64,
                max_size: self.max_key_size as u64,
                component: "key",
            });
        }
        if value.len() > self.max_value_size {
            return Err(StoreError::OversizedEntry {
                entry_size: value.len() as u64,
                max_size: self.max_value_size as u64,
                component: "value",
            });
        }
        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            create_if_missing: false,
            error_if_exists: false,
            paranoid_checks: false,
            wal_rotation_size_bytes: DEFAULT_WAL_ROTATION_SIZE,
            max_key_size: DEFAULT_MAX_KEY_SIZE,
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

/// Per-read options.
///
/// Both engines serve reads from RAM; records are checksum-verified when the
/// WAL is replayed, and there is no block cache to fill. The flags are kept so
/// callers can state intent against any [`Engine`](crate::Engine).
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub verify_checksums: bool,
    pub fill_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verify_checksums: false,
            fill_cache: true,
        }
    }
}

/// Per-write options.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Durably sync the WAL before the write returns
    pub sync: bool,
}

impl WriteOptions {
    pub fn sync() -> Self {
        Self { sync: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Options::default().validate().is_ok());
        assert!(Options::create().validate().is_ok());
    }

    #[test]
    fn test_default_does_not_create() {
        let opts = Options::default();
        assert!(!opts.create_if_missing);
        assert!(!opts.error_if_exists);
        assert!(Options::create().create_if_missing);
    }

    #[test]
    fn test_tiny_rotation_rejected() {
        let opts = Options::default().wal_rotation_size_bytes(1024);
        assert!(matches!(opts.validate(), Err(StoreError::InvalidOptions(_))));
    }

    #[test]
    fn test_zero_key_size_rejected() {
        let opts = Options::default().max_key_size(0);
        assert!(matches!(opts.validate(), Err(StoreError::InvalidOptions(_))));
    }

    #[test]
    fn test_check_entry_limits() {
        let opts = Options::default().max_key_size(4).max_value_size(8);
        assert!(opts.check_entry(b"abcd", b"12345678").is_ok());
        assert!(matches!(
            opts.check_entry(b"abcde", b""),
            Err(StoreError::OversizedEntry { component: "key", .. })
        ));
        assert!(matches!(
            opts.check_entry(b"a", b"123456789"),
            Err(StoreError::OversizedEntry { component: "value", .. })
        ));
    }

    #[test]
    fn test_read_write_defaults() {
        let read = ReadOptions::default();
        assert!(!read.verify_checksums);
        assert!(read.fill_cache);
        assert!(!WriteOptions::default().sync);
        assert!(WriteOptions::sync().sync);
    }
}
