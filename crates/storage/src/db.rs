//! sled database wrapper with raw byte access and store-wide counters.

use crate::config::DatabaseConfig;
use sled::Db;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::debug;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Key already exists: {0}")]
    KeyExists(String),

    #[error("A transaction is already active on this batch")]
    TransactionActive,

    #[error("No active transaction on this batch")]
    NoActiveTransaction,
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A raw key/value pair as stored by the engine.
pub type RawRecord = (Vec<u8>, Vec<u8>);

/// Wrapper around a sled database.
///
/// Every single call is atomic against the engine. The update counter and
/// flush counter are shared by every batch opened on this store.
pub struct Database {
    db: Db,
    path: Option<PathBuf>,
    config: DatabaseConfig,
    update_counter: AtomicU64,
    flush_count: AtomicU64,
}

impl Database {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, DatabaseConfig::default())
    }

    /// Open a database at the given path with explicit settings.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: DatabaseConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = sled::Config::new()
            .path(&path)
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .temporary(config.temporary)
            .open()?;
        debug!(path = %path.display(), "opened wallet store");
        Ok(Self::from_parts(db, Some(path), config))
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let config = DatabaseConfig::default().temporary(true);
        let db = sled::Config::new()
            .temporary(true)
            .flush_every_ms(None)
            .open()?;
        Ok(Self::from_parts(db, None, config))
    }

    fn from_parts(db: Db, path: Option<PathBuf>, config: DatabaseConfig) -> Self {
        Self {
            db,
            path,
            config,
            update_counter: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        }
    }

    /// Filesystem location, `None` for temporary stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // =========================================================================
    // Raw byte access
    // =========================================================================

    pub fn get_raw<K: AsRef<[u8]>>(&self, key: K) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    pub fn put_raw<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<()> {
        self.db.insert(key.as_ref(), value)?;
        Ok(())
    }

    /// Insert only if the key is absent. Returns false if it already existed.
    pub fn insert_new<K: AsRef<[u8]>>(&self, key: K, value: &[u8]) -> Result<bool> {
        let swapped = self
            .db
            .compare_and_swap(key.as_ref(), None::<&[u8]>, Some(value))?;
        Ok(swapped.is_ok())
    }

    /// Delete a key. Deleting a missing key is not an error.
    pub fn delete<K: AsRef<[u8]>>(&self, key: K) -> Result<()> {
        self.db.remove(key)?;
        Ok(())
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Iterate every record in engine order (lexicographic by key).
    pub fn iter(&self) -> impl Iterator<Item = Result<RawRecord>> + '_ {
        self.db
            .iter()
            .map(|item| item.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(Into::into))
    }

    /// Iterate the records whose key starts with `prefix`.
    pub fn scan_prefix<P: AsRef<[u8]>>(
        &self,
        prefix: P,
    ) -> impl Iterator<Item = Result<RawRecord>> + '_ {
        self.db
            .scan_prefix(prefix)
            .map(|item| item.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(Into::into))
    }

    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// CRC over every key and value; fails if the engine cannot read a page.
    pub fn checksum(&self) -> Result<u32> {
        Ok(self.db.checksum()?)
    }

    // =========================================================================
    // Atomic groups and durability
    // =========================================================================

    /// Apply multiple operations atomically.
    pub fn apply(&self, operations: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key, value),
                BatchOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        let bytes = self.db.flush()?;
        let flushes = self.flush_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(bytes, flushes, "flushed wallet store");
        Ok(())
    }

    /// Count one successful write or erase. Returns the new counter value.
    pub fn increment_update_counter(&self) -> u64 {
        self.update_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Number of writes and erasures performed through batches on this store.
    pub fn update_counter(&self) -> u64 {
        self.update_counter.load(Ordering::SeqCst)
    }

    /// Number of flushes issued against the engine.
    pub fn flush_count(&self) -> u64 {
        self.flush_count.load(Ordering::SeqCst)
    }
}

/// Batch operation for atomic updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}
