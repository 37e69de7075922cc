//! Engine-level batch handle with explicit transactions.
//!
//! Outside a transaction each write or erase goes straight to the engine and
//! is atomic on its own. Between [`StoreBatch::txn_begin`] and
//! [`StoreBatch::txn_commit`] operations are buffered and applied as one
//! atomic group. Reads and scans through the batch see buffered operations.
//!
//! A batch that goes out of scope with a transaction still open commits it.

use crate::db::{BatchOp, Database, RawRecord, Result, StorageError};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::vec;
use tracing::{debug, error};

/// Buffered operations of an open transaction. `None` marks an erase.
type Pending = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Single-writer access handle to a [`Database`].
pub struct StoreBatch<'a> {
    db: &'a Database,
    pending: Option<Pending>,
}

impl<'a> StoreBatch<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db, pending: None }
    }

    pub fn database(&self) -> &'a Database {
        self.db
    }

    pub fn in_transaction(&self) -> bool {
        self.pending.is_some()
    }

    /// Read a value, honoring operations buffered in the open transaction.
    pub fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(op) = self.pending.as_ref().and_then(|p| p.get(key)) {
            return Ok(op.clone());
        }
        self.db.get_raw(key)
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.read(key)?.is_some())
    }

    /// Iterate every record in key order as this batch sees it.
    pub fn iter(&self) -> impl Iterator<Item = Result<RawRecord>> + 'a {
        self.scan_prefix(&[])
    }

    /// Iterate the records whose key starts with `prefix`, in key order.
    /// Buffered writes replace or add records and buffered erases hide them.
    pub fn scan_prefix(&self, prefix: &[u8]) -> impl Iterator<Item = Result<RawRecord>> + 'a {
        let buffered: Vec<(Vec<u8>, Option<Vec<u8>>)> = self
            .pending
            .iter()
            .flat_map(|pending| pending.range(prefix.to_vec()..))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Overlay {
            engine: self.db.scan_prefix(prefix.to_vec()).peekable(),
            pending: buffered.into_iter().peekable(),
        }
    }

    /// Write a value. With `overwrite` false an existing key is an error.
    pub fn write(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> Result<()> {
        if self.pending.is_some() {
            if !overwrite && self.exists(key)? {
                return Err(StorageError::KeyExists(hex::encode(key)));
            }
            if let Some(pending) = self.pending.as_mut() {
                pending.insert(key.to_vec(), Some(value.to_vec()));
            }
            return Ok(());
        }

        if overwrite {
            self.db.put_raw(key, value)
        } else if self.db.insert_new(key, value)? {
            Ok(())
        } else {
            Err(StorageError::KeyExists(hex::encode(key)))
        }
    }

    /// Erase a key. Erasing a missing key succeeds.
    pub fn erase(&mut self, key: &[u8]) -> Result<()> {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.insert(key.to_vec(), None);
                Ok(())
            }
            None => self.db.delete(key),
        }
    }

    pub fn txn_begin(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Err(StorageError::TransactionActive);
        }
        self.pending = Some(Pending::new());
        Ok(())
    }

    pub fn txn_commit(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or(StorageError::NoActiveTransaction)?;
        let ops: Vec<BatchOp> = pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOp::Insert { key, value },
                None => BatchOp::Remove { key },
            })
            .collect();
        debug!(ops = ops.len(), "committing transaction");
        self.db.apply(ops)
    }

    pub fn txn_abort(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or(StorageError::NoActiveTransaction)?;
        debug!(ops = pending.len(), "aborted transaction");
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()
    }

    /// Resolve the batch now, committing any open transaction.
    pub fn close(mut self) -> Result<()> {
        self.resolve()
    }

    fn resolve(&mut self) -> Result<()> {
        if self.pending.is_some() {
            self.txn_commit()
        } else {
            Ok(())
        }
    }
}

/// Merge of an engine cursor with the buffered operations of a transaction.
struct Overlay<I: Iterator<Item = Result<RawRecord>>> {
    engine: Peekable<I>,
    pending: Peekable<vec::IntoIter<(Vec<u8>, Option<Vec<u8>>)>>,
}

enum Step {
    Engine,
    Pending,
    Shadowed,
}

impl<I: Iterator<Item = Result<RawRecord>>> Iterator for Overlay<I> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let step = match (self.engine.peek(), self.pending.peek()) {
                (None, None) => return None,
                (Some(Err(_)), _) | (Some(Ok(_)), None) => Step::Engine,
                (None, Some(_)) => Step::Pending,
                (Some(Ok((engine_key, _))), Some((pending_key, _))) => {
                    match engine_key.cmp(pending_key) {
                        Ordering::Less => Step::Engine,
                        Ordering::Equal => Step::Shadowed,
                        Ordering::Greater => Step::Pending,
                    }
                }
            };
            if let Step::Engine = step {
                return self.engine.next();
            }
            if let Step::Shadowed = step {
                self.engine.next();
            }
            if let Some((key, Some(value))) = self.pending.next() {
                return Some(Ok((key, value)));
            }
        }
    }
}

impl Drop for StoreBatch<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.resolve() {
            error!(error = %e, "failed to commit open transaction on batch close");
        }
    }
}
