//! Typed wallet writes on top of a [`StoreBatch`].

use crate::codec::{decode_current, decode_value, encode, encode_value, CodecError};
use crate::keys::{record_key, singleton_key, tag_prefix, tags};
use crate::records::{
    DescriptorCacheKey, ExtPubKey, HdChain, KeyMetadata, KeyPoolEntry, KeyRecordValue, MasterKey,
    WalletDescriptor,
};
use satchel_core::{
    BlockLocator, Destination, Hash, PrivKey, PubKey, Script, ScriptId, TxId, WalletTx,
};
use satchel_storage::{Database, RawRecord, StorageError, StoreBatch};
use thiserror::Error;
use tracing::debug;

/// Errors from wallet batch operations.
#[derive(Error, Debug)]
pub enum WalletDbError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, WalletDbError>;

/// Single-writer handle for reading and writing wallet records.
///
/// Every successful write or erase bumps the store's update counter, and the
/// engine is flushed whenever the counter reaches a multiple of the
/// configured flush interval. A transaction left open when the batch goes
/// out of scope is committed.
pub struct WalletBatch<'a> {
    inner: StoreBatch<'a>,
}

impl<'a> WalletBatch<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            inner: StoreBatch::new(db),
        }
    }

    pub fn database(&self) -> &'a Database {
        self.inner.database()
    }

    // =========================================================================
    // Generic record access
    // =========================================================================

    pub fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read(key)?)
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.inner.exists(key)?)
    }

    /// Every record in key order, including writes pending in the open
    /// transaction.
    pub fn records(&self) -> impl Iterator<Item = satchel_storage::Result<RawRecord>> + 'a {
        self.inner.iter()
    }

    pub fn records_with_prefix(
        &self,
        prefix: &[u8],
    ) -> impl Iterator<Item = satchel_storage::Result<RawRecord>> + 'a {
        self.inner.scan_prefix(prefix)
    }

    pub fn write(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> Result<()> {
        self.inner.write(key, value, overwrite)?;
        self.count_update()
    }

    pub fn erase(&mut self, key: &[u8]) -> Result<()> {
        self.inner.erase(key)?;
        self.count_update()
    }

    fn count_update(&self) -> Result<()> {
        let db = self.inner.database();
        let count = db.increment_update_counter();
        if db.config().should_flush(count) {
            debug!(count, "update counter reached flush interval");
            self.inner.flush()?;
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    pub fn txn_begin(&mut self) -> Result<()> {
        Ok(self.inner.txn_begin()?)
    }

    pub fn txn_commit(&mut self) -> Result<()> {
        Ok(self.inner.txn_commit()?)
    }

    pub fn txn_abort(&mut self) -> Result<()> {
        Ok(self.inner.txn_abort()?)
    }

    pub fn flush(&self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    /// Commit any open transaction and release the batch.
    pub fn close(self) -> Result<()> {
        Ok(self.inner.close()?)
    }

    /// Run `f` so that its writes land together or not at all. Inside an
    /// already open transaction `f` simply joins it.
    pub fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.in_transaction() {
            return f(self);
        }
        self.txn_begin()?;
        match f(self) {
            Ok(value) => {
                self.txn_commit()?;
                Ok(value)
            }
            Err(e) => {
                self.txn_abort()?;
                Err(e)
            }
        }
    }

    // =========================================================================
    // Address book
    // =========================================================================

    pub fn write_name(&mut self, dest: &Destination, name: &str) -> Result<()> {
        let key = record_key(tags::NAME, dest)?;
        self.write(&key, &encode_value(name)?, true)
    }

    pub fn erase_name(&mut self, dest: &Destination) -> Result<()> {
        self.erase(&record_key(tags::NAME, dest)?)
    }

    pub fn write_purpose(&mut self, dest: &Destination, purpose: &str) -> Result<()> {
        let key = record_key(tags::PURPOSE, dest)?;
        self.write(&key, &encode_value(purpose)?, true)
    }

    pub fn erase_purpose(&mut self, dest: &Destination) -> Result<()> {
        self.erase(&record_key(tags::PURPOSE, dest)?)
    }

    pub fn write_dest_data(&mut self, dest: &Destination, key: &str, value: &str) -> Result<()> {
        let record = record_key(tags::DESTDATA, &(dest, key))?;
        self.write(&record, &encode_value(value)?, true)
    }

    pub fn erase_dest_data(&mut self, dest: &Destination, key: &str) -> Result<()> {
        self.erase(&record_key(tags::DESTDATA, &(dest, key))?)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn write_tx(&mut self, wtx: &WalletTx) -> Result<()> {
        let key = record_key(tags::TX, &wtx.id())?;
        self.write(&key, &encode_value(wtx)?, true)
    }

    pub fn erase_tx(&mut self, txid: &TxId) -> Result<()> {
        self.erase(&record_key(tags::TX, txid)?)
    }

    pub fn write_order_pos_next(&mut self, pos: i64) -> Result<()> {
        self.write(&singleton_key(tags::ORDERPOSNEXT)?, &encode_value(&pos)?, true)
    }

    // =========================================================================
    // Keys
    // =========================================================================

    pub fn write_key_metadata(
        &mut self,
        meta: &KeyMetadata,
        pubkey: &PubKey,
        overwrite: bool,
    ) -> Result<()> {
        let key = record_key(tags::KEYMETA, pubkey)?;
        self.write(&key, &encode(meta)?, overwrite)
    }

    /// Store a plain private key with its metadata. Fails without writing
    /// anything if the key is already present.
    pub fn write_key(&mut self, pubkey: &PubKey, privkey: &PrivKey, meta: &KeyMetadata) -> Result<()> {
        let value = KeyRecordValue::new(pubkey, privkey.clone()).encode()?;
        let key = record_key(tags::KEY, pubkey)?;
        self.atomically(|batch| {
            batch.write_key_metadata(meta, pubkey, true)?;
            batch.write(&key, &value, false)
        })
    }

    /// Store an encrypted key with its metadata and drop the plain copy.
    /// Rewriting an identical encrypted key is accepted.
    pub fn write_crypted_key(
        &mut self,
        pubkey: &PubKey,
        secret: &[u8],
        meta: &KeyMetadata,
    ) -> Result<()> {
        let value = encode_value(secret)?;
        let key = record_key(tags::CRYPTED_KEY, pubkey)?;
        let plain = record_key(tags::KEY, pubkey)?;
        self.atomically(|batch| {
            batch.write_key_metadata(meta, pubkey, true)?;
            if batch.read(&key)?.as_deref() != Some(value.as_slice()) {
                batch.write(&key, &value, false)?;
            }
            batch.erase(&plain)
        })
    }

    pub fn write_master_key(&mut self, id: u32, master: &MasterKey) -> Result<()> {
        let key = record_key(tags::MASTER_KEY, &id)?;
        self.write(&key, &encode_value(master)?, true)
    }

    pub fn write_cscript(&mut self, script: &Script) -> Result<()> {
        let key = record_key(tags::CSCRIPT, &script.id())?;
        self.write(&key, &encode_value(script)?, false)
    }

    pub fn erase_cscript(&mut self, id: &ScriptId) -> Result<()> {
        self.erase(&record_key(tags::CSCRIPT, id)?)
    }

    pub fn write_watch_only(&mut self, script: &Script, meta: &KeyMetadata) -> Result<()> {
        let meta_key = record_key(tags::WATCHMETA, script)?;
        let key = record_key(tags::WATCHS, script)?;
        self.atomically(|batch| {
            batch.write(&meta_key, &encode(meta)?, true)?;
            batch.write(&key, &encode_value(&1u8)?, true)
        })
    }

    pub fn erase_watch_only(&mut self, script: &Script) -> Result<()> {
        let meta_key = record_key(tags::WATCHMETA, script)?;
        let key = record_key(tags::WATCHS, script)?;
        self.atomically(|batch| {
            batch.erase(&meta_key)?;
            batch.erase(&key)
        })
    }

    // =========================================================================
    // Key pool
    // =========================================================================

    pub fn read_pool(&self, index: i64) -> Result<Option<KeyPoolEntry>> {
        match self.read(&record_key(tags::POOL, &index)?)? {
            Some(bytes) => Ok(Some(KeyPoolEntry::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn write_pool(&mut self, index: i64, entry: &KeyPoolEntry) -> Result<()> {
        let key = record_key(tags::POOL, &index)?;
        self.write(&key, &entry.encode()?, true)
    }

    pub fn erase_pool(&mut self, index: i64) -> Result<()> {
        self.erase(&record_key(tags::POOL, &index)?)
    }

    // =========================================================================
    // Chain position and wallet-wide settings
    // =========================================================================

    /// Store the best block. The legacy record is kept but written empty so
    /// older readers rescan instead of trusting a stale locator.
    pub fn write_best_block(&mut self, locator: &BlockLocator) -> Result<()> {
        let legacy = singleton_key(tags::BESTBLOCK)?;
        let current = singleton_key(tags::BESTBLOCK_NOMERKLE)?;
        self.atomically(|batch| {
            batch.write(&legacy, &encode_value(&BlockLocator::default())?, true)?;
            batch.write(&current, &encode_value(locator)?, true)
        })
    }

    /// Read the best block, preferring a non-empty legacy record.
    pub fn read_best_block(&self) -> Result<Option<BlockLocator>> {
        if let Some(bytes) = self.read(&singleton_key(tags::BESTBLOCK)?)? {
            let locator: BlockLocator = decode_value(&bytes)?;
            if !locator.is_null() {
                return Ok(Some(locator));
            }
        }
        match self.read(&singleton_key(tags::BESTBLOCK_NOMERKLE)?)? {
            Some(bytes) => Ok(Some(decode_value(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn write_min_version(&mut self, version: i32) -> Result<()> {
        self.write(&singleton_key(tags::MINVERSION)?, &encode_value(&version)?, true)
    }

    /// Record the client version that last wrote the wallet.
    pub fn write_version(&mut self, version: i32) -> Result<()> {
        self.write(&singleton_key(tags::VERSION)?, &encode_value(&version)?, true)
    }

    pub fn write_hd_chain(&mut self, chain: &HdChain) -> Result<()> {
        self.write(&singleton_key(tags::HDCHAIN)?, &encode(chain)?, true)
    }

    pub fn read_hd_chain(&self) -> Result<Option<HdChain>> {
        match self.read(&singleton_key(tags::HDCHAIN)?)? {
            Some(bytes) => Ok(Some(decode_current(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn write_wallet_flags(&mut self, flags: u64) -> Result<()> {
        self.write(&singleton_key(tags::FLAGS)?, &encode_value(&flags)?, true)
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    pub fn write_descriptor(&mut self, desc_id: &Hash, descriptor: &WalletDescriptor) -> Result<()> {
        let key = record_key(tags::WALLETDESCRIPTOR, desc_id)?;
        self.write(&key, &encode_value(descriptor)?, true)
    }

    pub fn write_descriptor_key(
        &mut self,
        desc_id: &Hash,
        pubkey: &PubKey,
        privkey: &PrivKey,
    ) -> Result<()> {
        let key = record_key(tags::WALLETDESCRIPTORKEY, &(desc_id, pubkey))?;
        let value = KeyRecordValue::new(pubkey, privkey.clone()).encode()?;
        self.write(&key, &value, false)
    }

    /// Store an encrypted descriptor key and drop the plain copy.
    pub fn write_crypted_descriptor_key(
        &mut self,
        desc_id: &Hash,
        pubkey: &PubKey,
        secret: &[u8],
    ) -> Result<()> {
        let key = record_key(tags::WALLETDESCRIPTORCKEY, &(desc_id, pubkey))?;
        let plain = record_key(tags::WALLETDESCRIPTORKEY, &(desc_id, pubkey))?;
        let value = encode_value(secret)?;
        self.atomically(|batch| {
            batch.write(&key, &value, false)?;
            batch.erase(&plain)
        })
    }

    pub fn write_descriptor_parent_cache(
        &mut self,
        xpub: &ExtPubKey,
        desc_id: &Hash,
        key_exp_index: u32,
    ) -> Result<()> {
        let cache_key = DescriptorCacheKey {
            desc_id: *desc_id,
            key_exp_index,
            der_index: None,
        };
        self.write_descriptor_cache(&cache_key, xpub)
    }

    pub fn write_descriptor_derived_cache(
        &mut self,
        xpub: &ExtPubKey,
        desc_id: &Hash,
        key_exp_index: u32,
        der_index: u32,
    ) -> Result<()> {
        let cache_key = DescriptorCacheKey {
            desc_id: *desc_id,
            key_exp_index,
            der_index: Some(der_index),
        };
        self.write_descriptor_cache(&cache_key, xpub)
    }

    fn write_descriptor_cache(&mut self, cache_key: &DescriptorCacheKey, xpub: &ExtPubKey) -> Result<()> {
        let mut key = tag_prefix(tags::WALLETDESCRIPTORCACHE)?;
        key.extend_from_slice(&cache_key.encode()?);
        self.write(&key, &encode_value(xpub)?, true)
    }

    /// Mark `desc_id` as the active descriptor for an output type.
    pub fn write_active_script_pubkey_man(
        &mut self,
        output_type: u8,
        desc_id: &Hash,
        internal: bool,
    ) -> Result<()> {
        let tag = if internal {
            tags::ACTIVEINTERNALSPK
        } else {
            tags::ACTIVEEXTERNALSPK
        };
        let key = record_key(tag, &output_type)?;
        self.write(&key, &encode_value(desc_id)?, true)
    }
}
