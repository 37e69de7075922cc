//! Full-store scan into a [`LoadTarget`] with failure classification.

use crate::batch::WalletBatch;
use crate::codec::{decode_current, decode_value, CodecError};
use crate::flags::{CLIENT_VERSION, FEATURE_LATEST, REWRITE_CLIENT_VERSIONS};
use crate::keys::{is_key_type, split_key, tag_prefix, tags};
use crate::records::{
    decode_xpub, DescriptorCache, DescriptorCacheKey, HdChain, KeyMetadata, KeyPoolEntry,
    KeyRecordValue, MasterKey, WalletDescriptor,
};
use crate::state::{LoadTarget, Rejected};
use crate::status::DbStatus;
use satchel_core::{BlockLocator, Destination, Hash, PubKey, Script, ScriptId, TxId, WalletTx};
use satchel_storage::{Database, DatabaseConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single record could not be taken.
#[derive(Debug, Error)]
enum RecordError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Rejected(#[from] Rejected),

    #[error("{0}")]
    TooNew(String),
}

/// Counters collected while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub records: usize,
    pub keys: usize,
    pub crypted_keys: usize,
    pub master_keys: usize,
    pub key_meta: usize,
    pub watch_keys: usize,
    pub transactions: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl LoadStats {
    pub fn is_encrypted(&self) -> bool {
        self.crypted_keys > 0 || self.master_keys > 0
    }
}

/// State carried across records of one scan.
#[derive(Default)]
struct ScanState {
    stats: LoadStats,
    last_client_version: i32,
    caches: BTreeMap<Hash, DescriptorCache>,
    best_legacy: Option<BlockLocator>,
    best_current: Option<BlockLocator>,
}

impl<'a> WalletBatch<'a> {
    /// Load every record into `target` and classify the outcome.
    ///
    /// A record that fails to decode or is refused by the target never stops
    /// the scan; it only raises the reported severity. The result is the
    /// worst classification seen.
    pub fn load_wallet<T: LoadTarget>(&mut self, target: &mut T) -> DbStatus {
        self.load_wallet_with_stats(target).0
    }

    pub fn load_wallet_with_stats<T: LoadTarget>(&mut self, target: &mut T) -> (DbStatus, LoadStats) {
        let mut status = DbStatus::LoadOk;
        let mut scan = ScanState::default();

        for item in self.records() {
            let (key, value) = match item {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "store cursor failed, remaining records unreachable");
                    status = status.worst(DbStatus::Corrupt);
                    break;
                }
            };
            scan.stats.records += 1;

            let (tag, payload) = match split_key(&key) {
                Ok(parts) => parts,
                Err(_) => {
                    scan.stats.unknown += 1;
                    debug!(key = %hex::encode(&key), "skipping record with unreadable key");
                    continue;
                }
            };

            match read_record(&tag, payload, &value, target, &mut scan) {
                Ok(true) => {}
                Ok(false) => scan.stats.unknown += 1,
                Err(e) => {
                    scan.stats.failed += 1;
                    let severity = classify(&tag, &e);
                    warn!(tag = %tag, error = %e, status = %severity, "failed to load record");
                    status = status.worst(severity);
                }
            }
            if status.is_fatal() {
                break;
            }
        }

        for (desc_id, cache) in std::mem::take(&mut scan.caches) {
            target.load_descriptor_cache(desc_id, cache);
        }
        let best = match scan.best_legacy.take() {
            Some(locator) if !locator.is_null() => Some(locator),
            _ => scan.best_current.take(),
        };
        if let Some(locator) = best {
            target.set_best_block(locator);
        }

        if status.is_ok()
            && scan.stats.is_encrypted()
            && REWRITE_CLIENT_VERSIONS.contains(&scan.last_client_version)
        {
            status = DbStatus::NeedRewrite;
        }

        if status.is_ok() && scan.last_client_version < CLIENT_VERSION {
            if let Err(e) = self.write_version(CLIENT_VERSION) {
                warn!(error = %e, "failed to record client version");
                status = DbStatus::LoadFail;
            }
        }

        let stats = scan.stats;
        info!(
            records = stats.records,
            keys = stats.keys,
            crypted_keys = stats.crypted_keys,
            key_meta = stats.key_meta,
            watch_keys = stats.watch_keys,
            transactions = stats.transactions,
            unknown = stats.unknown,
            failed = stats.failed,
            status = %status,
            "wallet load finished"
        );
        (status, stats)
    }

    /// List stored transaction ids and the bodies that decode.
    pub fn find_wallet_transactions(&self) -> Result<(Vec<TxId>, Vec<WalletTx>), DbStatus> {
        let prefix = tag_prefix(tags::TX).map_err(|_| DbStatus::Corrupt)?;
        let mut ids = Vec::new();
        let mut bodies = Vec::new();

        for item in self.records_with_prefix(&prefix) {
            let (key, value) = item.map_err(|e| {
                warn!(error = %e, "transaction scan failed");
                DbStatus::Corrupt
            })?;
            let txid: TxId = match decode_value(&key[prefix.len()..]) {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "skipping transaction record with unreadable id");
                    continue;
                }
            };
            ids.push(txid);
            match decode_value::<WalletTx>(&value) {
                Ok(wtx) => bodies.push(wtx),
                Err(e) => warn!(txid = %txid, error = %e, "transaction body does not decode"),
            }
        }
        Ok((ids, bodies))
    }

    /// Erase every stored transaction. Returns the bodies that decoded.
    pub fn zap_wallet_transactions(&mut self) -> Result<Vec<WalletTx>, DbStatus> {
        let (ids, bodies) = self.find_wallet_transactions()?;
        for txid in &ids {
            self.erase_tx(txid).map_err(|e| {
                warn!(txid = %txid, error = %e, "failed to erase transaction");
                DbStatus::Corrupt
            })?;
        }
        info!(erased = ids.len(), "zapped wallet transactions");
        Ok(bodies)
    }

    /// Erase the requested transactions. Every distinct requested id ends up
    /// in exactly one of the returned lists: erased, or not stored.
    pub fn zap_selected_transactions(
        &mut self,
        requested: &[TxId],
    ) -> Result<(Vec<TxId>, Vec<TxId>), DbStatus> {
        let (stored, _) = self.find_wallet_transactions()?;
        let stored: BTreeSet<TxId> = stored.into_iter().collect();
        let requested: BTreeSet<TxId> = requested.iter().copied().collect();

        let mut removed = Vec::new();
        let mut not_found = Vec::new();
        for txid in requested {
            if !stored.contains(&txid) {
                not_found.push(txid);
                continue;
            }
            self.erase_tx(&txid).map_err(|e| {
                warn!(txid = %txid, error = %e, "failed to erase transaction");
                DbStatus::Corrupt
            })?;
            removed.push(txid);
        }
        info!(removed = removed.len(), not_found = not_found.len(), "zapped selected transactions");
        Ok((removed, not_found))
    }
}

/// Open the store at `path` and load it. `LoadFail` with no database when
/// the store cannot be opened.
pub fn open_and_load<T: LoadTarget>(
    path: &Path,
    config: DatabaseConfig,
    target: &mut T,
) -> (Option<Database>, DbStatus) {
    let db = match Database::open_with_config(path, config) {
        Ok(db) => db,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open wallet store");
            return (None, DbStatus::LoadFail);
        }
    };
    let status = WalletBatch::new(&db).load_wallet(target);
    (Some(db), status)
}

fn classify(tag: &str, error: &RecordError) -> DbStatus {
    match error {
        RecordError::Codec(CodecError::TooNew { .. }) | RecordError::TooNew(_) => DbStatus::TooNew,
        _ if is_key_type(tag) || tag == tags::HDCHAIN => DbStatus::Corrupt,
        _ => DbStatus::NoncriticalError,
    }
}

/// Decode one record and hand it to `target`. `Ok(false)` for tags this
/// build does not know.
fn read_record<T: LoadTarget>(
    tag: &str,
    payload: &[u8],
    value: &[u8],
    target: &mut T,
    scan: &mut ScanState,
) -> std::result::Result<bool, RecordError> {
    match tag {
        tags::KEY => {
            let pubkey: PubKey = decode_value(payload)?;
            let record = KeyRecordValue::decode(value)?;
            if !record.verify(&pubkey) {
                return Err(Rejected(format!("checksum mismatch for key {}", pubkey.to_hex())).into());
            }
            target.load_key(pubkey, record.privkey)?;
            scan.stats.keys += 1;
        }
        tags::CRYPTED_KEY => {
            let pubkey: PubKey = decode_value(payload)?;
            let secret: Vec<u8> = decode_value(value)?;
            target.load_crypted_key(pubkey, secret)?;
            scan.stats.crypted_keys += 1;
        }
        tags::MASTER_KEY => {
            let id: u32 = decode_value(payload)?;
            let master: MasterKey = decode_value(value)?;
            target.load_master_key(id, master)?;
            scan.stats.master_keys += 1;
        }
        tags::KEYMETA => {
            let pubkey: PubKey = decode_value(payload)?;
            let meta: KeyMetadata = decode_current(value)?;
            target.load_key_metadata(pubkey.id(), meta);
            scan.stats.key_meta += 1;
        }
        tags::WATCHMETA => {
            let script: Script = decode_value(payload)?;
            let meta: KeyMetadata = decode_current(value)?;
            target.load_script_metadata(script.id(), meta);
            scan.stats.key_meta += 1;
        }
        tags::WATCHS => {
            let script: Script = decode_value(payload)?;
            let marker: u8 = decode_value(value)?;
            if marker == 1 {
                target.load_watch_only(script)?;
                scan.stats.watch_keys += 1;
            }
        }
        tags::CSCRIPT => {
            let id: ScriptId = decode_value(payload)?;
            let script: Script = decode_value(value)?;
            if script.id() != id {
                return Err(Rejected(format!("script does not hash to {}", id)).into());
            }
            target.load_cscript(script)?;
        }
        tags::NAME => {
            let dest: Destination = decode_value(payload)?;
            target.set_name(dest, decode_value(value)?);
        }
        tags::PURPOSE => {
            let dest: Destination = decode_value(payload)?;
            target.set_purpose(dest, decode_value(value)?);
        }
        tags::DESTDATA => {
            let (dest, key): (Destination, String) = decode_value(payload)?;
            target.load_dest_data(dest, key, decode_value(value)?);
        }
        tags::TX => {
            let txid: TxId = decode_value(payload)?;
            let wtx: WalletTx = decode_value(value)?;
            if wtx.id() != txid {
                return Err(Rejected(format!("transaction body does not hash to {}", txid)).into());
            }
            target.load_tx(wtx);
            scan.stats.transactions += 1;
        }
        tags::POOL => {
            let index: i64 = decode_value(payload)?;
            target.load_key_pool(index, KeyPoolEntry::decode(value)?);
        }
        tags::BESTBLOCK => scan.best_legacy = Some(decode_value(value)?),
        tags::BESTBLOCK_NOMERKLE => scan.best_current = Some(decode_value(value)?),
        tags::ORDERPOSNEXT => target.set_order_pos_next(decode_value(value)?),
        tags::MINVERSION => {
            let version: i32 = decode_value(value)?;
            if version > FEATURE_LATEST {
                return Err(RecordError::TooNew(format!(
                    "wallet requires version {}, this build supports {}",
                    version, FEATURE_LATEST
                )));
            }
            target.set_min_version(version);
        }
        tags::VERSION => {
            let version: i32 = decode_value(value)?;
            scan.last_client_version = version;
            target.set_last_client_version(version);
        }
        tags::HDCHAIN => {
            let chain: HdChain = decode_current(value)?;
            target.set_hd_chain(chain);
        }
        tags::FLAGS => {
            let flags: u64 = decode_value(value)?;
            target
                .load_wallet_flags(flags)
                .map_err(|e| RecordError::TooNew(e.0))?;
        }
        tags::WALLETDESCRIPTOR => {
            let desc_id: Hash = decode_value(payload)?;
            let descriptor: WalletDescriptor = decode_value(value)?;
            if descriptor.id() != desc_id {
                return Err(Rejected(format!("descriptor does not hash to {}", desc_id)).into());
            }
            target.load_descriptor(desc_id, descriptor);
        }
        tags::WALLETDESCRIPTORKEY => {
            let (desc_id, pubkey): (Hash, PubKey) = decode_value(payload)?;
            let record = KeyRecordValue::decode(value)?;
            if !record.verify(&pubkey) {
                return Err(Rejected(format!("checksum mismatch for key {}", pubkey.to_hex())).into());
            }
            target.load_descriptor_key(desc_id, pubkey, record.privkey)?;
            scan.stats.keys += 1;
        }
        tags::WALLETDESCRIPTORCKEY => {
            let (desc_id, pubkey): (Hash, PubKey) = decode_value(payload)?;
            let secret: Vec<u8> = decode_value(value)?;
            target.load_descriptor_crypted_key(desc_id, pubkey, secret)?;
            scan.stats.crypted_keys += 1;
        }
        tags::WALLETDESCRIPTORCACHE => {
            let cache_key = DescriptorCacheKey::decode(payload)?;
            let xpub = decode_xpub(value)?;
            scan.caches
                .entry(cache_key.desc_id)
                .or_default()
                .insert(&cache_key, xpub);
        }
        tags::ACTIVEEXTERNALSPK | tags::ACTIVEINTERNALSPK => {
            let output_type: u8 = decode_value(payload)?;
            let desc_id: Hash = decode_value(value)?;
            target.set_active_script_pubkey_man(output_type, tag == tags::ACTIVEINTERNALSPK, desc_id);
        }
        _ => return Ok(false),
    }
    Ok(true)
}
