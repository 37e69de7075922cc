//! In-memory wallet state populated by a load.

use crate::flags::has_unknown_mandatory_flags;
use crate::records::{DescriptorCache, HdChain, KeyMetadata, KeyPoolEntry, MasterKey, WalletDescriptor};
use satchel_core::{
    BlockLocator, Destination, Hash, KeyId, PrivKey, PubKey, Script, ScriptId, TxId, WalletTx,
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A decoded record the receiving wallet refused to take.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("record rejected: {0}")]
pub struct Rejected(pub String);

/// Receiver of decoded records during [`WalletBatch::load_wallet`].
///
/// Methods returning `Result` may refuse a record; the refusal is classified
/// the same way as a decode failure of that record.
///
/// [`WalletBatch::load_wallet`]: crate::WalletBatch::load_wallet
pub trait LoadTarget {
    fn load_key(&mut self, pubkey: PubKey, privkey: PrivKey) -> Result<(), Rejected>;
    fn load_crypted_key(&mut self, pubkey: PubKey, secret: Vec<u8>) -> Result<(), Rejected>;
    fn load_master_key(&mut self, id: u32, key: MasterKey) -> Result<(), Rejected>;
    fn load_cscript(&mut self, script: Script) -> Result<(), Rejected>;
    fn load_watch_only(&mut self, script: Script) -> Result<(), Rejected>;
    fn load_wallet_flags(&mut self, flags: u64) -> Result<(), Rejected>;
    fn load_descriptor_key(
        &mut self,
        desc_id: Hash,
        pubkey: PubKey,
        privkey: PrivKey,
    ) -> Result<(), Rejected>;
    fn load_descriptor_crypted_key(
        &mut self,
        desc_id: Hash,
        pubkey: PubKey,
        secret: Vec<u8>,
    ) -> Result<(), Rejected>;

    fn load_key_metadata(&mut self, id: KeyId, meta: KeyMetadata);
    fn load_script_metadata(&mut self, id: ScriptId, meta: KeyMetadata);
    fn set_name(&mut self, dest: Destination, name: String);
    fn set_purpose(&mut self, dest: Destination, purpose: String);
    fn load_dest_data(&mut self, dest: Destination, key: String, value: String);
    fn load_tx(&mut self, wtx: WalletTx);
    fn load_key_pool(&mut self, index: i64, entry: KeyPoolEntry);
    fn set_best_block(&mut self, locator: BlockLocator);
    fn set_order_pos_next(&mut self, pos: i64);
    fn set_min_version(&mut self, version: i32);
    fn set_last_client_version(&mut self, version: i32);
    fn set_hd_chain(&mut self, chain: HdChain);
    fn load_descriptor(&mut self, desc_id: Hash, descriptor: WalletDescriptor);
    fn load_descriptor_cache(&mut self, desc_id: Hash, cache: DescriptorCache);
    fn set_active_script_pubkey_man(&mut self, output_type: u8, internal: bool, desc_id: Hash);
}

/// Label data attached to a destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressBookEntry {
    pub name: Option<String>,
    pub purpose: Option<String>,
    pub dest_data: BTreeMap<String, String>,
}

/// Keys of one descriptor.
#[derive(Debug, Clone, Default)]
pub struct DescriptorState {
    pub descriptor: WalletDescriptor,
    pub keys: BTreeMap<KeyId, PrivKey>,
    pub crypted_keys: BTreeMap<KeyId, (PubKey, Vec<u8>)>,
    pub cache: DescriptorCache,
}

/// Plain wallet state built from the store.
#[derive(Debug, Default)]
pub struct WalletState {
    pub keys: BTreeMap<KeyId, (PubKey, PrivKey)>,
    pub crypted_keys: BTreeMap<KeyId, (PubKey, Vec<u8>)>,
    pub master_keys: BTreeMap<u32, MasterKey>,
    pub scripts: BTreeMap<ScriptId, Script>,
    pub watch_only: BTreeSet<Script>,
    pub key_metadata: BTreeMap<KeyId, KeyMetadata>,
    pub script_metadata: BTreeMap<ScriptId, KeyMetadata>,
    pub address_book: BTreeMap<Destination, AddressBookEntry>,
    pub transactions: BTreeMap<TxId, WalletTx>,
    pub key_pool: BTreeMap<i64, KeyPoolEntry>,
    pub best_block: Option<BlockLocator>,
    pub order_pos_next: i64,
    pub min_version: i32,
    pub last_client_version: i32,
    pub hd_chain: Option<HdChain>,
    pub flags: u64,
    pub descriptors: BTreeMap<Hash, DescriptorState>,
    pub active_external: BTreeMap<u8, Hash>,
    pub active_internal: BTreeMap<u8, Hash>,
}

impl WalletState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_crypted(&self) -> bool {
        !self.master_keys.is_empty() || !self.crypted_keys.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
            + self.crypted_keys.len()
            + self
                .descriptors
                .values()
                .map(|d| d.keys.len() + d.crypted_keys.len())
                .sum::<usize>()
    }

    fn entry(&mut self, dest: Destination) -> &mut AddressBookEntry {
        self.address_book.entry(dest).or_default()
    }

    fn descriptor(&mut self, desc_id: Hash) -> &mut DescriptorState {
        self.descriptors.entry(desc_id).or_default()
    }
}

impl LoadTarget for WalletState {
    fn load_key(&mut self, pubkey: PubKey, privkey: PrivKey) -> Result<(), Rejected> {
        if !pubkey.is_valid() {
            return Err(Rejected(format!("invalid public key {}", pubkey.to_hex())));
        }
        if privkey.is_empty() {
            return Err(Rejected("empty private key".into()));
        }
        self.keys.insert(pubkey.id(), (pubkey, privkey));
        Ok(())
    }

    fn load_crypted_key(&mut self, pubkey: PubKey, secret: Vec<u8>) -> Result<(), Rejected> {
        // A wallet is either fully plain or fully encrypted
        if !self.keys.is_empty() {
            return Err(Rejected("encrypted key in a wallet with plain keys".into()));
        }
        if !pubkey.is_valid() {
            return Err(Rejected(format!("invalid public key {}", pubkey.to_hex())));
        }
        self.crypted_keys.insert(pubkey.id(), (pubkey, secret));
        Ok(())
    }

    fn load_master_key(&mut self, id: u32, key: MasterKey) -> Result<(), Rejected> {
        if self.master_keys.contains_key(&id) {
            return Err(Rejected(format!("duplicate master key id {}", id)));
        }
        self.master_keys.insert(id, key);
        Ok(())
    }

    fn load_cscript(&mut self, script: Script) -> Result<(), Rejected> {
        if script.is_empty() {
            return Err(Rejected("empty script".into()));
        }
        self.scripts.insert(script.id(), script);
        Ok(())
    }

    fn load_watch_only(&mut self, script: Script) -> Result<(), Rejected> {
        if script.is_empty() {
            return Err(Rejected("empty watch-only script".into()));
        }
        self.watch_only.insert(script);
        Ok(())
    }

    fn load_wallet_flags(&mut self, flags: u64) -> Result<(), Rejected> {
        if has_unknown_mandatory_flags(flags) {
            return Err(Rejected(format!("unknown wallet flags {:#x}", flags)));
        }
        self.flags = flags;
        Ok(())
    }

    fn load_descriptor_key(
        &mut self,
        desc_id: Hash,
        pubkey: PubKey,
        privkey: PrivKey,
    ) -> Result<(), Rejected> {
        if privkey.is_empty() {
            return Err(Rejected("empty descriptor private key".into()));
        }
        self.descriptor(desc_id).keys.insert(pubkey.id(), privkey);
        Ok(())
    }

    fn load_descriptor_crypted_key(
        &mut self,
        desc_id: Hash,
        pubkey: PubKey,
        secret: Vec<u8>,
    ) -> Result<(), Rejected> {
        let state = self.descriptor(desc_id);
        if !state.keys.is_empty() {
            return Err(Rejected("encrypted key in a descriptor with plain keys".into()));
        }
        state.crypted_keys.insert(pubkey.id(), (pubkey, secret));
        Ok(())
    }

    fn load_key_metadata(&mut self, id: KeyId, meta: KeyMetadata) {
        self.key_metadata.insert(id, meta);
    }

    fn load_script_metadata(&mut self, id: ScriptId, meta: KeyMetadata) {
        self.script_metadata.insert(id, meta);
    }

    fn set_name(&mut self, dest: Destination, name: String) {
        self.entry(dest).name = Some(name);
    }

    fn set_purpose(&mut self, dest: Destination, purpose: String) {
        self.entry(dest).purpose = Some(purpose);
    }

    fn load_dest_data(&mut self, dest: Destination, key: String, value: String) {
        self.entry(dest).dest_data.insert(key, value);
    }

    fn load_tx(&mut self, wtx: WalletTx) {
        self.transactions.insert(wtx.id(), wtx);
    }

    fn load_key_pool(&mut self, index: i64, entry: KeyPoolEntry) {
        self.key_pool.insert(index, entry);
    }

    fn set_best_block(&mut self, locator: BlockLocator) {
        self.best_block = Some(locator);
    }

    fn set_order_pos_next(&mut self, pos: i64) {
        self.order_pos_next = pos;
    }

    fn set_min_version(&mut self, version: i32) {
        self.min_version = version;
    }

    fn set_last_client_version(&mut self, version: i32) {
        self.last_client_version = version;
    }

    fn set_hd_chain(&mut self, chain: HdChain) {
        self.hd_chain = Some(chain);
    }

    fn load_descriptor(&mut self, desc_id: Hash, descriptor: WalletDescriptor) {
        self.descriptor(desc_id).descriptor = descriptor;
    }

    fn load_descriptor_cache(&mut self, desc_id: Hash, cache: DescriptorCache) {
        self.descriptor(desc_id).cache = cache;
    }

    fn set_active_script_pubkey_man(&mut self, output_type: u8, internal: bool, desc_id: Hash) {
        if internal {
            self.active_internal.insert(output_type, desc_id);
        } else {
            self.active_external.insert(output_type, desc_id);
        }
    }
}
