//! Record types stored in the wallet.

use crate::codec::{
    decode_value, CodecResult, FieldReader, FieldSpec, FieldWriter, Versioned,
};
use satchel_core::{hash, hash_concat, Hash, KeyId, PrivKey, PubKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardened derivation index marker.
pub const HARDENED: u32 = 0x8000_0000;

// =============================================================================
// HD chain
// =============================================================================

/// HD derivation state: how many external and internal child keys have been
/// handed out from the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdChain {
    pub version: i32,
    pub external_counter: u32,
    pub internal_counter: u32,
    pub seed_id: KeyId,
}

impl HdChain {
    pub const VERSION_HD_BASE: i32 = 1;
    pub const VERSION_HD_CHAIN_SPLIT: i32 = 2;

    pub fn new(seed_id: KeyId) -> Self {
        Self {
            seed_id,
            ..Self::default()
        }
    }

    pub fn is_null(&self) -> bool {
        self.seed_id.is_null()
    }

    /// Next child index on the requested chain; bumps the counter.
    pub fn next_index(&mut self, internal: bool) -> u32 {
        let counter = if internal {
            &mut self.internal_counter
        } else {
            &mut self.external_counter
        };
        let index = *counter;
        *counter = counter.saturating_add(1);
        index
    }
}

impl Default for HdChain {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            external_counter: 0,
            internal_counter: 0,
            seed_id: KeyId::NULL,
        }
    }
}

impl Versioned for HdChain {
    const CURRENT_VERSION: i32 = Self::VERSION_HD_CHAIN_SPLIT;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::always("external_counter"),
        FieldSpec::always("seed_id"),
        FieldSpec::new("internal_counter", HdChain::VERSION_HD_CHAIN_SPLIT),
    ];

    fn version(&self) -> i32 {
        self.version
    }

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> CodecResult<()> {
        w.field(&self.external_counter)?;
        w.field(&self.seed_id)?;
        w.field(&self.internal_counter)
    }

    fn read_fields(version: i32, r: &mut FieldReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            version,
            external_counter: r.field()?.unwrap_or_default(),
            seed_id: r.field()?.unwrap_or_default(),
            internal_counter: r.field()?.unwrap_or_default(),
        })
    }
}

// =============================================================================
// Key metadata
// =============================================================================

/// Where a key came from: master key fingerprint plus derivation path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyOriginInfo {
    pub fingerprint: [u8; 4],
    pub path: Vec<u32>,
}

impl KeyOriginInfo {
    pub fn is_empty(&self) -> bool {
        self.fingerprint == [0u8; 4] && self.path.is_empty()
    }
}

impl fmt::Display for KeyOriginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.fingerprint))?;
        for index in &self.path {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

/// Provenance attached to a stored key or watch-only script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub version: i32,
    /// Unix time the key was created; 0 means unknown.
    pub create_time: i64,
    /// HD key path, e.g. `m/0'/0'/5'`; `"s"` marks the seed itself.
    pub hd_keypath: String,
    pub hd_seed_id: KeyId,
    pub key_origin: KeyOriginInfo,
    /// Whether `key_origin` is trustworthy.
    pub has_key_origin: bool,
}

impl KeyMetadata {
    pub const VERSION_BASIC: i32 = 1;
    pub const VERSION_WITH_HDDATA: i32 = 10;
    pub const VERSION_WITH_KEY_ORIGIN: i32 = 12;

    pub fn new(create_time: i64) -> Self {
        Self {
            create_time,
            ..Self::default()
        }
    }
}

impl Default for KeyMetadata {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            create_time: 0,
            hd_keypath: String::new(),
            hd_seed_id: KeyId::NULL,
            key_origin: KeyOriginInfo::default(),
            has_key_origin: false,
        }
    }
}

impl Versioned for KeyMetadata {
    const CURRENT_VERSION: i32 = Self::VERSION_WITH_KEY_ORIGIN;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::always("create_time"),
        FieldSpec::new("hd_keypath", KeyMetadata::VERSION_WITH_HDDATA),
        FieldSpec::new("hd_seed_id", KeyMetadata::VERSION_WITH_HDDATA),
        FieldSpec::new("key_origin", KeyMetadata::VERSION_WITH_KEY_ORIGIN),
        FieldSpec::new("has_key_origin", KeyMetadata::VERSION_WITH_KEY_ORIGIN),
    ];

    fn version(&self) -> i32 {
        self.version
    }

    fn write_fields(&self, w: &mut FieldWriter<'_>) -> CodecResult<()> {
        w.field(&self.create_time)?;
        w.field(&self.hd_keypath)?;
        w.field(&self.hd_seed_id)?;
        w.field(&self.key_origin)?;
        w.field(&self.has_key_origin)
    }

    fn read_fields(version: i32, r: &mut FieldReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            version,
            create_time: r.field()?.unwrap_or_default(),
            hd_keypath: r.field()?.unwrap_or_default(),
            hd_seed_id: r.field()?.unwrap_or_default(),
            key_origin: r.field()?.unwrap_or_default(),
            has_key_origin: r.field()?.unwrap_or_default(),
        })
    }
}

// =============================================================================
// Key pool
// =============================================================================

/// A pre-generated key waiting to be handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPoolEntry {
    /// Client version that wrote the entry.
    pub version: i32,
    pub time: i64,
    pub pubkey: PubKey,
    /// Change (internal chain) key.
    pub internal: bool,
    /// Generated before the wallet was upgraded to split chains.
    pub pre_split: bool,
}

impl KeyPoolEntry {
    pub fn new(pubkey: PubKey, time: i64, internal: bool) -> Self {
        Self {
            version: crate::flags::CLIENT_VERSION,
            time,
            pubkey,
            internal,
            pre_split: false,
        }
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut w = FieldWriter::plain();
        w.write(&self.version)?;
        w.write(&self.time)?;
        w.write(&self.pubkey)?;
        w.write(&self.internal)?;
        w.write(&self.pre_split)?;
        Ok(w.finish())
    }

    /// Entries written before the `internal`/`pre_split` flags existed end
    /// after the pubkey.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut r = FieldReader::plain(bytes);
        Ok(Self {
            version: r.read()?,
            time: r.read()?,
            pubkey: r.read()?,
            internal: r.trailing()?.unwrap_or(false),
            pre_split: r.trailing()?.unwrap_or(false),
        })
    }
}

// =============================================================================
// Key values
// =============================================================================

/// Value of a plain private key record: the key plus a checksum binding it
/// to the public key in the record's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecordValue {
    pub privkey: PrivKey,
    pub checksum: Option<Hash>,
}

impl KeyRecordValue {
    pub fn new(pubkey: &PubKey, privkey: PrivKey) -> Self {
        let checksum = Some(Self::checksum_for(pubkey, &privkey));
        Self { privkey, checksum }
    }

    pub fn checksum_for(pubkey: &PubKey, privkey: &PrivKey) -> Hash {
        hash_concat(&[pubkey.as_bytes(), privkey.as_bytes()])
    }

    /// A record without a checksum predates checksums and is accepted.
    pub fn verify(&self, pubkey: &PubKey) -> bool {
        match self.checksum {
            Some(sum) => sum == Self::checksum_for(pubkey, &self.privkey),
            None => true,
        }
    }

    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut w = FieldWriter::plain();
        w.write(&self.privkey)?;
        if let Some(sum) = &self.checksum {
            w.write(sum)?;
        }
        Ok(w.finish())
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut r = FieldReader::plain(bytes);
        Ok(Self {
            privkey: r.read()?,
            checksum: r.trailing()?,
        })
    }
}

/// Encrypted wallet master key. The ciphertext and KDF parameters are
/// opaque to the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MasterKey {
    pub crypted_key: Vec<u8>,
    pub salt: Vec<u8>,
    pub derivation_method: u32,
    pub derive_iterations: u32,
    pub other_params: Vec<u8>,
}

// =============================================================================
// Descriptors
// =============================================================================

/// An output descriptor and the range of indices derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletDescriptor {
    pub descriptor: String,
    pub creation_time: u64,
    pub range_start: i32,
    pub range_end: i32,
    pub next_index: i32,
}

impl WalletDescriptor {
    pub fn new(descriptor: impl Into<String>, creation_time: u64) -> Self {
        Self {
            descriptor: descriptor.into(),
            creation_time,
            ..Self::default()
        }
    }

    pub fn id(&self) -> Hash {
        hash(self.descriptor.as_bytes())
    }
}

/// Serialized extended public key.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtPubKey(pub Vec<u8>);

impl fmt::Debug for ExtPubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtPubKey({})", hex::encode(&self.0))
    }
}

/// Payload of a descriptor cache key. A derived entry carries the
/// derivation index; a parent entry ends after the key expression index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorCacheKey {
    pub desc_id: Hash,
    pub key_exp_index: u32,
    pub der_index: Option<u32>,
}

impl DescriptorCacheKey {
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut w = FieldWriter::plain();
        w.write(&self.desc_id)?;
        w.write(&self.key_exp_index)?;
        if let Some(index) = self.der_index {
            w.write(&index)?;
        }
        Ok(w.finish())
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut r = FieldReader::plain(bytes);
        Ok(Self {
            desc_id: r.read()?,
            key_exp_index: r.read()?,
            der_index: r.trailing()?,
        })
    }
}

/// Cached xpubs of one descriptor, rebuilt from cache records on load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorCache {
    pub parent_xpubs: std::collections::BTreeMap<u32, ExtPubKey>,
    pub derived_xpubs: std::collections::BTreeMap<(u32, u32), ExtPubKey>,
}

impl DescriptorCache {
    pub fn insert(&mut self, key: &DescriptorCacheKey, xpub: ExtPubKey) {
        match key.der_index {
            Some(der) => {
                self.derived_xpubs.insert((key.key_exp_index, der), xpub);
            }
            None => {
                self.parent_xpubs.insert(key.key_exp_index, xpub);
            }
        }
    }
}

/// Decode an xpub cache value.
pub fn decode_xpub(bytes: &[u8]) -> CodecResult<ExtPubKey> {
    decode_value(bytes)
}
