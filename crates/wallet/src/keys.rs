//! Record keyspace.
//!
//! Every record key is `bincode(tag) ‖ bincode(payload)`. The encoded tag is
//! therefore a byte prefix shared by every record of its category, and can
//! be read back from a raw key without knowing the payload layout.

use crate::codec::{encode_value, CodecResult, FieldReader, FieldWriter};
use serde::Serialize;

/// Type tags.
pub mod tags {
    pub const ACTIVEEXTERNALSPK: &str = "activeexternalspk";
    pub const ACTIVEINTERNALSPK: &str = "activeinternalspk";
    pub const BESTBLOCK: &str = "bestblock";
    pub const BESTBLOCK_NOMERKLE: &str = "bestblock_nomerkle";
    pub const CRYPTED_KEY: &str = "ckey";
    pub const CSCRIPT: &str = "cscript";
    pub const DESTDATA: &str = "destdata";
    pub const FLAGS: &str = "flags";
    pub const HDCHAIN: &str = "hdchain";
    pub const KEY: &str = "key";
    pub const KEYMETA: &str = "keymeta";
    pub const MASTER_KEY: &str = "mkey";
    pub const MINVERSION: &str = "minversion";
    pub const NAME: &str = "name";
    pub const ORDERPOSNEXT: &str = "orderposnext";
    pub const POOL: &str = "pool";
    pub const PURPOSE: &str = "purpose";
    pub const TX: &str = "tx";
    pub const VERSION: &str = "version";
    pub const WALLETDESCRIPTOR: &str = "walletdescriptor";
    pub const WALLETDESCRIPTORCACHE: &str = "walletdescriptorcache";
    pub const WALLETDESCRIPTORCKEY: &str = "walletdescriptorckey";
    pub const WALLETDESCRIPTORKEY: &str = "walletdescriptorkey";
    pub const WATCHMETA: &str = "watchmeta";
    pub const WATCHS: &str = "watchs";
}

/// Whether records under `tag` hold private key material.
pub fn is_key_type(tag: &str) -> bool {
    matches!(
        tag,
        tags::KEY
            | tags::CRYPTED_KEY
            | tags::MASTER_KEY
            | tags::WALLETDESCRIPTORKEY
            | tags::WALLETDESCRIPTORCKEY
    )
}

/// Key for a record that exists at most once (best block, flags, ...).
pub fn singleton_key(tag: &str) -> CodecResult<Vec<u8>> {
    encode_value(tag)
}

/// Byte prefix shared by every record under `tag`.
pub fn tag_prefix(tag: &str) -> CodecResult<Vec<u8>> {
    singleton_key(tag)
}

/// Key for a record identified by `payload` within its category.
pub fn record_key<P: Serialize + ?Sized>(tag: &str, payload: &P) -> CodecResult<Vec<u8>> {
    let mut w = FieldWriter::plain();
    w.write(tag)?;
    w.write(payload)?;
    Ok(w.finish())
}

/// Split a raw key into its tag and the undecoded payload bytes.
pub fn split_key(key: &[u8]) -> CodecResult<(String, &[u8])> {
    let mut r = FieldReader::plain(key);
    let tag: String = r.read()?;
    Ok((tag, r.remaining()))
}

/// The tag of a raw key, if it has a readable one.
pub fn parse_tag(key: &[u8]) -> Option<String> {
    split_key(key).ok().map(|(tag, _)| tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_value;

    #[test]
    fn test_key_types() {
        for tag in [
            tags::KEY,
            tags::CRYPTED_KEY,
            tags::MASTER_KEY,
            tags::WALLETDESCRIPTORKEY,
            tags::WALLETDESCRIPTORCKEY,
        ] {
            assert!(is_key_type(tag), "{}", tag);
        }
        for tag in [
            tags::KEYMETA,
            tags::TX,
            tags::HDCHAIN,
            tags::POOL,
            tags::WATCHS,
            tags::WALLETDESCRIPTOR,
            "",
            "bogus",
        ] {
            assert!(!is_key_type(tag), "{}", tag);
        }
    }

    #[test]
    fn test_split_key() {
        let key = record_key(tags::POOL, &42i64).unwrap();
        let (tag, payload) = split_key(&key).unwrap();
        assert_eq!(tag, tags::POOL);
        assert_eq!(decode_value::<i64>(payload).unwrap(), 42);
    }

    #[test]
    fn test_prefix_does_not_collide() {
        let key_prefix = tag_prefix(tags::KEY).unwrap();
        let meta = record_key(tags::KEYMETA, &vec![1u8, 2, 3]).unwrap();
        let key = record_key(tags::KEY, &vec![1u8, 2, 3]).unwrap();
        assert!(key.starts_with(&key_prefix));
        assert!(!meta.starts_with(&key_prefix));
    }

    #[test]
    fn test_parse_tag_garbage() {
        assert_eq!(parse_tag(&[]), None);
        assert_eq!(parse_tag(&[0xFF; 4]), None);
        let singleton = singleton_key(tags::FLAGS).unwrap();
        assert_eq!(parse_tag(&singleton).as_deref(), Some(tags::FLAGS));
    }
}
