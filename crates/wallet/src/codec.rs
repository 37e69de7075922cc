//! Versioned record encoding.
//!
//! Values are a sequence of bincode-encoded fields. Versioned records start
//! with their own version and declare, per field, the version at which the
//! field was introduced ([`FieldSpec`]). [`FieldWriter`] and [`FieldReader`]
//! walk that table in order: a field whose introduction version is above the
//! record's version is neither written nor read, and takes its default.
//!
//! Reads are bounded by the remaining input, so a truncated or lying length
//! prefix fails with [`CodecError::Malformed`] instead of reading past the
//! value or allocating on its behalf.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Record codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("record version {found} is newer than supported version {supported}")]
    TooNew { found: i32, supported: i32 },

    #[error("malformed record: {0}")]
    Malformed(#[from] bincode::Error),

    #[error("record has more fields than its schema declares")]
    SchemaOverflow,
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// One entry of a record's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// First record version that carries this field.
    pub since: i32,
}

impl FieldSpec {
    pub const fn new(name: &'static str, since: i32) -> Self {
        Self { name, since }
    }

    /// A field carried by every version, whatever the version number says.
    pub const fn always(name: &'static str) -> Self {
        Self::new(name, i32::MIN)
    }
}

/// A record whose layout depends on an in-band version.
pub trait Versioned: Sized {
    /// Highest version this build knows the layout of.
    const CURRENT_VERSION: i32;

    /// Fields after the version, in wire order, with non-decreasing `since`.
    const FIELDS: &'static [FieldSpec];

    fn version(&self) -> i32;

    /// Offer every field in table order; the writer drops the ones the
    /// record's version does not carry.
    fn write_fields(&self, w: &mut FieldWriter<'_>) -> CodecResult<()>;

    /// Read every field in table order; absent fields come back as `None`.
    fn read_fields(version: i32, r: &mut FieldReader<'_>) -> CodecResult<Self>;
}

fn write_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

fn read_options(limit: usize) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit as u64)
}

/// Encode a value with no version header.
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    Ok(write_options().serialize(value)?)
}

/// Decode a value with no version header. Trailing bytes are ignored.
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    FieldReader::plain(bytes).read()
}

/// Encode a versioned record: version first, then the fields its version
/// carries.
pub fn encode<T: Versioned>(record: &T) -> CodecResult<Vec<u8>> {
    let mut w = FieldWriter::new(record.version(), T::FIELDS);
    w.write(&record.version())?;
    record.write_fields(&mut w)?;
    Ok(w.finish())
}

/// Decode a versioned record, refusing versions above `reader_max_version`
/// or above what this build knows.
pub fn decode<T: Versioned>(bytes: &[u8], reader_max_version: i32) -> CodecResult<T> {
    let mut r = FieldReader::new(bytes, T::FIELDS);
    let version: i32 = r.read()?;
    let supported = reader_max_version.min(T::CURRENT_VERSION);
    if version > supported {
        return Err(CodecError::TooNew {
            found: version,
            supported,
        });
    }
    r.version = version;
    T::read_fields(version, &mut r)
}

/// Decode at the newest version this build knows.
pub fn decode_current<T: Versioned>(bytes: &[u8]) -> CodecResult<T> {
    decode(bytes, T::CURRENT_VERSION)
}

/// Sequential field encoder.
pub struct FieldWriter<'s> {
    buf: Vec<u8>,
    version: i32,
    fields: &'s [FieldSpec],
    next: usize,
}

impl<'s> FieldWriter<'s> {
    pub fn new(version: i32, fields: &'s [FieldSpec]) -> Self {
        Self {
            buf: Vec::new(),
            version,
            fields,
            next: 0,
        }
    }

    /// Writer for values without a field table.
    pub fn plain() -> FieldWriter<'static> {
        FieldWriter::new(i32::MAX, &[])
    }

    /// Write the next table field if the record's version carries it.
    pub fn field<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        let spec = self
            .fields
            .get(self.next)
            .ok_or(CodecError::SchemaOverflow)?;
        self.next += 1;
        if spec.since > self.version {
            return Ok(());
        }
        self.write(value)
    }

    /// Write a value unconditionally.
    pub fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        write_options().serialize_into(&mut self.buf, value)?;
        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Sequential field decoder over a borrowed value.
pub struct FieldReader<'a> {
    rest: &'a [u8],
    version: i32,
    fields: &'static [FieldSpec],
    next: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(bytes: &'a [u8], fields: &'static [FieldSpec]) -> Self {
        Self {
            rest: bytes,
            version: i32::MAX,
            fields,
            next: 0,
        }
    }

    /// Reader for values without a field table.
    pub fn plain(bytes: &'a [u8]) -> Self {
        Self::new(bytes, &[])
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    /// Read the next table field, or `None` if the record's version
    /// predates it.
    pub fn field<T: DeserializeOwned>(&mut self) -> CodecResult<Option<T>> {
        let spec = self
            .fields
            .get(self.next)
            .ok_or(CodecError::SchemaOverflow)?;
        self.next += 1;
        if spec.since > self.version {
            return Ok(None);
        }
        self.read().map(Some)
    }

    /// Read a value unconditionally.
    pub fn read<T: DeserializeOwned>(&mut self) -> CodecResult<T> {
        let limit = self.rest.len();
        Ok(read_options(limit).deserialize_from(&mut self.rest)?)
    }

    /// Read a value only if input remains. Used for fields that older
    /// writers left off the end without bumping a version.
    pub fn trailing<T: DeserializeOwned>(&mut self) -> CodecResult<Option<T>> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        self.read().map(Some)
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        self.rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Sample {
        version: i32,
        a: u32,
        b: String,
        c: bool,
    }

    impl Versioned for Sample {
        const CURRENT_VERSION: i32 = 3;
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec::new("a", 1),
            FieldSpec::new("b", 2),
            FieldSpec::new("c", 3),
        ];

        fn version(&self) -> i32 {
            self.version
        }

        fn write_fields(&self, w: &mut FieldWriter<'_>) -> CodecResult<()> {
            w.field(&self.a)?;
            w.field(&self.b)?;
            w.field(&self.c)
        }

        fn read_fields(version: i32, r: &mut FieldReader<'_>) -> CodecResult<Self> {
            Ok(Sample {
                version,
                a: r.field()?.unwrap_or_default(),
                b: r.field()?.unwrap_or_default(),
                c: r.field()?.unwrap_or_default(),
            })
        }
    }

    fn full(version: i32) -> Sample {
        Sample {
            version,
            a: 7,
            b: "path".into(),
            c: true,
        }
    }

    #[test]
    fn test_current_version_roundtrip() {
        let s = full(3);
        let bytes = encode(&s).unwrap();
        assert_eq!(decode::<Sample>(&bytes, 3).unwrap(), s);
    }

    #[test]
    fn test_older_version_omits_later_fields() {
        let bytes = encode(&full(1)).unwrap();
        // version (4) + a (4)
        assert_eq!(bytes.len(), 8);

        let decoded: Sample = decode_current(&bytes).unwrap();
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.a, 7);
        assert_eq!(decoded.b, "");
        assert!(!decoded.c);
    }

    #[test]
    fn test_too_new_for_build() {
        let bytes = encode(&full(4)).unwrap();
        let err = decode::<Sample>(&bytes, 10).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TooNew {
                found: 4,
                supported: 3
            }
        ));
    }

    #[test]
    fn test_too_new_for_reader() {
        let bytes = encode(&full(3)).unwrap();
        let err = decode::<Sample>(&bytes, 2).unwrap_err();
        assert!(matches!(
            err,
            CodecError::TooNew {
                found: 3,
                supported: 2
            }
        ));
    }

    #[test]
    fn test_truncated_is_malformed() {
        let bytes = encode(&full(3)).unwrap();
        for cut in [0, 3, 6, bytes.len() - 1] {
            let err = decode::<Sample>(&bytes[..cut], 3).unwrap_err();
            assert!(matches!(err, CodecError::Malformed(_)), "cut at {}", cut);
        }
    }

    #[test]
    fn test_lying_length_prefix_is_bounded() {
        // version 2, a = 1, then a string claiming u64::MAX bytes
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(b"abc");
        assert!(matches!(
            decode::<Sample>(&bytes, 3),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_trailing_fields() {
        let mut w = FieldWriter::plain();
        w.write(&5u32).unwrap();
        let short = w.finish();

        let mut r = FieldReader::plain(&short);
        assert_eq!(r.read::<u32>().unwrap(), 5);
        assert_eq!(r.trailing::<bool>().unwrap(), None);

        let mut w = FieldWriter::plain();
        w.write(&5u32).unwrap();
        w.write(&true).unwrap();
        let long = w.finish();

        let mut r = FieldReader::plain(&long);
        assert_eq!(r.read::<u32>().unwrap(), 5);
        assert_eq!(r.trailing::<bool>().unwrap(), Some(true));
        assert!(r.remaining().is_empty());
    }

    #[test]
    fn test_plain_value_roundtrip() {
        let bytes = encode_value("label").unwrap();
        let label: String = decode_value(&bytes).unwrap();
        assert_eq!(label, "label");
    }
}
