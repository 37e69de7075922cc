//! Key material as the wallet store sees it.
//!
//! Public and private keys are opaque byte strings here; the store persists
//! them unchanged. [`Keypair`] exists so tools and tests can mint fresh
//! Ed25519 material to put into a wallet.

use crate::hash::{hash160, KeyId};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid private key")]
    InvalidPrivateKey,
}

/// Serialized public key bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct PubKey(pub Vec<u8>);

impl PubKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Id of this key, used for destinations and HD seed references.
    pub fn id(&self) -> KeyId {
        KeyId(hash160(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// A key is structurally valid when it is non-empty and no longer than
    /// an uncompressed secp256k1 point.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= 65
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PubKey({})", &hex[..hex.len().min(16)])
    }
}

impl AsRef<[u8]> for PubKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Serialized private key bytes. Never printed.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivKey(pub Vec<u8>);

impl PrivKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivKey(<{} bytes>)", self.0.len())
    }
}

/// A freshly generated Ed25519 keypair.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a keypair from stored private key bytes.
    pub fn from_private_key(key: &PrivKey) -> Result<Self, CryptoError> {
        let bytes: [u8; 32] = key
            .as_bytes()
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&bytes),
        })
    }

    pub fn public_key(&self) -> PubKey {
        PubKey(self.signing_key.verifying_key().to_bytes().to_vec())
    }

    pub fn private_key(&self) -> PrivKey {
        PrivKey(self.signing_key.to_bytes().to_vec())
    }

    pub fn id(&self) -> KeyId {
        self.public_key().id()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair").field("id", &self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp = Keypair::generate();
        assert!(kp.public_key().is_valid());
        assert!(!kp.id().is_null());
    }

    #[test]
    fn test_keypair_from_private_key() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::from_private_key(&kp1.private_key()).unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_bad_private_key_rejected() {
        let result = Keypair::from_private_key(&PrivKey::new(vec![1, 2, 3]));
        assert!(matches!(result, Err(CryptoError::InvalidPrivateKey)));
    }

    #[test]
    fn test_pubkey_validity() {
        assert!(!PubKey::default().is_valid());
        assert!(!PubKey::new(vec![2u8; 66]).is_valid());
        assert!(PubKey::new(vec![2u8; 33]).is_valid());
    }

    #[test]
    fn test_privkey_debug_hides_bytes() {
        let key = PrivKey::new(vec![0xAB; 32]);
        assert_eq!(format!("{:?}", key), "PrivKey(<32 bytes>)");
    }
}
