//! Wallet primitives for satchel.
//!
//! This crate provides the value types the wallet store persists:
//! - Hashes and fixed-size identifiers (key ids, script ids, transaction ids)
//! - Opaque key material and a keypair generator
//! - Scripts and destinations
//! - Transactions and wallet transaction records
//! - Best-block locators

pub mod crypto;
pub mod hash;
pub mod locator;
pub mod script;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use crypto::{CryptoError, Keypair, PrivKey, PubKey};
pub use hash::{hash, hash160, hash_concat, Hash, KeyId, ScriptId, TxId, H160, H256};
pub use locator::BlockLocator;
pub use script::{Destination, Script};
pub use transaction::{OutPoint, Transaction, TxOut, WalletTx};
