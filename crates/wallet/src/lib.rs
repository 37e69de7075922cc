//! Durable wallet record store.
//!
//! Wallet data lives as tagged key/value records in a [`Database`]. This
//! crate provides:
//! - Versioned record encodings that read older and refuse newer layouts
//! - [`WalletBatch`], the typed single-writer handle with transactions and
//!   the update-count flush policy
//! - The load pipeline, which scans every record into a [`LoadTarget`] and
//!   reports the worst [`DbStatus`] it met
//! - Raw-record recovery into a backup store, and pre-open verification
//!
//! # Example
//!
//! ```rust,no_run
//! use satchel_storage::Database;
//! use satchel_wallet::{DbStatus, WalletBatch, WalletState};
//!
//! let db = Database::open("./wallet").unwrap();
//! let mut state = WalletState::new();
//! let status = WalletBatch::new(&db).load_wallet(&mut state);
//! assert_eq!(status, DbStatus::LoadOk);
//! ```
//!
//! [`Database`]: satchel_storage::Database

pub mod batch;
pub mod codec;
pub mod flags;
pub mod keys;
pub mod load;
pub mod records;
pub mod recover;
pub mod state;
pub mod status;
pub mod verify;

// Re-export commonly used types
pub use batch::{Result, WalletBatch, WalletDbError};
pub use codec::{decode, decode_current, encode, CodecError, FieldSpec, Versioned};
pub use keys::{is_key_type, parse_tag, tags};
pub use load::{open_and_load, LoadStats};
pub use records::{
    DescriptorCache, ExtPubKey, HdChain, KeyMetadata, KeyOriginInfo, KeyPoolEntry, MasterKey,
    WalletDescriptor,
};
pub use recover::{
    backup_path_for, recover, recover_all, recover_keys_only_filter, recover_to, RecoveryError,
    RecoveryReport,
};
pub use state::{AddressBookEntry, LoadTarget, Rejected, WalletState};
pub use status::DbStatus;
pub use verify::{verify_database_file, verify_environment, Verification};
