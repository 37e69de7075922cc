//! Key-value engine adapter for the satchel wallet store.
//!
//! This crate wraps the embedded engine the wallet records live in:
//! - Raw byte get/put/delete with per-call atomicity
//! - Atomic multi-operation groups
//! - Store-wide update and flush counters shared by every batch
//! - A single-writer batch handle with explicit transactions that commit
//!   when the handle goes out of scope
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Wallet Layer                          │
//! │     (WalletBatch, load pipeline, recovery engine)        │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌──────────────────┐  ┌──────────────────────────────┐ │
//! │  │ StoreBatch       │  │ Database                     │ │
//! │  │  - transactions  │  │  - sled wrapper              │ │
//! │  │  - scoped commit │  │  - update / flush counters   │ │
//! │  └──────────────────┘  └──────────────────────────────┘ │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use satchel_storage::{Database, StoreBatch};
//!
//! let db = Database::open("./wallet").unwrap();
//! let mut batch = StoreBatch::new(&db);
//! batch.txn_begin().unwrap();
//! batch.write(b"a", b"1", true).unwrap();
//! batch.write(b"b", b"2", true).unwrap();
//! batch.txn_commit().unwrap();
//! ```

pub mod batch;
pub mod config;
pub mod db;

// Re-export commonly used types
pub use batch::StoreBatch;
pub use config::{DatabaseConfig, DEFAULT_FLUSH_INTERVAL};
pub use db::{BatchOp, Database, RawRecord, Result, StorageError};
