//! Transactions and the wallet's bookkeeping around them.

use crate::hash::{hash, Hash, TxId};
use crate::script::Script;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to an output of an earlier transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Amount in the smallest unit.
    pub value: i64,
    pub script_pubkey: Script,
}

/// A transaction as relayed on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new(inputs: Vec<OutPoint>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: 2,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Get the transaction id (hash of the canonical encoding).
    pub fn txid(&self) -> TxId {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        TxId(hash(&encoded))
    }

    pub fn total_out(&self) -> i64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

/// A transaction together with the wallet's view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTx {
    pub tx: Transaction,
    /// Block the transaction was confirmed in, if any.
    pub block_hash: Option<Hash>,
    /// Unix time the wallet first saw the transaction.
    pub time_received: i64,
    /// Position in the wallet's transaction ordering; -1 when unassigned.
    pub order_pos: i64,
    pub from_me: bool,
    /// Free-form annotations (comments, replacement links).
    pub map_value: BTreeMap<String, String>,
}

impl WalletTx {
    pub fn new(tx: Transaction, time_received: i64) -> Self {
        Self {
            tx,
            block_hash: None,
            time_received,
            order_pos: -1,
            from_me: false,
            map_value: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TxId {
        self.tx.txid()
    }

    pub fn is_confirmed(&self) -> bool {
        self.block_hash.is_some()
    }
}
