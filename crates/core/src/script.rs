//! Scripts and the destinations they pay to.

use crate::hash::{hash160, KeyId, ScriptId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw output script bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Script(pub Vec<u8>);

impl Script {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn id(&self) -> ScriptId {
        ScriptId(hash160(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", hex::encode(&self.0))
    }
}

/// Where coins can be sent. Labels, purposes and destination data are keyed
/// by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Destination {
    KeyHash(KeyId),
    ScriptHash(ScriptId),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::KeyHash(id) => write!(f, "key:{}", id),
            Destination::ScriptHash(id) => write!(f, "script:{}", id),
        }
    }
}

impl From<KeyId> for Destination {
    fn from(id: KeyId) -> Self {
        Destination::KeyHash(id)
    }
}

impl From<ScriptId> for Destination {
    fn from(id: ScriptId) -> Self {
        Destination::ScriptHash(id)
    }
}
