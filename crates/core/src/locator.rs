//! Best-block locator persisted by the wallet.

use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// Sparse list of block hashes, newest first, used to find the fork point
/// with the active chain when the wallet is reopened.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockLocator {
    pub have: Vec<Hash>,
}

impl BlockLocator {
    pub fn new(have: Vec<Hash>) -> Self {
        Self { have }
    }

    pub fn is_null(&self) -> bool {
        self.have.is_empty()
    }

    /// The most recent block the wallet has seen, if any.
    pub fn tip(&self) -> Option<&Hash> {
        self.have.first()
    }
}
