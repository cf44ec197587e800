//! Merkle-root chain tracker
//!
//! Verifies transactions by recomputing the merkle root from their path and
//! comparing it with a known header root for that height.

use crate::domain::errors::ChainTrackerError;
use crate::ports::outbound::ChainTracker;
use async_trait::async_trait;
use overlay_types::{Hash, MerklePath, Transaction, TxId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Chain tracker backed by a table of block merkle roots.
#[derive(Debug)]
pub struct MerkleRootChainTracker {
    roots: RwLock<HashMap<u32, Hash>>,
    accept_unconfirmed: bool,
}

impl MerkleRootChainTracker {
    /// `accept_unconfirmed` decides transactions submitted without a path.
    pub fn new(accept_unconfirmed: bool) -> Self {
        Self {
            roots: RwLock::new(HashMap::new()),
            accept_unconfirmed,
        }
    }

    /// Build from `height -> root` with roots in block-explorer (reversed) hex.
    pub fn from_hex_roots(
        roots: &BTreeMap<u32, String>,
        accept_unconfirmed: bool,
    ) -> Result<Self, ChainTrackerError> {
        let tracker = Self::new(accept_unconfirmed);
        for (height, root_hex) in roots {
            let mut root: Hash = hex::decode(root_hex)
                .ok()
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| {
                    ChainTrackerError::Unavailable(format!(
                        "invalid merkle root for height {height}"
                    ))
                })?;
            root.reverse();
            tracker.add_root(*height, root);
        }
        Ok(tracker)
    }

    /// Record the merkle root (internal byte order) of the block at `height`.
    pub fn add_root(&self, height: u32, root: Hash) {
        self.roots.write().insert(height, root);
    }

    pub fn known_heights(&self) -> usize {
        self.roots.read().len()
    }

    fn root_matches(&self, root: &Hash, height: u32) -> bool {
        self.roots.read().get(&height) == Some(root)
    }
}

#[async_trait]
impl ChainTracker for MerkleRootChainTracker {
    async fn verify(
        &self,
        _transaction: &Transaction,
        txid: &TxId,
        merkle_path: Option<&MerklePath>,
    ) -> Result<bool, ChainTrackerError> {
        let Some(path) = merkle_path else {
            debug!(txid = %txid, accepted = self.accept_unconfirmed, "Unconfirmed transaction");
            return Ok(self.accept_unconfirmed);
        };

        let root = path.compute_root(txid);
        Ok(self.root_matches(&root, path.block_height))
    }

    async fn is_valid_root_for_height(
        &self,
        root: &Hash,
        height: u32,
    ) -> Result<bool, ChainTrackerError> {
        Ok(self.root_matches(root, height))
    }
}
