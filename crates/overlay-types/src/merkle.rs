//! # Merkle Paths
//!
//! Inclusion proof of a transaction within a block.
//!
//! ALGORITHM: starting from the transaction id, hash with each sibling in
//! turn (left or right as recorded) until the root is reached:
//! parent = SHA256d(left || right).

use serde::{Deserialize, Serialize};

use crate::entities::{Hash, TxId};
use crate::transaction::double_sha256;

/// Position of a sibling relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPosition {
    Left,
    Right,
}

/// A single step of a merkle path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    /// Sibling hash at this level.
    pub hash: Hash,
    pub position: SiblingPosition,
}

/// Proof that a transaction is included in the block at `block_height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Height of the block containing the transaction.
    pub block_height: u32,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Sibling hashes from leaf to root.
    pub path: Vec<PathNode>,
}

impl MerklePath {
    pub fn new(block_height: u32, tx_index: u64, path: Vec<PathNode>) -> Self {
        Self {
            block_height,
            tx_index,
            path,
        }
    }

    /// Recompute the merkle root this path commits `txid` to.
    pub fn compute_root(&self, txid: &TxId) -> Hash {
        let mut current = *txid.as_bytes();
        for node in &self.path {
            current = match node.position {
                SiblingPosition::Left => hash_pair(&node.hash, &current),
                SiblingPosition::Right => hash_pair(&current, &node.hash),
            };
        }
        current
    }
}

/// parent = SHA256d(left || right)
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(left);
    data[32..].copy_from_slice(right);
    double_sha256(&data)
}
