//! # Core Value Types
//!
//! Identifiers and submission envelopes shared by the engine, its adapters
//! and the node runtime.
//!
//! ## Clusters
//!
//! - **Identity**: `TxId`, `Outpoint`
//! - **Submission**: `TaggedTransaction`, `SubmitMode`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::TypesError;
use crate::merkle::MerklePath;

/// A 32-byte hash.
pub type Hash = [u8; 32];

/// Transaction identifier: double SHA-256 of the wire serialization.
///
/// Stored in internal (hash) byte order. `Display` and `FromStr` use the
/// conventional reversed-byte hex form seen in block explorers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId(pub Hash);

impl TxId {
    /// Wrap raw hash bytes (internal byte order).
    pub const fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    /// Raw hash bytes (internal byte order).
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

impl FromStr for TxId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypesError::InvalidTxIdLength(bytes.len()));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        hash.reverse();
        Ok(Self(hash))
    }
}

impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifies one transaction output: `(transaction id, output index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    /// Transaction that created the output.
    pub txid: TxId,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl Outpoint {
    pub const fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.vout)
    }
}

impl FromStr for Outpoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once('.')
            .ok_or_else(|| TypesError::InvalidOutpoint(s.to_string()))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|_| TypesError::InvalidOutpoint(s.to_string()))?;
        Ok(Self::new(txid.parse()?, vout))
    }
}

/// How a submission should be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// A newly observed transaction: broadcast after verification.
    #[default]
    Current,
    /// Replay of a transaction already final on-chain (backfill): never broadcast.
    Historical,
}

impl SubmitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Historical => "historical",
        }
    }

    pub fn should_broadcast(&self) -> bool {
        matches!(self, Self::Current)
    }
}

/// Transaction evidence tagged with the topics it is submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedTransaction {
    /// Raw transaction in wire format.
    #[serde(with = "hex_bytes")]
    pub raw_tx: Vec<u8>,
    /// Inclusion proof, absent while the transaction is unconfirmed.
    #[serde(default)]
    pub merkle_path: Option<MerklePath>,
    /// Requested topic names, in commit order.
    pub topics: Vec<String>,
}

impl TaggedTransaction {
    pub fn new(raw_tx: Vec<u8>, topics: Vec<String>) -> Self {
        Self {
            raw_tx,
            merkle_path: None,
            topics,
        }
    }

    pub fn with_merkle_path(mut self, path: MerklePath) -> Self {
        self.merkle_path = Some(path);
        self
    }
}

/// Serde helper encoding byte vectors as hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
