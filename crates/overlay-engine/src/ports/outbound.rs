//! Outbound Ports (Driven Ports / SPI)
//!
//! Capabilities the engine coordinates. Concrete implementations are chosen
//! when the engine is wired; see `crate::adapters` for in-process ones.

use crate::domain::context::AdmissionContext;
use crate::domain::entities::{
    Admittance, AppliedTransaction, LookupFormula, LookupQuestion, Output, ServiceMetadata,
};
use crate::domain::errors::{
    BroadcastError, ChainTrackerError, LookupServiceError, StorageError, TopicManagerError,
};
use async_trait::async_trait;
use overlay_types::{Hash, MerklePath, Outpoint, Transaction, TxId};

/// Verifies transactions against known chain state.
#[async_trait]
pub trait ChainTracker: Send + Sync {
    /// `Ok(false)` and `Err(_)` both reject the submission.
    async fn verify(
        &self,
        transaction: &Transaction,
        txid: &TxId,
        merkle_path: Option<&MerklePath>,
    ) -> Result<bool, ChainTrackerError>;

    /// Whether `root` is the merkle root of the block at `height`.
    async fn is_valid_root_for_height(&self, root: &Hash, height: u32)
        -> Result<bool, ChainTrackerError>;
}

/// Relays verified transactions to the network.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, txid: &TxId, raw_tx: &[u8]) -> Result<(), BroadcastError>;
}

/// Persistent store for topic-scoped outputs and applied markers.
///
/// Implementations must make `insert_output`, `delete_output`,
/// `insert_applied_transaction` idempotent and `mark_outpoints_spent` atomic
/// per outpoint. The engine does no locking of its own.
#[async_trait]
pub trait OverlayStorage: Send + Sync {
    /// Positionally aligned lookup: `result[i]` answers `outpoints[i]`.
    ///
    /// `spent` filters on spent state when set.
    async fn find_outputs(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent: Option<bool>,
        include_evidence: bool,
    ) -> Result<Vec<Option<Output>>, StorageError>;

    /// Single lookup, any spent state, without evidence.
    async fn find_output(
        &self,
        outpoint: &Outpoint,
        topic: &str,
    ) -> Result<Option<Output>, StorageError> {
        let mut found = self
            .find_outputs(std::slice::from_ref(outpoint), topic, None, false)
            .await?;
        Ok(found.pop().flatten())
    }

    /// Every stored output created by `txid`, across all topics.
    async fn find_outputs_for_transaction(
        &self,
        txid: &TxId,
        include_evidence: bool,
    ) -> Result<Vec<Output>, StorageError>;

    /// Unspent outputs of one topic.
    async fn find_utxos_for_topic(&self, topic: &str) -> Result<Vec<Output>, StorageError>;

    /// No-op if `(outpoint, topic)` already exists. Returns whether a new
    /// record was written.
    async fn insert_output(&self, output: &Output) -> Result<bool, StorageError>;

    /// No-op if absent.
    async fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StorageError>;

    /// Outpoints with no record under `topic` are ignored.
    async fn mark_outpoints_spent(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent_by: &TxId,
    ) -> Result<(), StorageError>;

    /// Replaces the whole referrer list.
    async fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StorageError>;

    async fn update_output_block_height(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        block_height: u32,
        block_index: u64,
    ) -> Result<(), StorageError>;

    async fn insert_applied_transaction(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<(), StorageError>;

    async fn does_applied_transaction_exist(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<bool, StorageError>;
}

/// Admission rules for one topic.
#[async_trait]
pub trait TopicManager: Send + Sync {
    /// Topics that must be decided before this one, in resolution order.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Decide which outputs to admit and which inputs to retain.
    ///
    /// Must not write to storage.
    async fn identify_admissible_outputs(
        &self,
        ctx: &AdmissionContext<'_>,
    ) -> Result<Admittance, TopicManagerError>;

    fn metadata(&self) -> ServiceMetadata;
}

/// Read-side index notified as outputs come and go.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn output_added(&self, output: &Output) -> Result<(), LookupServiceError>;

    async fn output_deleted(&self, outpoint: &Outpoint, topic: &str)
        -> Result<(), LookupServiceError>;

    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupFormula, LookupServiceError>;

    fn metadata(&self) -> ServiceMetadata;
}
