//! Inbound Ports (Driving Ports / API)

use crate::domain::entities::{
    AdmittanceCallback, LookupAnswer, LookupQuestion, ServiceMetadata, TopicAdmittances,
};
use crate::domain::errors::EngineError;
use async_trait::async_trait;
use overlay_types::{MerklePath, SubmitMode, TaggedTransaction, TxId};
use std::collections::BTreeMap;

/// Primary Overlay Engine API
#[async_trait]
pub trait OverlayEngineApi: Send + Sync {
    /// Verify, decide and commit a tagged transaction.
    ///
    /// Order of effects: verify, mark inputs spent per topic as each topic
    /// resolves, broadcast (current mode only), `on_admittance`, then
    /// per-topic commit in requested order.
    async fn submit(
        &self,
        tagged: TaggedTransaction,
        mode: SubmitMode,
        on_admittance: Option<AdmittanceCallback>,
    ) -> Result<TopicAdmittances, EngineError>;

    /// Ask a lookup service and hydrate its answer from storage.
    async fn lookup(&self, question: LookupQuestion) -> Result<LookupAnswer, EngineError>;

    /// Record a new inclusion proof for an already stored transaction.
    ///
    /// Returns the number of outputs updated.
    async fn handle_new_merkle_proof(
        &self,
        txid: TxId,
        proof: MerklePath,
    ) -> Result<usize, EngineError>;

    fn list_topic_managers(&self) -> BTreeMap<String, ServiceMetadata>;

    fn list_lookup_services(&self) -> BTreeMap<String, ServiceMetadata>;
}
