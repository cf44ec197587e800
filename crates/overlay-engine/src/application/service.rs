//! Overlay Engine Service
//!
//! Main service implementing `OverlayEngineApi`.

use crate::config::EngineConfig;
use crate::domain::context::SubmitContext;
use crate::domain::entities::{
    AdmittanceCallback, LookupAnswer, LookupQuestion, ServiceMetadata, TopicAdmittances,
};
use crate::domain::errors::EngineError;
use crate::ports::inbound::OverlayEngineApi;
use crate::ports::outbound::{Broadcaster, ChainTracker, LookupService, OverlayStorage, TopicManager};
use async_trait::async_trait;
use overlay_telemetry::{log_tx_event, HistogramTimer, SUBMISSIONS_TOTAL, SUBMIT_DURATION};
use overlay_types::{MerklePath, SubmitMode, TaggedTransaction, Transaction, TxId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Overlay Engine
///
/// Orchestrates one submission:
/// 1. Reject unknown topics
/// 2. Parse and verify against the chain tracker
/// 3. Resolve every requested topic (dependencies first), marking inputs spent
/// 4. Broadcast (current mode)
/// 5. Hand the decisions to the caller's callback
/// 6. Commit each requested topic in order
///
/// Steps 1-4 run under the submission deadline. Once step 6 starts it runs to
/// completion; applied markers make an interrupted commit safe to re-drive.
#[derive(Clone)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) storage: Arc<dyn OverlayStorage>,
    pub(super) chain_tracker: Arc<dyn ChainTracker>,
    pub(super) broadcaster: Option<Arc<dyn Broadcaster>>,
    pub(super) topic_managers: BTreeMap<String, Arc<dyn TopicManager>>,
    pub(super) lookup_services: BTreeMap<String, Arc<dyn LookupService>>,
}

impl Engine {
    pub fn builder(
        storage: Arc<dyn OverlayStorage>,
        chain_tracker: Arc<dyn ChainTracker>,
    ) -> EngineBuilder {
        EngineBuilder::new(storage, chain_tracker)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Submit with an explicit pre-commit deadline (`None` waits indefinitely).
    #[instrument(skip_all, fields(mode = mode.as_str(), topics = ?tagged.topics))]
    pub async fn submit_with_deadline(
        &self,
        tagged: TaggedTransaction,
        mode: SubmitMode,
        on_admittance: Option<AdmittanceCallback>,
        deadline: Option<Instant>,
    ) -> Result<TopicAdmittances, EngineError> {
        let _timer = HistogramTimer::new(&SUBMIT_DURATION);

        let result = self
            .process_submission(tagged, mode, on_admittance, deadline)
            .await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        SUBMISSIONS_TOTAL
            .with_label_values(&[mode.as_str(), outcome])
            .inc();

        if let Err(e) = &result {
            warn!(error = %e, kind = outcome, "Submission failed");
        }
        result
    }

    async fn process_submission(
        &self,
        tagged: TaggedTransaction,
        mode: SubmitMode,
        on_admittance: Option<AdmittanceCallback>,
        deadline: Option<Instant>,
    ) -> Result<TopicAdmittances, EngineError> {
        let topics = self.requested_topics(&tagged.topics)?;

        let prepare = self.prepare(tagged, &topics, mode);
        let ctx = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, prepare)
                .await
                .map_err(|_| EngineError::Timeout)??,
            None => prepare.await?,
        };

        if let Some(callback) = on_admittance {
            callback(&ctx.admittances_for(&topics));
        }

        let mut committed = TopicAdmittances::new();
        for topic in &topics {
            let admittance = self.commit_topic(&ctx, topic).await?;
            committed.insert(topic.clone(), admittance);
        }

        log_tx_event!(
            info,
            "engine",
            "Submission committed",
            ctx.txid,
            topics = committed.len()
        );
        Ok(committed)
    }

    /// Requested topics in first-seen order, all registered.
    fn requested_topics(&self, requested: &[String]) -> Result<Vec<String>, EngineError> {
        let mut topics: Vec<String> = Vec::with_capacity(requested.len());
        for topic in requested {
            if !self.topic_managers.contains_key(topic) {
                return Err(EngineError::UnknownTopic {
                    topic: topic.clone(),
                });
            }
            if !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        Ok(topics)
    }

    /// Everything before commit: verify, resolve, broadcast.
    async fn prepare(
        &self,
        tagged: TaggedTransaction,
        topics: &[String],
        mode: SubmitMode,
    ) -> Result<SubmitContext, EngineError> {
        let transaction = Transaction::from_bytes(&tagged.raw_tx)?;
        let txid = transaction.txid();

        let verified = self
            .chain_tracker
            .verify(&transaction, &txid, tagged.merkle_path.as_ref())
            .await?;
        if !verified {
            return Err(EngineError::InvalidTransaction {
                txid,
                reason: "chain tracker rejected the transaction".to_string(),
            });
        }
        debug!(txid = %txid, "Transaction verified");

        let mut ctx = SubmitContext::new(transaction, tagged.raw_tx, tagged.merkle_path);
        for topic in topics {
            self.resolve_topic(&mut ctx, topic).await?;
        }

        if mode.should_broadcast() {
            self.broadcast(&ctx).await?;
        }

        Ok(ctx)
    }

    async fn broadcast(&self, ctx: &SubmitContext) -> Result<(), EngineError> {
        let Some(broadcaster) = &self.broadcaster else {
            debug!(txid = %ctx.txid, "No broadcaster configured, skipping broadcast");
            return Ok(());
        };

        match broadcaster.broadcast(&ctx.txid, &ctx.raw_tx).await {
            Ok(()) => {
                debug!(txid = %ctx.txid, "Transaction broadcast");
                Ok(())
            }
            Err(source) if self.config.abort_on_broadcast_failure => Err(EngineError::Broadcast {
                txid: ctx.txid,
                source,
            }),
            Err(source) => {
                warn!(txid = %ctx.txid, error = %source, "Broadcast failed, continuing");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl OverlayEngineApi for Engine {
    async fn submit(
        &self,
        tagged: TaggedTransaction,
        mode: SubmitMode,
        on_admittance: Option<AdmittanceCallback>,
    ) -> Result<TopicAdmittances, EngineError> {
        let deadline = self.config.submit_timeout().map(|t| Instant::now() + t);
        self.submit_with_deadline(tagged, mode, on_admittance, deadline)
            .await
    }

    #[instrument(skip(self), fields(service = %question.service))]
    async fn lookup(&self, question: LookupQuestion) -> Result<LookupAnswer, EngineError> {
        let service = self.lookup_services.get(&question.service).ok_or_else(|| {
            EngineError::UnknownLookupService {
                service: question.service.clone(),
            }
        })?;

        let formula = service
            .lookup(&question)
            .await
            .map_err(|source| EngineError::LookupService {
                service: question.service.clone(),
                source,
            })?;

        let mut answer = LookupAnswer::default();
        for entry in &formula.entries {
            let found = self
                .storage
                .find_outputs(std::slice::from_ref(&entry.outpoint), &entry.topic, None, true)
                .await?;
            // Pruned since the index answered
            if let Some(Some(output)) = found.into_iter().next() {
                answer.outputs.push(output);
            }
        }

        debug!(
            referenced = formula.len(),
            returned = answer.outputs.len(),
            "Lookup answered"
        );
        Ok(answer)
    }

    #[instrument(skip(self, proof), fields(txid = %txid, height = proof.block_height))]
    async fn handle_new_merkle_proof(
        &self,
        txid: TxId,
        proof: MerklePath,
    ) -> Result<usize, EngineError> {
        let root = proof.compute_root(&txid);
        if !self
            .chain_tracker
            .is_valid_root_for_height(&root, proof.block_height)
            .await?
        {
            return Err(EngineError::InvalidTransaction {
                txid,
                reason: format!("merkle root not valid for height {}", proof.block_height),
            });
        }

        let outputs = self.storage.find_outputs_for_transaction(&txid, false).await?;
        for output in &outputs {
            self.storage
                .update_output_block_height(
                    &output.outpoint,
                    &output.topic,
                    proof.block_height,
                    proof.tx_index,
                )
                .await?;
        }

        info!(updated = outputs.len(), "Merkle proof applied");
        Ok(outputs.len())
    }

    fn list_topic_managers(&self) -> BTreeMap<String, ServiceMetadata> {
        self.topic_managers
            .iter()
            .map(|(name, manager)| (name.clone(), manager.metadata()))
            .collect()
    }

    fn list_lookup_services(&self) -> BTreeMap<String, ServiceMetadata> {
        self.lookup_services
            .iter()
            .map(|(name, service)| (name.clone(), service.metadata()))
            .collect()
    }
}

/// Builder wiring an `Engine` to its capabilities.
pub struct EngineBuilder {
    config: EngineConfig,
    storage: Arc<dyn OverlayStorage>,
    chain_tracker: Arc<dyn ChainTracker>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    topic_managers: BTreeMap<String, Arc<dyn TopicManager>>,
    lookup_services: BTreeMap<String, Arc<dyn LookupService>>,
}

impl EngineBuilder {
    pub fn new(storage: Arc<dyn OverlayStorage>, chain_tracker: Arc<dyn ChainTracker>) -> Self {
        Self {
            config: EngineConfig::default(),
            storage,
            chain_tracker,
            broadcaster: None,
            topic_managers: BTreeMap::new(),
            lookup_services: BTreeMap::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Register `manager` under `topic`, replacing any previous one.
    pub fn topic_manager(mut self, topic: impl Into<String>, manager: Arc<dyn TopicManager>) -> Self {
        self.topic_managers.insert(topic.into(), manager);
        self
    }

    pub fn lookup_service(
        mut self,
        name: impl Into<String>,
        service: Arc<dyn LookupService>,
    ) -> Self {
        self.lookup_services.insert(name.into(), service);
        self
    }

    pub fn build(self) -> Engine {
        info!(
            topic_managers = self.topic_managers.len(),
            lookup_services = self.lookup_services.len(),
            broadcaster = self.broadcaster.is_some(),
            "Overlay engine configured"
        );
        Engine {
            config: self.config,
            storage: self.storage,
            chain_tracker: self.chain_tracker,
            broadcaster: self.broadcaster,
            topic_managers: self.topic_managers,
            lookup_services: self.lookup_services,
        }
    }
}
