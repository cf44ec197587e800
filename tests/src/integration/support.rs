//! Transaction builders and test doubles shared by the integration scenarios.

use async_trait::async_trait;
use overlay_engine::adapters::{InMemoryStorage, MerkleRootChainTracker};
use overlay_engine::{
    Admittance, AdmissionContext, BroadcastError, Broadcaster, ChainTracker, Engine, EngineError,
    LookupFormula, LookupQuestion, LookupService, LookupServiceError, Output, OverlayEngineApi,
    ServiceMetadata, TopicAdmittances, TopicManager, TopicManagerError,
};
use overlay_types::{
    Outpoint, SubmitMode, TaggedTransaction, Transaction, TransactionInput, TransactionOutput,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const TOPIC: &str = "tm_x";

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Transaction spending `inputs` with `outputs` admissible outputs.
///
/// `seed` goes into the lock time so otherwise identical transactions get
/// distinct ids.
pub fn tx(seed: u32, inputs: &[Outpoint], outputs: usize) -> Transaction {
    Transaction {
        version: 1,
        inputs: inputs
            .iter()
            .map(|source| TransactionInput {
                source: *source,
                unlocking_script: vec![0x51],
                sequence: u32::MAX,
            })
            .collect(),
        outputs: (0..outputs)
            .map(|vout| TransactionOutput {
                satoshis: 1_000,
                locking_script: vec![0x6a, vout as u8],
            })
            .collect(),
        lock_time: seed,
    }
}

pub fn tagged(tx: &Transaction, topics: &[&str]) -> TaggedTransaction {
    TaggedTransaction::new(tx.to_bytes(), topics.iter().map(|t| t.to_string()).collect())
}

pub fn outpoint(tx: &Transaction, vout: u32) -> Outpoint {
    Outpoint::new(tx.txid(), vout)
}

// =============================================================================
// TOPIC MANAGERS
// =============================================================================

type Decision = Box<dyn Fn(&AdmissionContext<'_>) -> Admittance + Send + Sync>;

/// Topic manager whose decision is a closure.
pub struct FnTopicManager {
    name: String,
    dependencies: Vec<String>,
    decide: Decision,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl FnTopicManager {
    pub fn new<F>(name: &str, decide: F) -> Self
    where
        F: Fn(&AdmissionContext<'_>) -> Admittance + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            decide: Box::new(decide),
            log: None,
        }
    }

    /// Admit every output and keep every input the topic knows as provenance.
    pub fn retaining(name: &str) -> Self {
        Self::new(name, |ctx| {
            let known = ctx
                .inputs()
                .iter()
                .enumerate()
                .filter(|(_, input)| input.is_some())
                .map(|(index, _)| index as u32);
            Admittance::new()
                .admit_all(0..ctx.transaction().outputs.len() as u32)
                .retain_all(known)
        })
    }

    /// Admit every output and let every spent input go.
    pub fn releasing(name: &str) -> Self {
        Self::new(name, |ctx| {
            Admittance::new().admit_all(0..ctx.transaction().outputs.len() as u32)
        })
    }

    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Append this manager's name to `log` on every decision.
    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl TopicManager for FnTopicManager {
    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    async fn identify_admissible_outputs(
        &self,
        ctx: &AdmissionContext<'_>,
    ) -> Result<Admittance, TopicManagerError> {
        if let Some(log) = &self.log {
            log.lock().push(self.name.clone());
        }
        Ok((self.decide)(ctx))
    }

    fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata::new(&self.name, "Scripted test topic")
    }
}

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Lookup service that records every notification.
#[derive(Default)]
pub struct RecordingLookup {
    added: Mutex<Vec<(Outpoint, String)>>,
    deleted: Mutex<Vec<(Outpoint, String)>>,
}

impl RecordingLookup {
    pub fn added(&self) -> Vec<(Outpoint, String)> {
        self.added.lock().clone()
    }

    pub fn deleted(&self) -> Vec<(Outpoint, String)> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl LookupService for RecordingLookup {
    async fn output_added(&self, output: &Output) -> Result<(), LookupServiceError> {
        self.added
            .lock()
            .push((output.outpoint, output.topic.clone()));
        Ok(())
    }

    async fn output_deleted(
        &self,
        outpoint: &Outpoint,
        topic: &str,
    ) -> Result<(), LookupServiceError> {
        self.deleted.lock().push((*outpoint, topic.to_string()));
        Ok(())
    }

    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupFormula, LookupServiceError> {
        let mut formula = LookupFormula::default();
        for (outpoint, topic) in self.added() {
            if question.query.get("topic").and_then(|t| t.as_str()) == Some(topic.as_str()) {
                formula.push(outpoint, topic);
            }
        }
        Ok(formula)
    }

    fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata::new("ls_recording", "Records notifications")
    }
}

/// Broadcaster counting calls, optionally rejecting all of them.
#[derive(Default)]
pub struct CountingBroadcaster {
    calls: AtomicUsize,
    reject: bool,
}

impl CountingBroadcaster {
    pub fn rejecting() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reject: true,
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broadcaster for CountingBroadcaster {
    async fn broadcast(
        &self,
        _txid: &overlay_types::TxId,
        _raw_tx: &[u8],
    ) -> Result<(), BroadcastError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(BroadcastError::Rejected("mempool conflict".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// One engine over fresh in-memory storage.
pub struct Harness {
    pub engine: Engine,
    pub storage: Arc<InMemoryStorage>,
    pub lookup: Arc<RecordingLookup>,
    pub broadcaster: Arc<CountingBroadcaster>,
}

impl Harness {
    /// Engine accepting unconfirmed transactions, with the given managers.
    pub fn new(managers: Vec<FnTopicManager>) -> Self {
        Self::with_collaborators(
            managers,
            Arc::new(MerkleRootChainTracker::new(true)),
            CountingBroadcaster::default(),
        )
    }

    pub fn with_collaborators(
        managers: Vec<FnTopicManager>,
        chain_tracker: Arc<dyn ChainTracker>,
        broadcaster: CountingBroadcaster,
    ) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let lookup = Arc::new(RecordingLookup::default());
        let broadcaster = Arc::new(broadcaster);

        let mut builder = Engine::builder(storage.clone(), chain_tracker)
            .broadcaster(broadcaster.clone())
            .lookup_service("ls_recording", lookup.clone());
        for manager in managers {
            builder = builder.topic_manager(manager.name.clone(), Arc::new(manager));
        }

        Self {
            engine: builder.build(),
            storage,
            lookup,
            broadcaster,
        }
    }

    /// Submit in current mode without a callback.
    pub async fn submit(
        &self,
        tx: &Transaction,
        topics: &[&str],
    ) -> Result<TopicAdmittances, EngineError> {
        self.engine
            .submit(tagged(tx, topics), SubmitMode::Current, None)
            .await
    }

    /// Stored record under the default topic.
    pub fn output(&self, outpoint: &Outpoint) -> Option<Output> {
        self.storage.get(outpoint, TOPIC)
    }
}
