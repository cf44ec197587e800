//! Node runtime: wires one engine with the in-process adapters and owns the
//! background relay task.

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use crate::replay::{read_submissions, replay, ReplaySummary};
use overlay_engine::adapters::{
    ChannelBroadcaster, InMemoryStorage, IndexLookupService, MerkleRootChainTracker,
    RelayRequest, ScriptPrefixTopicManager,
};
use overlay_engine::{Engine, OverlayEngineApi};
use overlay_telemetry::log_event;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// The running node.
pub struct NodeRuntime {
    config: NodeConfig,
    engine: Engine,
    storage: Arc<InMemoryStorage>,
    lookup: Arc<IndexLookupService>,
    relay_rx: Option<mpsc::Receiver<RelayRequest>>,
    relay_task: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Build the engine and its adapters. Nothing runs until `start`.
    pub fn new(config: NodeConfig) -> NodeResult<Self> {
        info!("Creating overlay node runtime");

        let storage = Arc::new(InMemoryStorage::new());
        let chain_tracker = Arc::new(load_chain_tracker(&config)?);
        let lookup = Arc::new(IndexLookupService::new(&config.lookup_service));
        let (broadcaster, relay_rx) = ChannelBroadcaster::channel(config.relay_capacity);

        let mut builder = Engine::builder(storage.clone(), chain_tracker)
            .config(config.engine.clone())
            .broadcaster(Arc::new(broadcaster))
            .lookup_service(&config.lookup_service, lookup.clone());

        for topic in &config.topics {
            let manager = ScriptPrefixTopicManager::from_hex(&topic.name, &topic.script_prefix_hex)
                .map_err(|source| NodeError::TopicManager {
                    topic: topic.name.clone(),
                    source,
                })?
                .with_dependencies(topic.dependencies.clone());
            builder = builder.topic_manager(&topic.name, Arc::new(manager));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            engine: builder.build(),
            storage,
            lookup,
            relay_rx: Some(relay_rx),
            relay_task: None,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Spawn the relay task and run the configured backfill.
    pub async fn start(&mut self) -> NodeResult<()> {
        info!("===========================================");
        info!("  Overlay Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        self.start_relay();

        for (name, metadata) in self.engine.list_topic_managers() {
            info!(topic = %name, description = %metadata.short_description, "Topic manager registered");
        }

        if let Some(path) = self.config.replay_file.clone() {
            let summary = self.replay_backfill(&path).await?;
            let stats = self.storage.stats();
            log_event!(
                info,
                "node",
                "Backfill finished",
                applied = summary.applied,
                failed = summary.failed,
                outputs = stats.outputs,
                indexed = self.lookup.added_count()
            );
        }

        Ok(())
    }

    /// Replay a JSON-lines submission file in historical mode.
    pub async fn replay_backfill(&self, path: &Path) -> NodeResult<ReplaySummary> {
        info!(path = %path.display(), "Replaying historical submissions");
        let submissions = read_submissions(path)?;
        Ok(replay(&self.engine, submissions).await)
    }

    /// Relay accepts every transaction it is handed. A networked relay
    /// would plug in here.
    fn start_relay(&mut self) {
        let Some(mut relay_rx) = self.relay_rx.take() else {
            return;
        };
        let mut shutdown = self.shutdown_rx.clone();

        self.relay_task = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    request = relay_rx.recv() => match request {
                        Some(request) => {
                            debug!(txid = %request.txid, bytes = request.raw_tx.len(), "Relaying transaction");
                            request.accept();
                        }
                        None => break,
                    },
                    _ = shutdown.changed() => {
                        info!("[relay] Shutdown signal received");
                        break;
                    }
                }
            }
        }));
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn storage(&self) -> Arc<InMemoryStorage> {
        Arc::clone(&self.storage)
    }

    pub fn lookup_service(&self) -> Arc<IndexLookupService> {
        Arc::clone(&self.lookup)
    }

    /// Signal background tasks and wait briefly for them to finish.
    pub async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        if let Some(task) = self.relay_task.take() {
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                error!("Relay task did not stop in time");
            }
        }

        info!("Shutdown complete");
    }
}

fn load_chain_tracker(config: &NodeConfig) -> NodeResult<MerkleRootChainTracker> {
    let Some(path) = &config.known_roots_file else {
        return Ok(MerkleRootChainTracker::new(config.accept_unconfirmed));
    };

    let contents = std::fs::read_to_string(path).map_err(|source| NodeError::Io {
        path: path.clone(),
        source,
    })?;
    let roots: BTreeMap<u32, String> =
        serde_json::from_str(&contents).map_err(|source| NodeError::Json {
            path: path.clone(),
            line: source.line(),
            source,
        })?;

    let tracker = MerkleRootChainTracker::from_hex_roots(&roots, config.accept_unconfirmed)?;
    info!(heights = tracker.known_heights(), "Loaded known merkle roots");
    Ok(tracker)
}
