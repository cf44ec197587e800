//! In-memory overlay storage
//!
//! Every operation takes the lock once, so inserts are idempotent and
//! spent-marking is atomic per call under concurrent submissions.

use crate::domain::entities::{AppliedTransaction, Output};
use crate::domain::errors::StorageError;
use crate::ports::outbound::OverlayStorage;
use async_trait::async_trait;
use overlay_types::{Outpoint, TxId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type OutputKey = (Outpoint, String);

#[derive(Default)]
struct StorageState {
    outputs: HashMap<OutputKey, Output>,
    applied: HashSet<AppliedTransaction>,
}

/// Counters describing the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub outputs: usize,
    pub applied: usize,
    /// Mutating calls received, including no-ops.
    pub write_ops: u64,
}

/// `OverlayStorage` backed by hash maps.
pub struct InMemoryStorage {
    state: RwLock<StorageState>,
    write_ops: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StorageState::default()),
            write_ops: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every call fail with a backend error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stored record including evidence.
    pub fn get(&self, outpoint: &Outpoint, topic: &str) -> Option<Output> {
        self.state
            .read()
            .outputs
            .get(&(*outpoint, topic.to_string()))
            .cloned()
    }

    pub fn is_applied(&self, txid: &TxId, topic: &str) -> bool {
        self.state
            .read()
            .applied
            .contains(&AppliedTransaction::new(*txid, topic))
    }

    pub fn stats(&self) -> StorageStats {
        let state = self.state.read();
        StorageStats {
            outputs: state.outputs.len(),
            applied: state.applied.len(),
            write_ops: self.write_ops.load(Ordering::SeqCst),
        }
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("storage unavailable".to_string()));
        }
        Ok(())
    }

    fn begin_write(&self) -> Result<(), StorageError> {
        self.check_available()?;
        self.write_ops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn present(output: &Output, include_evidence: bool) -> Output {
    let mut output = output.clone();
    if !include_evidence {
        output.evidence = None;
    }
    output
}

#[async_trait]
impl OverlayStorage for InMemoryStorage {
    async fn find_outputs(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent: Option<bool>,
        include_evidence: bool,
    ) -> Result<Vec<Option<Output>>, StorageError> {
        self.check_available()?;
        let state = self.state.read();
        Ok(outpoints
            .iter()
            .map(|outpoint| {
                state
                    .outputs
                    .get(&(*outpoint, topic.to_string()))
                    .filter(|output| spent.map_or(true, |s| output.spent() == s))
                    .map(|output| present(output, include_evidence))
            })
            .collect())
    }

    async fn find_outputs_for_transaction(
        &self,
        txid: &TxId,
        include_evidence: bool,
    ) -> Result<Vec<Output>, StorageError> {
        self.check_available()?;
        let state = self.state.read();
        let mut found: Vec<Output> = state
            .outputs
            .values()
            .filter(|output| output.outpoint.txid == *txid)
            .map(|output| present(output, include_evidence))
            .collect();
        found.sort_by(|a, b| (&a.topic, a.outpoint).cmp(&(&b.topic, b.outpoint)));
        Ok(found)
    }

    async fn find_utxos_for_topic(&self, topic: &str) -> Result<Vec<Output>, StorageError> {
        self.check_available()?;
        let state = self.state.read();
        let mut found: Vec<Output> = state
            .outputs
            .values()
            .filter(|output| output.topic == topic && !output.spent())
            .map(|output| present(output, false))
            .collect();
        found.sort_by_key(|output| output.outpoint);
        Ok(found)
    }

    async fn insert_output(&self, output: &Output) -> Result<bool, StorageError> {
        self.begin_write()?;
        let mut state = self.state.write();
        let key = (output.outpoint, output.topic.clone());
        if state.outputs.contains_key(&key) {
            return Ok(false);
        }
        state.outputs.insert(key, output.clone());
        Ok(true)
    }

    async fn delete_output(&self, outpoint: &Outpoint, topic: &str) -> Result<(), StorageError> {
        self.begin_write()?;
        self.state
            .write()
            .outputs
            .remove(&(*outpoint, topic.to_string()));
        Ok(())
    }

    async fn mark_outpoints_spent(
        &self,
        outpoints: &[Outpoint],
        topic: &str,
        spent_by: &TxId,
    ) -> Result<(), StorageError> {
        self.begin_write()?;
        let mut state = self.state.write();
        for outpoint in outpoints {
            if let Some(output) = state.outputs.get_mut(&(*outpoint, topic.to_string())) {
                output.spent_by = Some(*spent_by);
            }
        }
        Ok(())
    }

    async fn update_consumed_by(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        consumed_by: &[Outpoint],
    ) -> Result<(), StorageError> {
        self.begin_write()?;
        if let Some(output) = self
            .state
            .write()
            .outputs
            .get_mut(&(*outpoint, topic.to_string()))
        {
            output.consumed_by = consumed_by.to_vec();
        }
        Ok(())
    }

    async fn update_output_block_height(
        &self,
        outpoint: &Outpoint,
        topic: &str,
        block_height: u32,
        block_index: u64,
    ) -> Result<(), StorageError> {
        self.begin_write()?;
        if let Some(output) = self
            .state
            .write()
            .outputs
            .get_mut(&(*outpoint, topic.to_string()))
        {
            output.block_height = block_height;
            output.block_index = block_index;
        }
        Ok(())
    }

    async fn insert_applied_transaction(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<(), StorageError> {
        self.begin_write()?;
        self.state.write().applied.insert(applied.clone());
        Ok(())
    }

    async fn does_applied_transaction_exist(
        &self,
        applied: &AppliedTransaction,
    ) -> Result<bool, StorageError> {
        self.check_available()?;
        Ok(self.state.read().applied.contains(applied))
    }
}
