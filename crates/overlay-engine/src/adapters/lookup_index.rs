//! Topic index lookup service
//!
//! Keeps `topic -> outpoints` in memory from admission and deletion
//! notifications. Answers `{"topic": "<name>"}`, optionally with `"limit"`.

use crate::domain::entities::{LookupFormula, LookupQuestion, Output, ServiceMetadata};
use crate::domain::errors::LookupServiceError;
use crate::ports::outbound::LookupService;
use async_trait::async_trait;
use overlay_types::Outpoint;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory index of admitted outputs per topic.
pub struct IndexLookupService {
    name: String,
    index: RwLock<BTreeMap<String, BTreeSet<Outpoint>>>,
    added: AtomicU64,
    deleted: AtomicU64,
}

impl IndexLookupService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: RwLock::new(BTreeMap::new()),
            added: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
        }
    }

    /// Admission notifications received, duplicates included.
    pub fn added_count(&self) -> u64 {
        self.added.load(Ordering::SeqCst)
    }

    pub fn deleted_count(&self) -> u64 {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn indexed(&self, topic: &str) -> Vec<Outpoint> {
        self.index
            .read()
            .get(topic)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LookupService for IndexLookupService {
    async fn output_added(&self, output: &Output) -> Result<(), LookupServiceError> {
        self.added.fetch_add(1, Ordering::SeqCst);
        self.index
            .write()
            .entry(output.topic.clone())
            .or_default()
            .insert(output.outpoint);
        Ok(())
    }

    async fn output_deleted(
        &self,
        outpoint: &Outpoint,
        topic: &str,
    ) -> Result<(), LookupServiceError> {
        self.deleted.fetch_add(1, Ordering::SeqCst);
        let mut index = self.index.write();
        if let Some(set) = index.get_mut(topic) {
            set.remove(outpoint);
            if set.is_empty() {
                index.remove(topic);
            }
        }
        Ok(())
    }

    async fn lookup(&self, question: &LookupQuestion) -> Result<LookupFormula, LookupServiceError> {
        let topic = question
            .query
            .get("topic")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                LookupServiceError::UnsupportedQuery(format!(
                    "expected {{\"topic\": ...}}, got {}",
                    question.query
                ))
            })?;
        let limit = question
            .query
            .get("limit")
            .and_then(|l| l.as_u64())
            .map_or(usize::MAX, |l| l as usize);

        let mut formula = LookupFormula::default();
        for outpoint in self.indexed(topic).into_iter().take(limit) {
            formula.push(outpoint, topic);
        }
        Ok(formula)
    }

    fn metadata(&self) -> ServiceMetadata {
        ServiceMetadata::new(&self.name, "Lists admitted outputs by topic")
            .with_version(env!("CARGO_PKG_VERSION"))
    }
}
