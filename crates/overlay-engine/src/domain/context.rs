//! Per-submission working state
//!
//! A `SubmitContext` lives for exactly one `Engine::submit` call. Topic
//! managers see it through the read-only `AdmissionContext` view.

use overlay_types::{MerklePath, Outpoint, Transaction, TxId};
use std::collections::HashMap;

use super::entities::{Admittance, Output, TopicAdmittances};

/// Working state of one submission.
#[derive(Debug, Clone)]
pub struct SubmitContext {
    pub txid: TxId,
    pub transaction: Transaction,
    pub raw_tx: Vec<u8>,
    pub merkle_path: Option<MerklePath>,
    /// Decided topics, including dependencies not requested by the caller.
    topic_admittance: HashMap<String, Admittance>,
    /// Per topic, stored outputs aligned to the transaction's inputs.
    topic_inputs: HashMap<String, Vec<Option<Output>>>,
}

impl SubmitContext {
    pub fn new(transaction: Transaction, raw_tx: Vec<u8>, merkle_path: Option<MerklePath>) -> Self {
        Self {
            txid: transaction.txid(),
            transaction,
            raw_tx,
            merkle_path,
            topic_admittance: HashMap::new(),
            topic_inputs: HashMap::new(),
        }
    }

    pub fn is_resolved(&self, topic: &str) -> bool {
        self.topic_admittance.contains_key(topic)
    }

    pub fn admittance(&self, topic: &str) -> Option<&Admittance> {
        self.topic_admittance.get(topic)
    }

    pub fn inputs(&self, topic: &str) -> Option<&[Option<Output>]> {
        self.topic_inputs.get(topic).map(Vec::as_slice)
    }

    pub fn set_inputs(&mut self, topic: &str, inputs: Vec<Option<Output>>) {
        self.topic_inputs.insert(topic.to_string(), inputs);
    }

    pub fn record_admittance(&mut self, topic: &str, admittance: Admittance) {
        self.topic_admittance.insert(topic.to_string(), admittance);
    }

    /// Every input outpoint of the transaction, in input order.
    pub fn input_outpoints(&self) -> Vec<Outpoint> {
        self.transaction.input_outpoints()
    }

    /// Decisions for the requested topics only.
    pub fn admittances_for(&self, topics: &[String]) -> TopicAdmittances {
        topics
            .iter()
            .filter_map(|topic| {
                self.topic_admittance
                    .get(topic)
                    .map(|admittance| (topic.clone(), admittance.clone()))
            })
            .collect()
    }

    pub fn admission_view<'a>(&'a self, topic: &'a str) -> AdmissionContext<'a> {
        AdmissionContext {
            topic,
            submit: self,
        }
    }
}

/// Read-only view handed to a topic manager.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionContext<'a> {
    topic: &'a str,
    submit: &'a SubmitContext,
}

impl<'a> AdmissionContext<'a> {
    /// Topic being decided.
    pub fn topic(&self) -> &'a str {
        self.topic
    }

    pub fn txid(&self) -> TxId {
        self.submit.txid
    }

    pub fn transaction(&self) -> &'a Transaction {
        &self.submit.transaction
    }

    pub fn merkle_path(&self) -> Option<&'a MerklePath> {
        self.submit.merkle_path.as_ref()
    }

    /// This topic's stored records for each input; `None` where unknown.
    pub fn inputs(&self) -> &'a [Option<Output>] {
        self.submit.inputs(self.topic).unwrap_or(&[])
    }

    /// Another topic's stored records for each input, if it has been resolved.
    pub fn inputs_for(&self, topic: &str) -> Option<&'a [Option<Output>]> {
        self.submit.inputs(topic)
    }

    /// Decision already made for another topic (a declared dependency).
    pub fn admittance_for(&self, topic: &str) -> Option<&'a Admittance> {
        self.submit.admittance(topic)
    }
}
