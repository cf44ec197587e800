//! Domain entities for the overlay engine
//!
//! `Output` is the topic-scoped UTXO record persisted by storage.
//! `Admittance` is a topic manager's decision for one transaction.

use overlay_types::{Outpoint, TxId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A topic-scoped UTXO record.
///
/// `(outpoint, topic)` is the storage key: the same chain output may be
/// tracked independently under several topics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub outpoint: Outpoint,
    pub topic: String,
    #[serde(with = "overlay_types::hex_bytes")]
    pub locking_script: Vec<u8>,
    pub satoshis: u64,
    /// Transaction that spent this output, once observed.
    pub spent_by: Option<TxId>,
    /// Provenance ancestors: outputs the creating transaction retained.
    pub outputs_consumed: Vec<Outpoint>,
    /// Referrers: later outputs that retained this one as provenance.
    pub consumed_by: Vec<Outpoint>,
    /// 0 while unconfirmed.
    pub block_height: u32,
    pub block_index: u64,
    /// Raw creating transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Vec<u8>>,
}

impl Output {
    pub fn new(outpoint: Outpoint, topic: impl Into<String>, locking_script: Vec<u8>, satoshis: u64) -> Self {
        Self {
            outpoint,
            topic: topic.into(),
            locking_script,
            satoshis,
            spent_by: None,
            outputs_consumed: Vec::new(),
            consumed_by: Vec::new(),
            block_height: 0,
            block_index: 0,
            evidence: None,
        }
    }

    pub fn with_ancestors(mut self, ancestors: Vec<Outpoint>) -> Self {
        self.outputs_consumed = ancestors;
        self
    }

    pub fn with_block(mut self, height: u32, index: u64) -> Self {
        self.block_height = height;
        self.block_index = index;
        self
    }

    pub fn with_evidence(mut self, raw_tx: Vec<u8>) -> Self {
        self.evidence = Some(raw_tx);
        self
    }

    pub fn spent(&self) -> bool {
        self.spent_by.is_some()
    }

    /// No later output retains this one.
    pub fn is_unreferenced(&self) -> bool {
        self.consumed_by.is_empty()
    }

    pub fn is_confirmed(&self) -> bool {
        self.block_height > 0
    }
}

/// Idempotency marker: `txid` has been fully applied to `topic`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppliedTransaction {
    pub txid: TxId,
    pub topic: String,
}

impl AppliedTransaction {
    pub fn new(txid: TxId, topic: impl Into<String>) -> Self {
        Self {
            txid,
            topic: topic.into(),
        }
    }
}

/// A topic manager's decision for one transaction.
///
/// Indices refer to the current transaction: `outputs_to_admit` to its
/// outputs, `coins_to_retain` and `coins_removed` to its inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Admittance {
    pub outputs_to_admit: BTreeSet<u32>,
    pub coins_to_retain: BTreeSet<u32>,
    /// Filled in by the engine: inputs the topic knew about but did not retain.
    #[serde(default)]
    pub coins_removed: BTreeSet<u32>,
    /// Manager-defined data keyed by output index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ancillary: BTreeMap<u32, serde_json::Value>,
}

impl Admittance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(mut self, vout: u32) -> Self {
        self.outputs_to_admit.insert(vout);
        self
    }

    pub fn admit_all(mut self, vouts: impl IntoIterator<Item = u32>) -> Self {
        self.outputs_to_admit.extend(vouts);
        self
    }

    pub fn retain(mut self, input_index: u32) -> Self {
        self.coins_to_retain.insert(input_index);
        self
    }

    pub fn retain_all(mut self, input_indices: impl IntoIterator<Item = u32>) -> Self {
        self.coins_to_retain.extend(input_indices);
        self
    }

    pub fn with_ancillary(mut self, vout: u32, value: serde_json::Value) -> Self {
        self.ancillary.insert(vout, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.outputs_to_admit.is_empty() && self.coins_to_retain.is_empty()
    }
}

/// Result of a submission: requested topic → decision.
pub type TopicAdmittances = BTreeMap<String, Admittance>;

/// Callback fired once admittance is decided and before anything is committed.
pub type AdmittanceCallback = Box<dyn FnOnce(&TopicAdmittances) + Send>;

/// Descriptive metadata for a registered topic manager or lookup service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub name: String,
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ServiceMetadata {
    pub fn new(name: impl Into<String>, short_description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_description: short_description.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// A query addressed to one lookup service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupQuestion {
    pub service: String,
    pub query: serde_json::Value,
}

impl LookupQuestion {
    pub fn new(service: impl Into<String>, query: serde_json::Value) -> Self {
        Self {
            service: service.into(),
            query,
        }
    }
}

/// One `(outpoint, topic)` reference produced by a lookup service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaEntry {
    pub outpoint: Outpoint,
    pub topic: String,
}

/// Which stored outputs answer a lookup question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFormula {
    pub entries: Vec<FormulaEntry>,
}

impl LookupFormula {
    pub fn push(&mut self, outpoint: Outpoint, topic: impl Into<String>) {
        self.entries.push(FormulaEntry {
            outpoint,
            topic: topic.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hydrated lookup result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupAnswer {
    pub outputs: Vec<Output>,
}
