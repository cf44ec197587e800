//! Provenance bookkeeping
//!
//! Pure helpers over the referrer (`consumed_by`) lists and a transaction's
//! resolved inputs. Storage access stays in the application layer.

use crate::domain::entities::Output;
use overlay_types::Outpoint;
use std::collections::BTreeSet;

/// A topic's resolved inputs split by the manager's retain decision.
#[derive(Debug, Default)]
pub struct InputPartition<'a> {
    /// Kept as provenance of every admitted output.
    pub retained: Vec<&'a Output>,
    /// Known to the topic but not retained: pruning candidates.
    pub removed: Vec<&'a Output>,
    pub removed_indices: BTreeSet<u32>,
}

impl InputPartition<'_> {
    pub fn retained_outpoints(&self) -> Vec<Outpoint> {
        self.retained.iter().map(|o| o.outpoint).collect()
    }
}

/// Split `inputs` by `coins_to_retain`. `None` inputs are neither.
pub fn partition_inputs<'a>(
    inputs: &'a [Option<Output>],
    coins_to_retain: &BTreeSet<u32>,
) -> InputPartition<'a> {
    let mut partition = InputPartition::default();
    for (index, input) in inputs.iter().enumerate() {
        let Some(output) = input else { continue };
        let index = index as u32;
        if coins_to_retain.contains(&index) {
            partition.retained.push(output);
        } else {
            partition.removed.push(output);
            partition.removed_indices.insert(index);
        }
    }
    partition
}

/// Indices in `coins_to_retain` that do not point at a known input.
pub fn dangling_retains(inputs: &[Option<Output>], coins_to_retain: &BTreeSet<u32>) -> Vec<u32> {
    coins_to_retain
        .iter()
        .copied()
        .filter(|&i| !matches!(inputs.get(i as usize), Some(Some(_))))
        .collect()
}

/// `existing` plus each of `added` not already present, order preserved.
///
/// `None` when nothing changes.
pub fn merge_referrers(existing: &[Outpoint], added: &[Outpoint]) -> Option<Vec<Outpoint>> {
    let mut merged = existing.to_vec();
    for outpoint in added {
        if !merged.contains(outpoint) {
            merged.push(*outpoint);
        }
    }
    (merged.len() != existing.len()).then_some(merged)
}

/// `existing` with one occurrence of `referrer` removed.
///
/// `None` when `referrer` is not listed.
pub fn remove_referrer(existing: &[Outpoint], referrer: &Outpoint) -> Option<Vec<Outpoint>> {
    let position = existing.iter().position(|o| o == referrer)?;
    let mut remaining = existing.to_vec();
    remaining.remove(position);
    Some(remaining)
}
