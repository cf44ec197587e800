//! Provenance commit and cascading deletion
//!
//! ## Commit (per requested topic)
//!
//! 1. Skip if `(txid, topic)` is already applied
//! 2. Prune inputs the topic knew about but did not retain
//! 3. Insert admitted outputs with the retained inputs as ancestors
//! 4. Add the admitted outpoints to each retained ancestor's `consumed_by`
//! 5. Write the applied marker
//!
//! ## Cascade
//!
//! Reference-counted deletion over the provenance graph. An output with no
//! referrers is deleted; either way, its reference is removed from each
//! ancestor that still lists it and that ancestor is examined next.
//! Records are fetched fresh from storage when examined.

use super::service::Engine;
use crate::algorithms::{merge_referrers, partition_inputs, remove_referrer};
use crate::domain::context::SubmitContext;
use crate::domain::entities::{Admittance, AppliedTransaction, Output};
use crate::domain::errors::EngineError;
use overlay_telemetry::{
    log_output_event, metric_inc, APPLIED_SKIPS, OUTPUTS_ADMITTED, OUTPUTS_PRUNED,
};
use overlay_types::Outpoint;
use std::collections::HashSet;
use tracing::{debug, info};

/// What one cascade did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Outputs deleted, in deletion order.
    pub deleted: Vec<Outpoint>,
    /// Referrer entries removed from ancestors.
    pub references_removed: usize,
}

impl Engine {
    /// Persist the decision for `topic`. Returns the admittance recorded for
    /// it (empty when the transaction was already applied).
    pub(super) async fn commit_topic(
        &self,
        ctx: &SubmitContext,
        topic: &str,
    ) -> Result<Admittance, EngineError> {
        let marker = AppliedTransaction::new(ctx.txid, topic);
        if self.storage.does_applied_transaction_exist(&marker).await? {
            debug!(txid = %ctx.txid, topic, "Already applied, skipping");
            metric_inc!(APPLIED_SKIPS, &[topic]);
            return Ok(Admittance::default());
        }

        let admittance = ctx.admittance(topic).cloned().unwrap_or_default();
        let inputs = ctx.inputs(topic).unwrap_or(&[]);
        let partition = partition_inputs(inputs, &admittance.coins_to_retain);
        let ancestors = partition.retained_outpoints();

        for removed in &partition.removed {
            self.cascade_delete(removed.outpoint, topic).await?;
        }

        let (block_height, block_index) = ctx
            .merkle_path
            .as_ref()
            .map(|path| (path.block_height, path.tx_index))
            .unwrap_or((0, 0));

        let mut admitted = Vec::with_capacity(admittance.outputs_to_admit.len());
        for &vout in &admittance.outputs_to_admit {
            let Some(tx_output) = ctx.transaction.outputs.get(vout as usize) else {
                continue;
            };
            let outpoint = Outpoint::new(ctx.txid, vout);
            let mut output = Output::new(
                outpoint,
                topic,
                tx_output.locking_script.clone(),
                tx_output.satoshis,
            )
            .with_ancestors(ancestors.clone())
            .with_block(block_height, block_index);
            if self.config.store_evidence {
                output = output.with_evidence(ctx.raw_tx.clone());
            }

            // A re-driven commit finds its earlier writes; lookup services
            // are still notified in case that notification was what failed.
            if self.storage.insert_output(&output).await? {
                metric_inc!(OUTPUTS_ADMITTED, &[topic]);
            } else {
                debug!(outpoint = %outpoint, topic, "Output already stored");
            }
            self.notify_output_added(&output).await?;
            admitted.push(outpoint);
        }

        if !admitted.is_empty() {
            for ancestor in &partition.retained {
                let Some(current) = self.storage.find_output(&ancestor.outpoint, topic).await?
                else {
                    continue;
                };
                if let Some(referrers) = merge_referrers(&current.consumed_by, &admitted) {
                    self.storage
                        .update_consumed_by(&ancestor.outpoint, topic, &referrers)
                        .await?;
                }
            }
        }

        self.storage.insert_applied_transaction(&marker).await?;

        info!(
            txid = %ctx.txid,
            topic,
            admitted = admitted.len(),
            retained = ancestors.len(),
            removed = partition.removed.len(),
            "Topic committed"
        );
        Ok(admittance)
    }

    /// Prune `start` under `topic` if nothing references it, then walk its
    /// ancestors one edge at a time.
    pub(super) async fn cascade_delete(
        &self,
        start: Outpoint,
        topic: &str,
    ) -> Result<CascadeReport, EngineError> {
        let mut report = CascadeReport::default();
        let mut worklist = vec![start];
        // (descendant, ancestor) edges already released
        let mut released: HashSet<(Outpoint, Outpoint)> = HashSet::new();

        while let Some(outpoint) = worklist.pop() {
            let Some(output) = self.storage.find_output(&outpoint, topic).await? else {
                continue;
            };

            if output.is_unreferenced() {
                self.storage.delete_output(&outpoint, topic).await?;
                self.notify_output_deleted(&outpoint, topic).await?;
                metric_inc!(OUTPUTS_PRUNED, &[topic]);
                log_output_event!(debug, "engine", "Output pruned", outpoint, topic);
                report.deleted.push(outpoint);
            }

            for ancestor_outpoint in &output.outputs_consumed {
                if !released.insert((outpoint, *ancestor_outpoint)) {
                    continue;
                }
                let Some(ancestor) = self.storage.find_output(ancestor_outpoint, topic).await?
                else {
                    continue;
                };
                let Some(remaining) = remove_referrer(&ancestor.consumed_by, &outpoint) else {
                    continue;
                };
                self.storage
                    .update_consumed_by(ancestor_outpoint, topic, &remaining)
                    .await?;
                report.references_removed += 1;
                worklist.push(*ancestor_outpoint);
            }
        }

        Ok(report)
    }

    async fn notify_output_added(&self, output: &Output) -> Result<(), EngineError> {
        for (name, service) in &self.lookup_services {
            service
                .output_added(output)
                .await
                .map_err(|source| EngineError::LookupService {
                    service: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn notify_output_deleted(&self, outpoint: &Outpoint, topic: &str) -> Result<(), EngineError> {
        for (name, service) in &self.lookup_services {
            service
                .output_deleted(outpoint, topic)
                .await
                .map_err(|source| EngineError::LookupService {
                    service: name.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}
