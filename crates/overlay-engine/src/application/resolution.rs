//! Topic resolution
//!
//! Runs each topic manager at most once per submission, dependencies first,
//! and marks the transaction's inputs spent under every topic it resolves.

use super::service::Engine;
use crate::algorithms::{dangling_retains, partition_inputs, resolution_order};
use crate::domain::context::SubmitContext;
use crate::domain::entities::Admittance;
use crate::domain::errors::{EngineError, StorageError};
use tracing::debug;

impl Engine {
    /// Decide `topic` and everything it depends on.
    pub(super) async fn resolve_topic(
        &self,
        ctx: &mut SubmitContext,
        topic: &str,
    ) -> Result<(), EngineError> {
        let order = resolution_order(
            topic,
            |t| ctx.is_resolved(t),
            |t| self.topic_managers.get(t).map(|m| m.dependencies()),
            self.config.max_dependency_depth,
        )?;

        for next in order {
            self.execute_topic_manager(ctx, &next).await?;
        }
        Ok(())
    }

    async fn execute_topic_manager(
        &self,
        ctx: &mut SubmitContext,
        topic: &str,
    ) -> Result<(), EngineError> {
        let manager = self
            .topic_managers
            .get(topic)
            .ok_or_else(|| EngineError::UnknownTopic {
                topic: topic.to_string(),
            })?;

        let outpoints = ctx.input_outpoints();
        let inputs = self
            .storage
            .find_outputs(&outpoints, topic, None, false)
            .await
            .map_err(|source| EngineError::ResolutionStorage {
                topic: topic.to_string(),
                source,
            })?;
        if inputs.len() != outpoints.len() {
            return Err(EngineError::ResolutionStorage {
                topic: topic.to_string(),
                source: StorageError::Misaligned {
                    topic: topic.to_string(),
                    expected: outpoints.len(),
                    actual: inputs.len(),
                },
            });
        }
        ctx.set_inputs(topic, inputs);

        let mut admittance = manager
            .identify_admissible_outputs(&ctx.admission_view(topic))
            .await
            .map_err(|source| EngineError::TopicManager {
                topic: topic.to_string(),
                source,
            })?;
        validate_admittance(ctx, topic, &admittance)?;

        let inputs = ctx.inputs(topic).unwrap_or(&[]);
        let ignored = dangling_retains(inputs, &admittance.coins_to_retain);
        if !ignored.is_empty() {
            debug!(topic, indices = ?ignored, "Retained inputs unknown to topic, ignoring");
        }
        admittance.coins_removed = partition_inputs(inputs, &admittance.coins_to_retain).removed_indices;

        debug!(
            txid = %ctx.txid,
            topic,
            admit = admittance.outputs_to_admit.len(),
            retain = admittance.coins_to_retain.len(),
            removed = admittance.coins_removed.len(),
            "Topic admittance decided"
        );
        ctx.record_admittance(topic, admittance);

        // Dependents resolved later in this submission must see these as spent
        if !outpoints.is_empty() {
            self.storage
                .mark_outpoints_spent(&outpoints, topic, &ctx.txid)
                .await
                .map_err(|source| EngineError::ResolutionStorage {
                    topic: topic.to_string(),
                    source,
                })?;
        }

        Ok(())
    }
}

fn validate_admittance(
    ctx: &SubmitContext,
    topic: &str,
    admittance: &Admittance,
) -> Result<(), EngineError> {
    let output_count = ctx.transaction.outputs.len();
    if let Some(&vout) = admittance
        .outputs_to_admit
        .iter()
        .find(|&&vout| vout as usize >= output_count)
    {
        return Err(EngineError::InvalidAdmittance {
            topic: topic.to_string(),
            reason: format!("output {vout} of {output_count}"),
        });
    }

    let input_count = ctx.transaction.inputs.len();
    if let Some(&index) = admittance
        .coins_to_retain
        .iter()
        .find(|&&index| index as usize >= input_count)
    {
        return Err(EngineError::InvalidAdmittance {
            topic: topic.to_string(),
            reason: format!("input {index} of {input_count}"),
        });
    }

    Ok(())
}
