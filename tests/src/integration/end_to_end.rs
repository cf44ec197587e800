//! # End-to-End Scenarios
//!
//! Multi-transaction chains driven through the public engine API:
//!
//! ```text
//! T1 ──O1──▶ T2 (retains O1) ──O2──▶ T3 (drops O2)
//!                                     │
//!                                     └─ prunes O2, then O1
//! ```

#[cfg(test)]
mod tests {
    use crate::integration::support::*;
    use overlay_engine::adapters::MerkleRootChainTracker;
    use overlay_engine::{
        Admittance, EngineError, ErrorKind, LookupQuestion, OverlayEngineApi,
    };
    use overlay_types::{hash_pair, MerklePath, PathNode, SiblingPosition, SubmitMode};
    use serde_json::json;
    use std::sync::Arc;

    /// Retains every known input except on transactions with lock time 3.
    fn chain_manager() -> FnTopicManager {
        FnTopicManager::new(TOPIC, |ctx| {
            let admit = Admittance::new().admit_all(0..ctx.transaction().outputs.len() as u32);
            if ctx.transaction().lock_time == 3 {
                return admit;
            }
            admit.retain_all(
                ctx.inputs()
                    .iter()
                    .enumerate()
                    .filter(|(_, input)| input.is_some())
                    .map(|(index, _)| index as u32),
            )
        })
    }

    #[tokio::test]
    async fn test_three_transaction_chain() {
        let harness = Harness::new(vec![chain_manager()]);
        let t1 = tx(1, &[], 1);
        let o1 = outpoint(&t1, 0);
        let t2 = tx(2, &[o1], 1);
        let o2 = outpoint(&t2, 0);
        let t3 = tx(3, &[o2], 1);

        harness.submit(&t1, &[TOPIC]).await.unwrap();
        let stored_o1 = harness.output(&o1).unwrap();
        assert!(stored_o1.outputs_consumed.is_empty());

        harness.submit(&t2, &[TOPIC]).await.unwrap();
        assert_eq!(harness.output(&o1).unwrap().consumed_by, vec![o2]);
        assert_eq!(harness.output(&o2).unwrap().outputs_consumed, vec![o1]);

        let result = harness.submit(&t3, &[TOPIC]).await.unwrap();
        assert_eq!(
            result[TOPIC].coins_removed.iter().copied().collect::<Vec<_>>(),
            vec![0]
        );

        assert!(harness.output(&o2).is_none());
        assert!(harness.output(&o1).is_none());
        assert!(harness.output(&outpoint(&t3, 0)).is_some());
        assert_eq!(
            harness.lookup.deleted(),
            vec![(o2, TOPIC.to_string()), (o1, TOPIC.to_string())]
        );
    }

    #[tokio::test]
    async fn test_long_chain_pruned_in_one_cascade() {
        let harness = Harness::new(vec![chain_manager()]);
        let mut previous = tx(10, &[], 1);
        harness.submit(&previous, &[TOPIC]).await.unwrap();

        for seed in 11..40 {
            let next = tx(seed, &[outpoint(&previous, 0)], 1);
            harness.submit(&next, &[TOPIC]).await.unwrap();
            previous = next;
        }
        assert_eq!(harness.storage.stats().outputs, 30);

        let tail = tx(3, &[outpoint(&previous, 0)], 0);
        harness.submit(&tail, &[TOPIC]).await.unwrap();

        assert_eq!(harness.storage.stats().outputs, 0);
        assert_eq!(harness.lookup.deleted().len(), 30);
    }

    #[tokio::test]
    async fn test_lookup_hydrates_from_storage() {
        let harness = Harness::new(vec![chain_manager()]);
        let t1 = tx(1, &[], 2);
        harness.submit(&t1, &[TOPIC]).await.unwrap();

        let answer = harness
            .engine
            .lookup(LookupQuestion::new("ls_recording", json!({"topic": TOPIC})))
            .await
            .unwrap();
        assert_eq!(answer.outputs.len(), 2);
        assert!(answer.outputs.iter().all(|o| o.evidence.is_some()));

        // Index still lists pruned outputs; hydration drops them
        let t2 = tx(3, &[outpoint(&t1, 0)], 0);
        harness.submit(&t2, &[TOPIC]).await.unwrap();
        let answer = harness
            .engine
            .lookup(LookupQuestion::new("ls_recording", json!({"topic": TOPIC})))
            .await
            .unwrap();
        assert_eq!(answer.outputs.len(), 1);

        let err = harness
            .engine
            .lookup(LookupQuestion::new("ls_missing", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownService);
    }

    #[tokio::test]
    async fn test_confirmation_via_merkle_proof() {
        let tracker = Arc::new(MerkleRootChainTracker::new(true));
        let harness = Harness::with_collaborators(
            vec![chain_manager()],
            tracker.clone(),
            CountingBroadcaster::default(),
        );
        let t1 = tx(1, &[], 2);
        let txid = t1.txid();

        harness.submit(&t1, &[TOPIC]).await.unwrap();
        assert!(!harness.output(&outpoint(&t1, 0)).unwrap().is_confirmed());

        let sibling = [7u8; 32];
        let proof = MerklePath::new(
            812_000,
            4,
            vec![PathNode {
                hash: sibling,
                position: SiblingPosition::Right,
            }],
        );

        // Root not known yet
        let err = harness
            .engine
            .handle_new_merkle_proof(txid, proof.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransaction { .. }));

        tracker.add_root(812_000, hash_pair(txid.as_bytes(), &sibling));
        let updated = harness
            .engine
            .handle_new_merkle_proof(txid, proof)
            .await
            .unwrap();

        assert_eq!(updated, 2);
        let stored = harness.output(&outpoint(&t1, 1)).unwrap();
        assert_eq!((stored.block_height, stored.block_index), (812_000, 4));
    }

    #[tokio::test]
    async fn test_confirmed_submission_records_block_position() {
        let tracker = Arc::new(MerkleRootChainTracker::new(false));
        let harness = Harness::with_collaborators(
            vec![chain_manager()],
            tracker.clone(),
            CountingBroadcaster::default(),
        );
        let t1 = tx(1, &[], 1);
        let sibling = [9u8; 32];
        tracker.add_root(100, hash_pair(&sibling, t1.txid().as_bytes()));
        let proof = MerklePath::new(
            100,
            1,
            vec![PathNode {
                hash: sibling,
                position: SiblingPosition::Left,
            }],
        );

        harness
            .engine
            .submit(
                tagged(&t1, &[TOPIC]).with_merkle_path(proof),
                SubmitMode::Historical,
                None,
            )
            .await
            .unwrap();

        let stored = harness.output(&outpoint(&t1, 0)).unwrap();
        assert!(stored.is_confirmed());
        assert_eq!(stored.block_index, 1);
    }

    #[tokio::test]
    async fn test_metrics_exported() {
        overlay_telemetry::register_metrics().unwrap();
        let harness = Harness::new(vec![chain_manager()]);
        harness.submit(&tx(1, &[], 1), &[TOPIC]).await.unwrap();
        harness.submit(&tx(1, &[], 1), &[TOPIC]).await.unwrap();

        let text = overlay_telemetry::gather_metrics().unwrap();
        assert!(text.contains("overlay_engine_submissions_total"));
        assert!(text.contains("overlay_engine_applied_skips_total"));
    }

    #[tokio::test]
    async fn test_registered_services_listed() {
        let harness = Harness::new(vec![chain_manager(), FnTopicManager::retaining("tm_y")]);

        let managers = harness.engine.list_topic_managers();
        assert_eq!(managers.keys().collect::<Vec<_>>(), vec![TOPIC, "tm_y"]);
        assert_eq!(
            harness.engine.list_lookup_services()["ls_recording"].short_description,
            "Records notifications"
        );
    }
}
