//! # Provenance Bookkeeping
//!
//! Referrer accounting between retained ancestors and the outputs that
//! consume them, and reference-counted pruning when a referrer goes away.

#[cfg(test)]
mod tests {
    use crate::integration::support::*;
    use overlay_engine::Admittance;
    use overlay_types::Transaction;

    /// Lock times at or above this release their inputs instead of retaining.
    const RELEASE: u32 = 1_000;

    fn policy() -> FnTopicManager {
        FnTopicManager::new(TOPIC, |ctx| {
            let admit = Admittance::new().admit_all(0..ctx.transaction().outputs.len() as u32);
            if ctx.transaction().lock_time >= RELEASE {
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

    fn spend(seed: u32, inputs: &[&Transaction], outputs: usize) -> Transaction {
        let sources: Vec<_> = inputs.iter().map(|t| outpoint(t, 0)).collect();
        tx(seed, &sources, outputs)
    }

    #[tokio::test]
    async fn test_retained_ancestor_lists_referrer() {
        let harness = Harness::new(vec![policy()]);
        let t1 = tx(1, &[], 1);
        let t2 = spend(2, &[&t1], 1);

        harness.submit(&t1, &[TOPIC]).await.unwrap();
        harness.submit(&t2, &[TOPIC]).await.unwrap();

        let o1 = harness.output(&outpoint(&t1, 0)).unwrap();
        let o2 = harness.output(&outpoint(&t2, 0)).unwrap();
        assert_eq!(o1.consumed_by, vec![o2.outpoint]);
        assert_eq!(o1.spent_by, Some(t2.txid()));
        assert_eq!(o2.outputs_consumed, vec![o1.outpoint]);
        assert!(o2.consumed_by.is_empty());
    }

    #[tokio::test]
    async fn test_ancestor_survives_until_last_referrer_removed() {
        let harness = Harness::new(vec![policy()]);
        let t1 = tx(1, &[], 1);
        // Two outputs, both referring back to t1:0
        let t2 = spend(2, &[&t1], 2);

        harness.submit(&t1, &[TOPIC]).await.unwrap();
        harness.submit(&t2, &[TOPIC]).await.unwrap();
        let a = outpoint(&t1, 0);
        assert_eq!(harness.output(&a).unwrap().consumed_by.len(), 2);

        let t3 = tx(RELEASE, &[outpoint(&t2, 0)], 1);
        harness.submit(&t3, &[TOPIC]).await.unwrap();

        assert!(harness.output(&outpoint(&t2, 0)).is_none());
        assert_eq!(harness.output(&a).unwrap().consumed_by, vec![outpoint(&t2, 1)]);

        let t4 = tx(RELEASE + 1, &[outpoint(&t2, 1)], 1);
        harness.submit(&t4, &[TOPIC]).await.unwrap();

        assert!(harness.output(&outpoint(&t2, 1)).is_none());
        assert!(harness.output(&a).is_none());
        let deleted: Vec<_> = harness.lookup.deleted().into_iter().map(|(o, _)| o).collect();
        assert_eq!(deleted, vec![outpoint(&t2, 0), outpoint(&t2, 1), a]);
    }

    #[tokio::test]
    async fn test_merge_of_two_lineages() {
        let harness = Harness::new(vec![policy()]);
        let left = tx(1, &[], 1);
        let right = tx(2, &[], 1);
        let merged = spend(3, &[&left, &right], 1);

        for t in [&left, &right, &merged] {
            harness.submit(t, &[TOPIC]).await.unwrap();
        }
        let m = outpoint(&merged, 0);
        assert_eq!(
            harness.output(&m).unwrap().outputs_consumed,
            vec![outpoint(&left, 0), outpoint(&right, 0)]
        );

        let release = tx(RELEASE, &[m], 0);
        harness.submit(&release, &[TOPIC]).await.unwrap();

        assert_eq!(harness.storage.stats().outputs, 0);
    }

    #[tokio::test]
    async fn test_referenced_output_not_deleted_when_released() {
        let harness = Harness::new(vec![policy()]);
        let t1 = tx(1, &[], 1);
        let t2 = spend(2, &[&t1], 1);
        harness.submit(&t1, &[TOPIC]).await.unwrap();
        harness.submit(&t2, &[TOPIC]).await.unwrap();

        // t1:0 is still listed as provenance of t2:0
        let again = tx(RELEASE, &[outpoint(&t1, 0)], 0);
        harness.submit(&again, &[TOPIC]).await.unwrap();

        assert!(harness.output(&outpoint(&t1, 0)).is_some());
        assert!(harness.lookup.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_inputs_unknown_to_topic_are_not_provenance() {
        let harness = Harness::new(vec![FnTopicManager::new(TOPIC, |_| {
            Admittance::new().admit(0).retain(0)
        })]);
        let foreign = tx(1, &[], 1);
        let t2 = spend(2, &[&foreign], 1);

        harness.submit(&t2, &[TOPIC]).await.unwrap();

        let o2 = harness.output(&outpoint(&t2, 0)).unwrap();
        assert!(o2.outputs_consumed.is_empty());
        assert!(harness.output(&outpoint(&foreign, 0)).is_none());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let harness = Harness::new(vec![
            FnTopicManager::retaining("tm_a"),
            FnTopicManager::releasing("tm_b"),
        ]);
        let t1 = tx(1, &[], 1);
        let t2 = spend(2, &[&t1], 1);

        harness.submit(&t1, &["tm_a", "tm_b"]).await.unwrap();
        harness.submit(&t2, &["tm_a", "tm_b"]).await.unwrap();

        let o1 = outpoint(&t1, 0);
        let kept = harness.storage.get(&o1, "tm_a").unwrap();
        assert_eq!(kept.consumed_by, vec![outpoint(&t2, 0)]);
        assert!(harness.storage.get(&o1, "tm_b").is_none());
        assert_eq!(harness.lookup.deleted(), vec![(o1, "tm_b".to_string())]);
    }

    #[tokio::test]
    async fn test_dependency_topic_inputs_marked_spent() {
        let harness = Harness::new(vec![
            FnTopicManager::retaining("tm_a"),
            FnTopicManager::retaining("tm_b").with_dependencies(&["tm_a"]),
        ]);
        let t1 = tx(1, &[], 1);
        let t2 = spend(2, &[&t1], 1);

        harness.submit(&t1, &["tm_a"]).await.unwrap();
        harness.submit(&t2, &["tm_b"]).await.unwrap();

        let o1 = harness.storage.get(&outpoint(&t1, 0), "tm_a").unwrap();
        assert_eq!(o1.spent_by, Some(t2.txid()));
        // tm_a was only resolved, not committed: no referrer was added
        assert!(o1.consumed_by.is_empty());
    }

    #[tokio::test]
    async fn test_outputs_keep_evidence() {
        let harness = Harness::new(vec![policy()]);
        let t1 = tx(1, &[], 1);

        harness.submit(&t1, &[TOPIC]).await.unwrap();

        let stored = harness.output(&outpoint(&t1, 0)).unwrap();
        assert_eq!(stored.evidence, Some(t1.to_bytes()));
        assert_eq!(stored.satoshis, 1_000);
        assert!(!stored.is_confirmed());
    }
}
