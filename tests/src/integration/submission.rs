//! # Submission Pipeline
//!
//! Gates and ordering of `Engine::submit`:
//!
//! 1. Unknown topics are rejected before any side effect
//! 2. Parse and verification failures write nothing and broadcast nothing
//! 3. A rejected broadcast aborts before commit
//! 4. The admittance callback fires before commit
//! 5. Dependencies are decided before their dependents, each exactly once
//! 6. Resubmission is idempotent

#[cfg(test)]
mod tests {
    use crate::integration::support::*;
    use overlay_engine::adapters::MerkleRootChainTracker;
    use overlay_engine::{Admittance, EngineError, ErrorKind, OverlayEngineApi, TopicAdmittances};
    use overlay_types::{SubmitMode, TaggedTransaction};
    use parking_lot::Mutex;
    use std::sync::Arc;

    // =========================================================================
    // GATES
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_topic_writes_nothing() {
        let harness = Harness::new(vec![FnTopicManager::retaining(TOPIC)]);
        let t1 = tx(1, &[], 1);

        let err = harness.submit(&t1, &[TOPIC, "tm_missing"]).await.unwrap_err();

        assert!(matches!(err, EngineError::UnknownTopic { ref topic } if topic == "tm_missing"));
        assert_eq!(err.kind(), ErrorKind::UnknownTopic);
        assert_eq!(harness.storage.stats().write_ops, 0);
        assert_eq!(harness.broadcaster.count(), 0);
        assert!(harness.lookup.added().is_empty());
    }

    #[tokio::test]
    async fn test_failed_verification_writes_nothing() {
        let harness = Harness::with_collaborators(
            vec![FnTopicManager::retaining(TOPIC)],
            Arc::new(MerkleRootChainTracker::new(false)),
            CountingBroadcaster::default(),
        );
        let t1 = tx(1, &[], 1);

        let err = harness.submit(&t1, &[TOPIC]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidTransaction);
        assert_eq!(harness.storage.stats().write_ops, 0);
        assert_eq!(harness.broadcaster.count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_transaction_rejected() {
        let harness = Harness::new(vec![FnTopicManager::retaining(TOPIC)]);
        let mut raw = tx(1, &[], 1).to_bytes();
        raw.push(0x00);

        let err = harness
            .engine
            .submit(
                TaggedTransaction::new(raw, vec![TOPIC.to_string()]),
                SubmitMode::Current,
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Parse(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidTransaction);
        assert_eq!(harness.storage.stats().write_ops, 0);
    }

    #[tokio::test]
    async fn test_rejected_broadcast_aborts_before_commit() {
        let harness = Harness::with_collaborators(
            vec![FnTopicManager::retaining(TOPIC)],
            Arc::new(MerkleRootChainTracker::new(true)),
            CountingBroadcaster::rejecting(),
        );
        let t1 = tx(1, &[], 2);

        let err = harness.submit(&t1, &[TOPIC]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BroadcastFailure);
        assert_eq!(harness.broadcaster.count(), 1);
        assert_eq!(harness.storage.stats().outputs, 0);
        assert!(!harness.storage.is_applied(&t1.txid(), TOPIC));
        assert!(harness.lookup.added().is_empty());
    }

    #[tokio::test]
    async fn test_historical_mode_skips_broadcast() {
        let harness = Harness::with_collaborators(
            vec![FnTopicManager::retaining(TOPIC)],
            Arc::new(MerkleRootChainTracker::new(true)),
            CountingBroadcaster::rejecting(),
        );
        let t1 = tx(1, &[], 1);

        harness
            .engine
            .submit(tagged(&t1, &[TOPIC]), SubmitMode::Historical, None)
            .await
            .unwrap();

        assert_eq!(harness.broadcaster.count(), 0);
        assert!(harness.output(&outpoint(&t1, 0)).is_some());
    }

    // =========================================================================
    // ORDERING
    // =========================================================================

    #[tokio::test]
    async fn test_callback_fires_before_commit() {
        let harness = Harness::new(vec![FnTopicManager::retaining(TOPIC)]);
        let t1 = tx(1, &[], 2);

        let observed: Arc<Mutex<Option<(usize, TopicAdmittances)>>> = Arc::new(Mutex::new(None));
        let storage = harness.storage.clone();
        let sink = observed.clone();

        let committed = harness
            .engine
            .submit(
                tagged(&t1, &[TOPIC]),
                SubmitMode::Current,
                Some(Box::new(move |admittances: &TopicAdmittances| {
                    *sink.lock() = Some((storage.stats().outputs, admittances.clone()));
                })),
            )
            .await
            .unwrap();

        let (outputs_at_callback, seen) = observed.lock().take().unwrap();
        assert_eq!(outputs_at_callback, 0);
        assert_eq!(seen, committed);
        assert_eq!(harness.storage.stats().outputs, 2);
    }

    #[tokio::test]
    async fn test_dependency_decided_first_and_visible() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let saw_dependency = Arc::new(Mutex::new(false));

        let flag = saw_dependency.clone();
        let dependent = FnTopicManager::new("tm_b", move |ctx| {
            *flag.lock() = ctx.admittance_for("tm_a").is_some();
            Admittance::new().admit(0)
        })
        .with_dependencies(&["tm_a"])
        .with_log(log.clone());

        let harness = Harness::new(vec![
            FnTopicManager::retaining("tm_a").with_log(log.clone()),
            dependent,
        ]);
        let t1 = tx(1, &[], 1);

        let committed = harness.submit(&t1, &["tm_b"]).await.unwrap();

        assert_eq!(*log.lock(), vec!["tm_a", "tm_b"]);
        assert!(*saw_dependency.lock());
        // Only requested topics are returned and committed
        assert_eq!(committed.keys().collect::<Vec<_>>(), vec!["tm_b"]);
        assert!(harness.storage.is_applied(&t1.txid(), "tm_b"));
        assert!(!harness.storage.is_applied(&t1.txid(), "tm_a"));
    }

    #[tokio::test]
    async fn test_shared_dependency_runs_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let harness = Harness::new(vec![
            FnTopicManager::retaining("tm_base").with_log(log.clone()),
            FnTopicManager::retaining("tm_a")
                .with_dependencies(&["tm_base"])
                .with_log(log.clone()),
            FnTopicManager::retaining("tm_b")
                .with_dependencies(&["tm_base"])
                .with_log(log.clone()),
            FnTopicManager::retaining("tm_c")
                .with_dependencies(&["tm_a", "tm_b"])
                .with_log(log.clone()),
        ]);
        let t1 = tx(1, &[], 1);

        harness.submit(&t1, &["tm_c", "tm_a"]).await.unwrap();

        assert_eq!(*log.lock(), vec!["tm_base", "tm_a", "tm_b", "tm_c"]);
    }

    #[tokio::test]
    async fn test_cyclic_dependencies_rejected() {
        let harness = Harness::new(vec![
            FnTopicManager::retaining("tm_a").with_dependencies(&["tm_b"]),
            FnTopicManager::retaining("tm_b").with_dependencies(&["tm_a"]),
        ]);
        let t1 = tx(1, &[], 1);

        let err = harness.submit(&t1, &["tm_a"]).await.unwrap_err();

        assert!(matches!(err, EngineError::CyclicDependency { .. }));
        assert_eq!(err.kind(), ErrorKind::DependencyFailure);
        assert_eq!(harness.storage.stats().outputs, 0);
    }

    #[tokio::test]
    async fn test_out_of_range_admittance_rejected() {
        let harness = Harness::new(vec![FnTopicManager::new(TOPIC, |_| {
            Admittance::new().admit(7)
        })]);
        let t1 = tx(1, &[], 1);

        let err = harness.submit(&t1, &[TOPIC]).await.unwrap_err();

        assert!(matches!(err, EngineError::InvalidAdmittance { .. }));
        assert_eq!(harness.storage.stats().outputs, 0);
    }

    // =========================================================================
    // IDEMPOTENCY
    // =========================================================================

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let harness = Harness::new(vec![FnTopicManager::retaining(TOPIC)]);
        let t1 = tx(1, &[], 2);
        let t2 = tx(2, &[outpoint(&t1, 0)], 1);

        harness.submit(&t1, &[TOPIC]).await.unwrap();
        harness.submit(&t2, &[TOPIC]).await.unwrap();

        let snapshot = |h: &Harness| {
            [outpoint(&t1, 0), outpoint(&t1, 1), outpoint(&t2, 0)].map(|o| h.output(&o))
        };
        let before = snapshot(&harness);
        let added_before = harness.lookup.added().len();

        let second = harness.submit(&t2, &[TOPIC]).await.unwrap();

        assert_eq!(second[TOPIC], Admittance::default());
        assert_eq!(snapshot(&harness), before);
        assert_eq!(harness.lookup.added().len(), added_before);
        assert!(harness.lookup.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_resubmission_commits_only_new_topics() {
        let harness = Harness::new(vec![
            FnTopicManager::retaining("tm_a"),
            FnTopicManager::retaining("tm_b"),
        ]);
        let t1 = tx(1, &[], 1);

        harness.submit(&t1, &["tm_a"]).await.unwrap();
        let result = harness.submit(&t1, &["tm_a", "tm_b"]).await.unwrap();

        assert_eq!(result["tm_a"], Admittance::default());
        assert_eq!(result["tm_b"].outputs_to_admit.len(), 1);
        let added: Vec<_> = harness
            .lookup
            .added()
            .into_iter()
            .map(|(_, topic)| topic)
            .collect();
        assert_eq!(added, vec!["tm_a", "tm_b"]);
    }
}
