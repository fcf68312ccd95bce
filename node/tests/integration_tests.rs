//! Integration tests exercising the full vote pipeline:
//! ownership lookup → throttle → exclusive section → funds check → ledger
//! append → projection.
//!
//! Most tests run against the nullable store so that time, failures and
//! latency can be controlled; the last section repeats the end-to-end
//! scenarios against a real LMDB environment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tabcoin_node::{
    ConcurrencySerializer, NodeConfig, SerializerConfig, TabcoinNode, VoteError, VoteMetrics,
    VoteOrchestrator,
};
use tabcoin_nullables::{NullBalanceStore, NullClock, NullContentDirectory};
use tabcoin_store::BalanceEventStore;
use tabcoin_types::{
    BalanceType, ContentId, ContentTabcoins, RecipientId, Timestamp, UserBalances, UserId,
    VotePolicy, VoteRequest,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START: u64 = 1_700_000_000;
const WINDOW: u64 = 72 * 3600;

struct Harness {
    orchestrator: Arc<VoteOrchestrator>,
    store: Arc<NullBalanceStore>,
    clock: Arc<NullClock>,
}

fn harness_with(serializer: SerializerConfig, metrics: Option<Arc<VoteMetrics>>) -> Harness {
    let store = Arc::new(NullBalanceStore::new());
    let directory = Arc::new(NullContentDirectory::new());
    let clock = Arc::new(NullClock::new(START));
    let mut orchestrator = VoteOrchestrator::new(
        store.clone(),
        directory,
        clock.clone(),
        VotePolicy::default(),
        Arc::new(ConcurrencySerializer::new(serializer)),
    );
    if let Some(m) = metrics {
        orchestrator = orchestrator.with_metrics(m);
    }
    Harness {
        orchestrator: Arc::new(orchestrator),
        store,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(SerializerConfig::default(), None)
}

impl Harness {
    async fn fund(&self, user: &str, tabcoins: i64) {
        self.orchestrator
            .grant(
                RecipientId::new(user),
                BalanceType::UserTabcoin,
                tabcoins,
                "initial",
            )
            .await
            .expect("grant");
    }

    async fn publish(&self, content: &str, owner: &str, credit: i64) {
        self.orchestrator
            .publish_content(&ContentId::new(content), &UserId::new(owner), credit)
            .await
            .expect("publish");
    }

    fn wallet(&self, user: &str) -> UserBalances {
        self.orchestrator
            .projector()
            .user_balances(&UserId::new(user))
            .expect("user balances")
    }

    fn content(&self, content: &str) -> ContentTabcoins {
        self.orchestrator
            .projector()
            .content_tabcoins(&ContentId::new(content))
            .expect("content projection")
    }
}

fn credit(voter: &str, content: &str) -> VoteRequest {
    VoteRequest::credit(voter, content)
}

fn debit(voter: &str, content: &str) -> VoteRequest {
    VoteRequest::debit(voter, content, "conteúdo sem fontes")
}

// ---------------------------------------------------------------------------
// 1. End-to-end scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_single_credit_vote() {
    let h = harness();
    h.fund("voter", 2).await;
    h.publish("post", "owner", 0).await;

    let projection = h
        .orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap();

    assert_eq!(
        projection,
        ContentTabcoins {
            tabcoins: 1,
            tabcoins_credit: 1,
            tabcoins_debit: 0
        }
    );
    assert_eq!(h.wallet("owner").tabcoins, 1);
    assert_eq!(h.wallet("voter"), UserBalances { tabcoins: 0, tabcash: 1 });
}

#[tokio::test]
async fn scenario_two_debit_votes() {
    let h = harness();
    h.fund("voter", 4).await;
    h.publish("post", "owner", 1).await;

    let first = h
        .orchestrator
        .vote_on_content(debit("voter", "post"))
        .await
        .unwrap();
    assert_eq!(
        first,
        ContentTabcoins {
            tabcoins: 0,
            tabcoins_credit: 0,
            tabcoins_debit: -1
        }
    );

    h.clock.advance(60);
    let second = h
        .orchestrator
        .vote_on_content(debit("voter", "post"))
        .await
        .unwrap();
    assert_eq!(
        second,
        ContentTabcoins {
            tabcoins: -1,
            tabcoins_credit: 0,
            tabcoins_debit: -2
        }
    );
    assert_eq!(h.wallet("owner").tabcoins, -2);
    assert_eq!(h.wallet("voter"), UserBalances { tabcoins: 0, tabcash: 2 });
}

#[tokio::test]
async fn vote_on_unknown_content_changes_nothing() {
    let h = harness();
    h.fund("voter", 10).await;
    let before = h.store.event_count().unwrap();

    let err = h
        .orchestrator
        .vote_on_content(credit("voter", "ghost"))
        .await
        .unwrap_err();

    assert_eq!(err, VoteError::ContentNotFound(ContentId::new("ghost")));
    assert_eq!(h.store.event_count().unwrap(), before);
}

// ---------------------------------------------------------------------------
// 2. Funds and throttle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn insufficient_funds_is_idempotent() {
    let h = harness();
    h.fund("voter", 1).await;
    h.publish("post", "owner", 0).await;
    let before = h.store.event_count().unwrap();

    for _ in 0..3 {
        let err = h
            .orchestrator
            .vote_on_content(credit("voter", "post"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            VoteError::InsufficientFunds {
                required: 2,
                available: 1
            }
        );
    }

    assert_eq!(h.store.event_count().unwrap(), before);
    assert_eq!(h.wallet("voter"), UserBalances { tabcoins: 1, tabcash: 0 });
    assert_eq!(h.content("post"), ContentTabcoins::default());
}

#[tokio::test]
async fn fourth_vote_in_window_is_throttled() {
    let h = harness();
    h.fund("voter", 100).await;
    h.publish("post", "owner", 0).await;

    h.orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap();
    h.clock.advance(10);
    h.orchestrator
        .vote_on_content(debit("voter", "post"))
        .await
        .unwrap();
    h.clock.advance(10);
    h.orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap();
    h.clock.advance(10);

    let before = h.store.event_count().unwrap();
    let err = h
        .orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        VoteError::RepeatVoteThrottled {
            retry_not_before: Timestamp::new(START + WINDOW)
        }
    );
    assert_eq!(h.store.event_count().unwrap(), before);
    assert_eq!(h.wallet("voter").tabcoins, 94);

    // Another content is unaffected.
    h.publish("other", "owner", 0).await;
    assert!(h
        .orchestrator
        .vote_on_content(credit("voter", "other"))
        .await
        .is_ok());

    // The oldest vote leaves the window exactly 72 hours after it was cast.
    h.clock.set(START + WINDOW);
    assert!(h
        .orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .is_ok());
}

#[tokio::test]
async fn storage_failure_leaves_balances_untouched() {
    let h = harness();
    h.fund("voter", 4).await;
    h.publish("post", "owner", 0).await;
    let events_before = h.store.event_count().unwrap();

    h.store.fail_next_appends(1);
    let err = h
        .orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap_err();

    assert!(matches!(err, VoteError::StorageFailure(_)));
    assert!(err.is_retryable());
    assert_eq!(h.store.event_count().unwrap(), events_before);
    assert_eq!(h.wallet("voter"), UserBalances { tabcoins: 4, tabcash: 0 });
    assert_eq!(h.wallet("owner").tabcoins, 0);

    // The retry goes through and counts once against the throttle.
    h.orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap();
    assert_eq!(h.wallet("voter"), UserBalances { tabcoins: 2, tabcash: 1 });
}

// ---------------------------------------------------------------------------
// 3. Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_votes_spend_funds_once() {
    let h = harness();
    h.fund("voter", 2).await;
    for i in 0..20 {
        h.publish(&format!("post-{i}"), "owner", 0).await;
    }

    let mut handles = Vec::new();
    for i in 0..20 {
        let orchestrator = Arc::clone(&h.orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .vote_on_content(credit("voter", &format!("post-{i}")))
                .await
        }));
    }

    let mut accepted = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(VoteError::InsufficientFunds { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(insufficient, 19);
    assert_eq!(h.wallet("voter"), UserBalances { tabcoins: 0, tabcash: 1 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_votes_cannot_overshoot_throttle() {
    let h = harness();
    h.fund("voter", 100).await;
    h.publish("post", "owner", 0).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let orchestrator = Arc::clone(&h.orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator.vote_on_content(credit("voter", "post")).await
        }));
    }

    let mut accepted = 0;
    let mut throttled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(VoteError::RepeatVoteThrottled { .. }) => throttled += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(throttled, 7);
    assert_eq!(h.content("post").tabcoins_credit, 3);
    assert_eq!(h.wallet("voter").tabcoins, 94);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_section_turns_waiters_into_too_many_concurrent_votes() {
    let h = harness_with(
        SerializerConfig {
            admission_timeout_ms: 50,
            ..SerializerConfig::default()
        },
        None,
    );
    h.fund("voter", 10).await;
    h.publish("a", "owner", 0).await;
    h.publish("b", "owner", 0).await;
    h.store.set_append_latency(Duration::from_millis(300));

    let orchestrator = Arc::clone(&h.orchestrator);
    let slow =
        tokio::spawn(async move { orchestrator.vote_on_content(credit("voter", "a")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let err = h
        .orchestrator
        .vote_on_content(credit("voter", "b"))
        .await
        .unwrap_err();
    assert_eq!(err, VoteError::TooManyConcurrentVotes);
    assert!(err.is_retryable());

    assert!(slow.await.unwrap().is_ok());
    assert_eq!(h.content("b"), ContentTabcoins::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn excess_queued_votes_fail_fast() {
    let h = harness_with(
        SerializerConfig {
            max_pending_per_voter: 1,
            ..SerializerConfig::default()
        },
        None,
    );
    h.fund("voter", 10).await;
    h.publish("a", "owner", 0).await;
    h.publish("b", "owner", 0).await;
    h.store.set_append_latency(Duration::from_millis(200));

    let orchestrator = Arc::clone(&h.orchestrator);
    let slow =
        tokio::spawn(async move { orchestrator.vote_on_content(credit("voter", "a")).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    let err = h
        .orchestrator
        .vote_on_content(credit("voter", "b"))
        .await
        .unwrap_err();
    assert_eq!(err, VoteError::TooManyConcurrentVotes);
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(slow.await.unwrap().is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn different_voters_proceed_in_parallel() {
    let h = harness();
    for i in 0..4 {
        h.publish(&format!("post-{i}"), &format!("owner-{i}"), 0).await;
        h.fund(&format!("voter-{i}"), 2).await;
    }
    h.store.set_append_latency(Duration::from_millis(100));

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..4 {
        let orchestrator = Arc::clone(&h.orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .vote_on_content(credit(&format!("voter-{i}"), &format!("post-{i}")))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Four 100ms writes in sequence would take at least 400ms.
    assert!(
        start.elapsed() < Duration::from_millis(350),
        "expected parallel execution, took {:?}",
        start.elapsed()
    );
    for i in 0..4 {
        assert_eq!(h.content(&format!("post-{i}")).tabcoins, 1);
        assert_eq!(h.wallet(&format!("owner-{i}")).tabcoins, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn votes_on_the_same_owner_are_serialised() {
    let h = harness();
    h.publish("post", "owner", 0).await;
    for i in 0..3 {
        h.fund(&format!("voter-{i}"), 2).await;
    }
    h.store.set_append_latency(Duration::from_millis(100));

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..3 {
        let orchestrator = Arc::clone(&h.orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .vote_on_content(credit(&format!("voter-{i}"), "post"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(300));
    assert_eq!(h.content("post").tabcoins, 3);
    assert_eq!(h.wallet("owner").tabcoins, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn owners_voting_on_each_other_cannot_both_overdraw() {
    let h = harness();
    h.fund("v", 2).await;
    h.fund("w", 2).await;
    h.publish("p", "v", 0).await;
    h.publish("q", "w", 0).await;
    h.store.set_append_latency(Duration::from_millis(200));

    let orchestrator = Arc::clone(&h.orchestrator);
    let v_votes = tokio::spawn(async move { orchestrator.vote_on_content(debit("v", "q")).await });
    let orchestrator = Arc::clone(&h.orchestrator);
    let w_votes = tokio::spawn(async move { orchestrator.vote_on_content(debit("w", "p")).await });
    let outcomes = [v_votes.await.unwrap(), w_votes.await.unwrap()];

    // Whichever runs second has lost one tabcoin to the first vote.
    let accepted = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(accepted, 1, "{outcomes:?}");
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Err(VoteError::InsufficientFunds {
            required: 2,
            available: 1
        })
    )));

    let mut wallets = [h.wallet("v"), h.wallet("w")];
    wallets.sort_by_key(|b| b.tabcoins);
    assert_eq!(
        wallets,
        [
            UserBalances { tabcoins: 0, tabcash: 1 },
            UserBalances { tabcoins: 1, tabcash: 0 },
        ]
    );
}

// ---------------------------------------------------------------------------
// 4. Grants and metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grant_returns_new_balance() {
    let h = harness();
    let recipient = RecipientId::new("user");
    let first = h
        .orchestrator
        .grant(recipient.clone(), BalanceType::UserTabcash, 5, "bonus")
        .await
        .unwrap();
    let second = h
        .orchestrator
        .grant(recipient, BalanceType::UserTabcash, -2, "correction")
        .await
        .unwrap();
    assert_eq!((first, second), (5, 3));
}

#[tokio::test]
async fn content_grant_requires_known_content() {
    let h = harness();
    let err = h
        .orchestrator
        .grant(
            RecipientId::new("ghost"),
            BalanceType::ContentTabcoin,
            1,
            "publication",
        )
        .await
        .unwrap_err();
    assert_eq!(err, VoteError::ContentNotFound(ContentId::new("ghost")));
}

#[tokio::test]
async fn metrics_count_outcomes() {
    let metrics = Arc::new(VoteMetrics::new());
    let h = harness_with(SerializerConfig::default(), Some(Arc::clone(&metrics)));
    h.fund("voter", 2).await;
    h.publish("post", "owner", 0).await;

    h.orchestrator
        .vote_on_content(credit("voter", "post"))
        .await
        .unwrap();
    let _ = h.orchestrator.vote_on_content(credit("voter", "post")).await;

    assert_eq!(metrics.votes_accepted.get(), 1);
    assert_eq!(
        metrics
            .votes_rejected
            .with_label_values(&["insufficient_funds"])
            .get(),
        1
    );
}

// ---------------------------------------------------------------------------
// 5. LMDB-backed node
// ---------------------------------------------------------------------------

fn node_config(dir: &tempfile::TempDir) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().join("ledger"),
        map_size_mb: 16,
        enable_metrics: true,
        ..NodeConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lmdb_node_runs_scenarios_and_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let clock = Arc::new(NullClock::new(START));

    {
        let node = TabcoinNode::open_with_clock(node_config(&dir), clock.clone()).unwrap();
        let orchestrator = node.orchestrator();
        orchestrator
            .grant(RecipientId::new("voter"), BalanceType::UserTabcoin, 6, "initial")
            .await
            .unwrap();
        orchestrator
            .publish_content(&ContentId::new("a"), &UserId::new("owner"), 0)
            .await
            .unwrap();
        orchestrator
            .publish_content(&ContentId::new("b"), &UserId::new("owner"), 1)
            .await
            .unwrap();

        let a = orchestrator
            .vote_on_content(credit("voter", "a"))
            .await
            .unwrap();
        assert_eq!(
            a,
            ContentTabcoins {
                tabcoins: 1,
                tabcoins_credit: 1,
                tabcoins_debit: 0
            }
        );
        orchestrator
            .vote_on_content(debit("voter", "b"))
            .await
            .unwrap();
        let b = orchestrator
            .vote_on_content(debit("voter", "b"))
            .await
            .unwrap();
        assert_eq!(
            b,
            ContentTabcoins {
                tabcoins: -1,
                tabcoins_credit: 0,
                tabcoins_debit: -2
            }
        );

        let report = node.check_integrity().unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        let metrics = node.metrics().expect("metrics enabled");
        assert_eq!(metrics.votes_accepted.get(), 3);
    }

    let node = TabcoinNode::open_with_clock(node_config(&dir), clock).unwrap();
    let projector = node.projector();
    assert_eq!(
        projector.user_balances(&UserId::new("voter")).unwrap(),
        UserBalances { tabcoins: 0, tabcash: 3 }
    );
    assert_eq!(
        projector.user_balances(&UserId::new("owner")).unwrap().tabcoins,
        -1
    );
    let err = node
        .orchestrator()
        .vote_on_content(credit("voter", "a"))
        .await
        .unwrap_err();
    assert!(matches!(err, VoteError::InsufficientFunds { available: 0, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn lmdb_node_concurrent_race() {
    let dir = tempfile::tempdir().expect("temp dir");
    let node = Arc::new(
        TabcoinNode::open_with_clock(node_config(&dir), Arc::new(NullClock::new(START))).unwrap(),
    );
    node.orchestrator()
        .grant(RecipientId::new("voter"), BalanceType::UserTabcoin, 2, "initial")
        .await
        .unwrap();
    for i in 0..10 {
        node.orchestrator()
            .publish_content(&ContentId::new(format!("c{i}")), &UserId::new("owner"), 0)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..10 {
        let node = Arc::clone(&node);
        handles.push(tokio::spawn(async move {
            node.orchestrator()
                .vote_on_content(credit("voter", &format!("c{i}")))
                .await
        }));
    }
    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(
        node.projector()
            .balance(&RecipientId::new("voter"), BalanceType::UserTabcoin)
            .unwrap(),
        0
    );
    assert!(node.check_integrity().unwrap().is_healthy());
}
