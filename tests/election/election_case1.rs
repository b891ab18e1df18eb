//! A fresh cluster elects exactly one leader and keeps it while nothing
//! fails.

use std::time::Duration;

use tokio::time::sleep;

use crate::commons::TestCluster;
use crate::commons::ELECTION_SETTLE;
use crate::enable_logger;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_initial_election() {
    enable_logger();
    let cluster = TestCluster::start(3);

    let leader = cluster.check_one_leader().await;

    // everyone learned about the leader's term
    sleep(Duration::from_millis(100)).await;
    let term1 = cluster.check_terms();
    assert!(term1 >= 1, "term is {}, but election should have happened", term1);

    // no failure, so heartbeats keep the same leader in place
    sleep(ELECTION_SETTLE * 2).await;
    let term2 = cluster.check_terms();
    assert_eq!(term1, term2, "term changed even though there were no failures");
    assert_eq!(cluster.check_one_leader().await, leader);

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leader_votes_recorded_durably() {
    enable_logger();
    let cluster = TestCluster::start(3);
    let leader = cluster.check_one_leader().await;
    let term = cluster.check_terms();

    let state = cluster.node(leader).role_state();
    assert_eq!(state.current_term, term);
    assert_eq!(state.voted_for, Some(leader));

    cluster.shutdown();
}
