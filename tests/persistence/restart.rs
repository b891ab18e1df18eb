//! Crashed nodes come back with their term, vote and log intact.

use std::time::Duration;

use tokio::time::sleep;

use crate::commons::TestCluster;
use crate::enable_logger;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_whole_cluster_restart() {
    enable_logger();
    let mut cluster = TestCluster::start(3);
    cluster.one(b"11", 3, true).await;
    let term_before = cluster.check_terms();

    // crash and restart all
    for id in cluster.ids() {
        cluster.crash(id);
    }
    for id in cluster.ids() {
        cluster.start_node(id);
    }

    for id in cluster.ids() {
        let node = cluster.node(id);
        assert!(node.role_snapshot().0 >= term_before);
        assert_eq!(node.log_entries()[0].command, b"11".to_vec());
    }

    // the recovered entry is replayed once a new leader commits on top
    cluster.one(b"12", 3, true).await;
    let (count, command) = cluster.n_committed(1);
    assert_eq!(count, 3);
    assert_eq!(command, Some(b"11".to_vec()));

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leader_and_follower_restarts() {
    enable_logger();
    let mut cluster = TestCluster::start(3);
    cluster.one(b"11", 3, true).await;

    // Case 1: leader crashes and restarts
    let leader1 = cluster.check_one_leader().await;
    cluster.crash(leader1);
    cluster.start_node(leader1);
    cluster.one(b"12", 3, true).await;

    // Case 2: new leader crashes, the rest carries on, then it comes back
    let leader2 = cluster.check_one_leader().await;
    cluster.crash(leader2);
    cluster.one(b"13", 2, true).await;
    cluster.start_node(leader2);
    cluster.one(b"14", 3, true).await;

    // Case 3: a follower crashes and restarts
    let leader3 = cluster.check_one_leader().await;
    let follower = cluster.ids().into_iter().find(|id| *id != leader3).unwrap();
    cluster.crash(follower);
    cluster.one(b"15", 2, true).await;
    cluster.start_node(follower);
    cluster.one(b"16", 3, true).await;

    sleep(Duration::from_millis(300)).await;
    let (count, command) = cluster.n_committed(3);
    assert_eq!(count, 3);
    assert_eq!(command, Some(b"13".to_vec()));

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_votes_survive_restart() {
    enable_logger();
    let mut cluster = TestCluster::start(3);
    let leader = cluster.check_one_leader().await;
    let term = cluster.check_terms();

    cluster.crash(leader);
    cluster.start_node(leader);

    let state = cluster.node(leader).role_state();
    assert!(state.current_term >= term);
    if state.current_term == term {
        assert_eq!(state.voted_for, Some(leader));
    }

    cluster.shutdown();
}
