//! Commands reach agreement with a quorum and only with a quorum.

use std::time::Duration;

use tokio::time::sleep;

use crate::commons::TestCluster;
use crate::commons::ELECTION_SETTLE;
use crate::enable_logger;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_basic_agreement() {
    enable_logger();
    let cluster = TestCluster::start(3);
    cluster.check_one_leader().await;

    for index in 1..=3u64 {
        let (count, _) = cluster.n_committed(index);
        assert_eq!(count, 0, "some have committed before submit");

        let command = format!("cmd-{}", index * 100);
        let got = cluster.one(command.as_bytes(), 3, false).await;
        assert_eq!(got, index);
    }

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_follower_failure() {
    enable_logger();
    let cluster = TestCluster::start(3);
    cluster.one(b"101", 3, false).await;

    // Case 1: one follower gone, the other two still agree
    let leader1 = cluster.check_one_leader().await;
    let follower = cluster.ids().into_iter().find(|id| *id != leader1).unwrap();
    cluster.disconnect(follower);

    cluster.one(b"102", 2, false).await;
    sleep(ELECTION_SETTLE).await;
    cluster.one(b"103", 2, false).await;

    // Case 2: both followers gone, nothing commits
    let leader2 = cluster.check_one_leader().await;
    for id in cluster.ids() {
        if id != leader2 {
            cluster.disconnect(id);
        }
    }
    let index = cluster.submit_to(leader2, b"104").expect("leader rejected submit");
    assert_eq!(index, 4);

    sleep(ELECTION_SETTLE * 2).await;
    let (count, _) = cluster.n_committed(index);
    assert_eq!(count, 0, "{} committed but no majority", count);

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_minority_leader_cannot_commit() {
    enable_logger();
    let cluster = TestCluster::start(5);
    cluster.one(b"10", 5, false).await;

    // three of five followers disconnect
    let leader = cluster.check_one_leader().await;
    let followers: Vec<u32> = cluster.ids().into_iter().filter(|id| *id != leader).collect();
    for id in &followers[..3] {
        cluster.disconnect(*id);
    }

    let index = cluster.submit_to(leader, b"20").expect("leader rejected submit");
    assert_eq!(index, 2);
    sleep(ELECTION_SETTLE * 2).await;

    let (count, _) = cluster.n_committed(index);
    assert_eq!(count, 0, "{} committed but no majority", count);
    assert_eq!(cluster.node(leader).commit_index(), 1);

    // repair
    for id in &followers[..3] {
        cluster.reconnect(*id);
    }

    // the disconnected majority may have chosen a leader from among their own
    // ranks, forgetting index 2
    let leader2 = cluster.check_one_leader().await;
    if let Some(index2) = cluster.submit_to(leader2, b"30") {
        assert!((2..=3).contains(&index2), "unexpected index {}", index2);
    }

    cluster.one(b"1000", 5, true).await;
    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rejoin_of_partitioned_leader() {
    enable_logger();
    let cluster = TestCluster::start(3);
    cluster.one(b"101", 3, true).await;

    // leader network failure, it keeps appending on its own
    let leader1 = cluster.check_one_leader().await;
    cluster.disconnect(leader1);
    cluster.submit_to(leader1, b"102");
    cluster.submit_to(leader1, b"103");
    cluster.submit_to(leader1, b"104");

    // new leader commits, also for index 2
    cluster.one(b"103", 2, true).await;

    // new leader network failure
    let leader2 = cluster.check_one_leader().await;
    cluster.disconnect(leader2);

    // the old leader connects again and has to step down
    cluster.reconnect(leader1);
    cluster.one(b"104", 2, true).await;
    let (term, is_leader) = cluster.node(leader1).role_snapshot();
    assert!(term > 1);
    if is_leader {
        // only possible if it won a fresh election with a newer log
        assert!(cluster.node(leader1).log_entries().iter().any(|e| e.command == b"104".to_vec()));
    }

    // all together now
    cluster.reconnect(leader2);
    cluster.one(b"105", 3, true).await;

    // every log holds the same committed prefix
    sleep(Duration::from_millis(500)).await;
    let reference = cluster.node(leader1).log_entries();
    let commit = cluster.node(leader1).commit_index() as usize;
    for id in cluster.ids() {
        let entries = cluster.node(id).log_entries();
        assert_eq!(entries[..commit], reference[..commit]);
    }

    cluster.shutdown();
}
