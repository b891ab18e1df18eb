//! A follower whose log diverged by many entries is brought back in sync.

use rand::RngCore;

use crate::commons::TestCluster;
use crate::enable_logger;

fn random_command() -> Vec<u8> {
    let mut command = vec![0u8; 8];
    rand::thread_rng().fill_bytes(&mut command);
    command
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leader_backs_up_quickly_over_incorrect_follower_logs() {
    enable_logger();
    let cluster = TestCluster::start(5);
    cluster.one(&random_command(), 5, true).await;

    // put leader and one follower in a partition
    let leader1 = cluster.check_one_leader().await;
    let ids = cluster.ids();
    let others: Vec<u32> = ids.iter().copied().filter(|id| *id != leader1).collect();
    let follower1 = others[0];
    for id in &others[1..] {
        cluster.disconnect(*id);
    }

    // lots of commands that won't commit
    for _ in 0..50 {
        cluster.submit_to(leader1, &random_command());
    }

    cluster.disconnect(leader1);
    cluster.disconnect(follower1);

    // allow the other partition to recover
    for id in &others[1..] {
        cluster.reconnect(*id);
    }

    // lots of successful commands to the new group
    for _ in 0..50 {
        cluster.one(&random_command(), 3, true).await;
    }

    // now another partitioned leader and one follower
    let leader2 = cluster.check_one_leader().await;
    let other = others[1..].iter().copied().find(|id| *id != leader2).unwrap();
    cluster.disconnect(other);

    // lots more commands that won't commit
    for _ in 0..50 {
        cluster.submit_to(leader2, &random_command());
    }

    // bring original leader back to life
    for id in &ids {
        cluster.disconnect(*id);
    }
    cluster.reconnect(leader1);
    cluster.reconnect(follower1);
    cluster.reconnect(other);

    // lots of successful commands to the new group
    for _ in 0..50 {
        cluster.one(&random_command(), 3, true).await;
    }

    // now everyone
    for id in &ids {
        cluster.reconnect(*id);
    }
    let last = cluster.one(&random_command(), 5, true).await;

    for id in &ids {
        assert!(cluster.node(*id).log_entries().len() as u64 >= last);
    }
    cluster.shutdown();
}
