//! Leaders are replaced when they become unreachable, and a quorum is needed
//! to elect one.

use rand::Rng;
use tokio::time::sleep;

use crate::commons::TestCluster;
use crate::commons::ELECTION_SETTLE;
use crate::enable_logger;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reelection() {
    enable_logger();
    let cluster = TestCluster::start(3);
    let leader1 = cluster.check_one_leader().await;

    // Case 1: leader disconnects, a new one should be elected
    cluster.disconnect(leader1);
    let leader2 = cluster.check_one_leader().await;
    assert_ne!(leader1, leader2);

    // Case 2: the old leader rejoins, which must not disturb the new one
    cluster.reconnect(leader1);
    let leader3 = cluster.check_one_leader().await;
    assert_ne!(leader3, 0);

    // Case 3: no quorum, no leader
    let other = cluster.ids().into_iter().find(|id| *id != leader3).unwrap();
    cluster.disconnect(leader3);
    cluster.disconnect(other);
    sleep(ELECTION_SETTLE * 2).await;
    cluster.check_no_leader();

    // Case 4: quorum is back
    cluster.reconnect(other);
    cluster.check_one_leader().await;

    // Case 5: last node rejoins
    cluster.reconnect(leader3);
    cluster.check_one_leader().await;

    cluster.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_elections() {
    enable_logger();
    let cluster = TestCluster::start(7);
    cluster.check_one_leader().await;

    for _ in 0..6 {
        let ids = cluster.ids();
        let (i1, i2, i3) = {
            let mut rng = rand::thread_rng();
            (
                ids[rng.gen_range(0..ids.len())],
                ids[rng.gen_range(0..ids.len())],
                ids[rng.gen_range(0..ids.len())],
            )
        };
        cluster.disconnect(i1);
        cluster.disconnect(i2);
        cluster.disconnect(i3);

        // at least four of seven remain, so exactly one leader must emerge
        cluster.check_one_leader().await;

        cluster.reconnect(i1);
        cluster.reconnect(i2);
        cluster.reconnect(i3);
    }

    cluster.check_one_leader().await;
    cluster.shutdown();
}
