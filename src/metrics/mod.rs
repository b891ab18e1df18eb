use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;


lazy_static! {
    pub static ref ELECTIONS_STARTED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("raft_elections_started_total", "Elections started by the node"),
        &["node_id"]
    )
    .expect("metric can not be created");

    pub static ref LEADER_ELECTED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("raft_leader_elected_total", "Terms in which the node became leader"),
        &["node_id"]
    )
    .expect("metric can not be created");

    pub static ref CURRENT_TERM_METRIC: IntGaugeVec = IntGaugeVec::new(
        Opts::new("raft_current_term", "Latest term seen by the node"),
        &["node_id"]
    )
    .expect("metric can not be created");

    pub static ref COMMIT_INDEX_METRIC: IntGaugeVec = IntGaugeVec::new(
        Opts::new("raft_commit_index", "Highest log index known to be committed"),
        &["node_id"]
    )
    .expect("metric can not be created");

    pub static ref REPLICATION_REJECTED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "raft_replication_rejected_total",
            "AppendEntries rejected by a follower's consistency check"
        ),
        &["node_id", "peer_id"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

/// Registers every collector with `registry`. Calling it again on the same
/// registry is a no-op.
pub fn register_custom_metrics(registry: &Registry) {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ELECTIONS_STARTED_METRIC.clone()),
        Box::new(LEADER_ELECTED_METRIC.clone()),
        Box::new(CURRENT_TERM_METRIC.clone()),
        Box::new(COMMIT_INDEX_METRIC.clone()),
        Box::new(REPLICATION_REJECTED_METRIC.clone()),
    ];

    for collector in collectors {
        match registry.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => warn!("collector can not be registered: {:?}", e),
        }
    }
}
