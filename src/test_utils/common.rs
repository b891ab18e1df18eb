use std::sync::Arc;

use crate::proto::LogEntry;
use crate::CommitStream;
use crate::MemStateStorage;
use crate::MockTransport;
use crate::PersistentState;
use crate::Raft;
use crate::RaftNodeConfig;
use crate::StateStorage;
use crate::Transport;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Entries with the given terms, commands named after their index
pub(crate) fn entries(terms: &[u64]) -> Vec<LogEntry> {
    terms
        .iter()
        .enumerate()
        .map(|(i, term)| LogEntry::new(*term, format!("cmd-{}", i + 1).into_bytes()))
        .collect()
}

/// Validated config for `node_id` in a cluster with `peers`, using timeouts
/// long enough that nothing fires during a unit test.
pub(crate) fn node_config(
    node_id: u32,
    peers: Vec<u32>,
) -> RaftNodeConfig {
    let mut config = RaftNodeConfig::default();
    config.cluster.node_id = node_id;
    config.cluster.peers = peers;
    config.raft.election.election_timeout_min = 10_000;
    config.raft.election.election_timeout_max = 20_000;
    config.raft.replication.rpc_append_entries_clock_in_ms = 1_000;
    config.validate().expect("valid test config")
}

/// A Raft peer over in-memory storage seeded with `state`
pub(crate) fn mock_raft(
    node_id: u32,
    peers: Vec<u32>,
    state: Option<PersistentState>,
    transport: MockTransport,
) -> (Arc<Raft>, Arc<MemStateStorage>, CommitStream) {
    let storage = Arc::new(MemStateStorage::new());
    if let Some(state) = state {
        storage
            .save_state(&state.hard_state, &state.log)
            .expect("seed storage");
    }
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let (raft, commits) = Raft::new(Arc::new(node_config(node_id, peers)), transport, storage.clone())
        .expect("build raft");
    (Arc::new(raft), storage, commits)
}
