/// Inputs of the role state machine.
///
/// RPC handlers apply these synchronously; timers and drivers enqueue them
/// on the role event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoleEvent {
    /// A message carrying `term` was seen, from `originator` when known.
    /// At the current term only a known originator (the term's leader)
    /// steps a candidate down; reply terms from the drivers must be higher.
    HigherTermObserved { term: u64, originator: Option<u32> },

    /// The election timer fired.
    ElectionTimeout,

    /// The election driver collected a quorum for `term`.
    MajorityVotesReceived { term: u64 },

    /// The RequestVote handler decided to grant `candidate` its vote in `term`.
    VoteGranted { term: u64, candidate: u32 },
}

/// Inputs of the replication log, produced by the replication driver.
///
/// Every event remembers the leader term and the `prev_log_index` of the
/// request it answers, so replies that no longer match the current progress
/// can be recognised and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogEvent {
    ReplicationSucceeded {
        peer: u32,
        term: u64,
        prev_log_index: u64,
        applied_count: u64,
    },

    ReplicationFailed {
        peer: u32,
        term: u64,
        prev_log_index: u64,
        conflict_term: u64,
        conflict_index: u64,
    },
}
