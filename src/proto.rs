//! Protocol messages exchanged between peers.
//!
//! Field sets follow the Raft paper (Figure 2) plus the conflict hint used by
//! fast backtracking. Encoding is left to the transport; every type derives
//! serde so any wire format can carry it.

use serde::Deserialize;
use serde::Serialize;

/// A term-stamped opaque command.
///
/// Entries are addressed by their 1-based position in the log; index 0 is a
/// sentinel with term 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub term: u64,
    pub command: Vec<u8>,
}

impl LogEntry {
    pub fn new(
        term: u64,
        command: Vec<u8>,
    ) -> Self {
        Self { term, command }
    }

    /// The index-0 placeholder every log starts with
    pub(crate) fn sentinel() -> Self {
        Self {
            term: 0,
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub term: u64,
    pub candidate_id: u32,
    pub last_log_index: u64,
    pub last_log_term: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub term: u64,
    pub vote_granted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEntriesRequest {
    pub term: u64,
    pub leader_id: u32,
    pub prev_log_index: u64,
    pub prev_log_term: u64,
    pub entries: Vec<LogEntry>,
    pub leader_commit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendEntriesResponse {
    pub term: u64,
    pub success: bool,
    /// Term of the follower entry that failed the consistency check
    pub conflict_term: u64,
    /// First index the follower stores for `conflict_term`
    pub conflict_index: u64,
}

impl AppendEntriesResponse {
    pub(crate) fn success(term: u64) -> Self {
        Self {
            term,
            success: true,
            conflict_term: 0,
            conflict_index: 0,
        }
    }

    pub(crate) fn rejected(term: u64) -> Self {
        Self {
            term,
            success: false,
            conflict_term: 0,
            conflict_index: 0,
        }
    }

    pub(crate) fn conflict(
        term: u64,
        conflict_term: u64,
        conflict_index: u64,
    ) -> Self {
        Self {
            term,
            success: false,
            conflict_term,
            conflict_index,
        }
    }
}
