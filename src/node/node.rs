//! Application facing handle of one Raft peer.
//!
//! ## Key Responsibilities
//! - Starts and stops the consensus loops and timers
//! - Accepts commands through [`Node::submit`]
//! - Exposes the inbound RPC entry points a transport server calls
//!
//! ## Example Usage
//! ```ignore
//! let (node, mut commits) = NodeBuilder::new(config, transport).build()?;
//! node.run()?;
//! let proposal = node.submit(b"set x 1".to_vec())?;
//! while let Some(entry) = commits.recv().await {
//!     apply(entry.command);
//! }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::proto::AppendEntriesRequest;
use crate::proto::AppendEntriesResponse;
use crate::proto::LogEntry;
use crate::proto::VoteRequest;
use crate::proto::VoteResponse;
use crate::CommittedEntry;
use crate::Proposal;
use crate::Raft;
use crate::RaftNodeConfig;
use crate::Result;
use crate::RoleSnapshot;

/// Committed entries in increasing index order, each delivered exactly once
pub type CommitStream = mpsc::UnboundedReceiver<CommittedEntry>;

#[derive(Clone)]
pub struct Node {
    pub(crate) id: u32,
    pub(crate) raft: Arc<Raft>,
    pub settings: Arc<RaftNodeConfig>,
}

impl Node {
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Starts the event loops and arms the election timer.
    pub fn run(&self) -> Result<()> {
        self.raft.run()
    }

    pub fn shutdown(&self) {
        self.raft.shutdown();
    }

    pub fn is_stopped(&self) -> bool {
        self.raft.is_stopped()
    }

    /// Proposes `command`. Returns immediately; watch the [`CommitStream`]
    /// for the outcome.
    pub fn submit(
        &self,
        command: Vec<u8>,
    ) -> Result<Proposal> {
        self.raft.submit(command)
    }

    /// `(current_term, is_leader)`
    pub fn role_snapshot(&self) -> (u64, bool) {
        let snapshot = self.raft.role_snapshot();
        (snapshot.current_term, snapshot.is_leader())
    }

    pub fn role_state(&self) -> RoleSnapshot {
        self.raft.role_snapshot()
    }

    pub fn handle_request_vote(
        &self,
        request: VoteRequest,
    ) -> Result<VoteResponse> {
        self.raft.handle_request_vote(request)
    }

    pub fn handle_append_entries(
        &self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse> {
        self.raft.handle_append_entries(request)
    }

    pub fn commit_index(&self) -> u64 {
        self.raft.commit_index()
    }

    pub fn last_applied(&self) -> u64 {
        self.raft.last_applied()
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.raft.log_entries()
    }
}
