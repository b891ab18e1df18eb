//! This module is the network abstraction layer between peers.
//!
//! The core only ever calls out through [`Transport`]. A call that times
//! out, hits an unreachable peer or loses its reply comes back as `None`,
//! which the core reads as "no information" and retries on the next tick.
mod local;

pub use local::*;


// Trait definition of the current module
// -----------------------------------------------------------------------------
// Core model in Raft: Transport Definition
//

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::proto::AppendEntriesRequest;
use crate::proto::AppendEntriesResponse;
use crate::proto::VoteRequest;
use crate::proto::VoteResponse;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a RequestVote RPC to `peer_id`.
    ///
    /// Returns `None` on any delivery failure. Implementations apply their
    /// own call timeout; the core adds none on top.
    async fn request_vote(
        &self,
        peer_id: u32,
        request: VoteRequest,
    ) -> Option<VoteResponse>;

    /// Sends an AppendEntries RPC (heartbeat when `entries` is empty) to
    /// `peer_id`. Same failure semantics as
    /// [`request_vote`](Transport::request_vote).
    async fn append_entries(
        &self,
        peer_id: u32,
        request: AppendEntriesRequest,
    ) -> Option<AppendEntriesResponse>;
}
