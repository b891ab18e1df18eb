//! In-process transport.
//!
//! Routes calls straight into the handlers of nodes living in the same
//! process. Nodes can be cut off and reconnected to simulate partitions and
//! crashes: a disconnected node neither sends nor receives, and a reply is
//! lost if either side got disconnected while the call was being handled.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use tracing::trace;

use super::Transport;
use crate::proto::AppendEntriesRequest;
use crate::proto::AppendEntriesResponse;
use crate::proto::VoteRequest;
use crate::proto::VoteResponse;
use crate::NetworkError;
use crate::Node;
use crate::Raft;

struct Endpoint {
    raft: Weak<Raft>,
    connected: bool,
}

#[derive(Default)]
pub struct LocalNetwork {
    endpoints: RwLock<HashMap<u32, Endpoint>>,
}

impl LocalNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transport used by node `node_id` to reach the others
    pub fn transport(
        self: &Arc<Self>,
        node_id: u32,
    ) -> Arc<dyn Transport> {
        Arc::new(LocalTransport {
            from: node_id,
            network: self.clone(),
        })
    }

    /// Makes `node` reachable, replacing any earlier incarnation with the
    /// same id.
    pub fn register(
        &self,
        node: &Node,
    ) {
        self.endpoints.write().insert(
            node.id(),
            Endpoint {
                raft: Arc::downgrade(&node.raft),
                connected: true,
            },
        );
        debug!("[LocalNetwork] node {} registered", node.id());
    }

    pub fn disconnect(
        &self,
        node_id: u32,
    ) {
        if let Some(endpoint) = self.endpoints.write().get_mut(&node_id) {
            endpoint.connected = false;
            debug!("[LocalNetwork] node {} disconnected", node_id);
        }
    }

    pub fn reconnect(
        &self,
        node_id: u32,
    ) {
        if let Some(endpoint) = self.endpoints.write().get_mut(&node_id) {
            endpoint.connected = true;
            debug!("[LocalNetwork] node {} reconnected", node_id);
        }
    }

    pub fn is_connected(
        &self,
        node_id: u32,
    ) -> bool {
        self.endpoints.read().get(&node_id).map(|e| e.connected).unwrap_or(false)
    }

    fn route(
        &self,
        from: u32,
        to: u32,
    ) -> Result<Arc<Raft>, NetworkError> {
        let endpoints = self.endpoints.read();
        if !endpoints.get(&from).map(|e| e.connected).unwrap_or(false) {
            return Err(NetworkError::PeerNotFound(from));
        }
        let target = endpoints.get(&to).ok_or(NetworkError::PeerNotFound(to))?;
        if !target.connected {
            return Err(NetworkError::PeerNotFound(to));
        }
        match target.raft.upgrade() {
            Some(raft) if !raft.is_stopped() => Ok(raft),
            _ => Err(NetworkError::PeerNotFound(to)),
        }
    }
}

struct LocalTransport {
    from: u32,
    network: Arc<LocalNetwork>,
}

impl LocalTransport {
    fn connect(
        &self,
        to: u32,
    ) -> Option<Arc<Raft>> {
        match self.network.route(self.from, to) {
            Ok(raft) => Some(raft),
            Err(e) => {
                trace!("[LocalNetwork] {} -> {} dropped: {}", self.from, to, e);
                None
            }
        }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn request_vote(
        &self,
        peer_id: u32,
        request: VoteRequest,
    ) -> Option<VoteResponse> {
        let target = self.connect(peer_id)?;
        tokio::task::yield_now().await;

        let reply = target.handle_request_vote(request).ok()?;
        self.connect(peer_id)?;
        Some(reply)
    }

    async fn append_entries(
        &self,
        peer_id: u32,
        request: AppendEntriesRequest,
    ) -> Option<AppendEntriesResponse> {
        let target = self.connect(peer_id)?;
        tokio::task::yield_now().await;

        let reply = target.handle_append_entries(request).ok()?;
        self.connect(peer_id)?;
        Some(reply)
    }
}
