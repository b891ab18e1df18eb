use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::if_higher_term_found;
use crate::proto::AppendEntriesRequest;
use crate::proto::AppendEntriesResponse;
use crate::LogEvent;
use crate::RoleEvent;
use crate::Transport;

/// How one AppendEntries round trip ended, from the leader's side
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplicationOutcome {
    /// Feed back into the replication log
    Progress(LogEvent),
    /// The follower is ahead of us; the leader must step down
    HigherTerm(u64),
    /// Nothing learned this round
    NoReply,
}

/// Leader side replication driver: ships AppendEntries to followers and
/// turns their replies into events.
pub(crate) struct ReplicationHandler {
    my_id: u32,
}

impl ReplicationHandler {
    pub(crate) fn new(my_id: u32) -> Self {
        Self { my_id }
    }

    /// Sends one request per follower concurrently. Replies are routed to the
    /// role queue (higher term) or the log queue (progress) as they arrive;
    /// no lock is held while waiting on the network.
    pub(crate) fn broadcast_append_entries(
        self: &Arc<Self>,
        requests: Vec<(u32, AppendEntriesRequest)>,
        transport: &Arc<dyn Transport>,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        log_tx: &mpsc::UnboundedSender<LogEvent>,
    ) {
        for (peer, request) in requests {
            let handler = self.clone();
            let transport = transport.clone();
            let role_tx = role_tx.clone();
            let log_tx = log_tx.clone();

            tokio::spawn(async move {
                let outcome = handler.replicate_to_peer(peer, request, &transport).await;
                handler.dispatch(outcome, &role_tx, &log_tx);
            });
        }
    }

    pub(crate) async fn replicate_to_peer(
        &self,
        peer: u32,
        request: AppendEntriesRequest,
        transport: &Arc<dyn Transport>,
    ) -> ReplicationOutcome {
        let term = request.term;
        let prev_log_index = request.prev_log_index;
        let applied_count = request.entries.len() as u64;

        trace!(
            "[Leader {} -> Follower {}] Replicating {} entries after {}",
            self.my_id,
            peer,
            applied_count,
            prev_log_index
        );

        let reply = transport.append_entries(peer, request).await;
        self.handle_append_reply(peer, term, prev_log_index, applied_count, reply)
    }

    pub(crate) fn handle_append_reply(
        &self,
        peer: u32,
        term: u64,
        prev_log_index: u64,
        applied_count: u64,
        reply: Option<AppendEntriesResponse>,
    ) -> ReplicationOutcome {
        let Some(reply) = reply else {
            debug!("[Leader {}] no append reply from {}", self.my_id, peer);
            return ReplicationOutcome::NoReply;
        };

        if if_higher_term_found(term, reply.term) {
            warn!(
                "[Leader {}] follower {} is at higher term {}",
                self.my_id, peer, reply.term
            );
            return ReplicationOutcome::HigherTerm(reply.term);
        }

        if reply.term < term {
            debug!(
                "[Leader {}] drop reply from {} carrying old term {}",
                self.my_id, peer, reply.term
            );
            return ReplicationOutcome::NoReply;
        }

        if reply.success {
            ReplicationOutcome::Progress(LogEvent::ReplicationSucceeded {
                peer,
                term,
                prev_log_index,
                applied_count,
            })
        } else {
            ReplicationOutcome::Progress(LogEvent::ReplicationFailed {
                peer,
                term,
                prev_log_index,
                conflict_term: reply.conflict_term,
                conflict_index: reply.conflict_index,
            })
        }
    }

    fn dispatch(
        &self,
        outcome: ReplicationOutcome,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
        log_tx: &mpsc::UnboundedSender<LogEvent>,
    ) {
        let sent = match outcome {
            ReplicationOutcome::Progress(event) => log_tx.send(event).is_ok(),
            ReplicationOutcome::HigherTerm(term) => role_tx
                .send(RoleEvent::HigherTermObserved {
                    term,
                    originator: None,
                })
                .is_ok(),
            ReplicationOutcome::NoReply => true,
        };
        if !sent {
            debug!("[Leader {}] event queue closed, node is shutting down", self.my_id);
        }
    }
}
