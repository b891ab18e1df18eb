use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::if_higher_term_found;
use crate::proto::VoteRequest;
use crate::utils::cluster::is_majority;
use crate::RoleEvent;
use crate::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElectionOutcome {
    /// A quorum granted its vote for the requested term
    Won,
    /// Some voter is already at a higher term
    HigherTerm(u64),
    /// Every voter answered or failed without producing a quorum
    Lost,
}

/// Candidate side election driver
pub(crate) struct ElectionHandler {
    my_id: u32,
}

impl ElectionHandler {
    pub(crate) fn new(my_id: u32) -> Self {
        Self { my_id }
    }

    /// Runs one election in the background and enqueues its result as a
    /// role event. The candidate's own vote is counted up front.
    pub(crate) fn start_election(
        self: &Arc<Self>,
        request: VoteRequest,
        peers: Vec<u32>,
        transport: &Arc<dyn Transport>,
        role_tx: &mpsc::UnboundedSender<RoleEvent>,
    ) {
        let handler = self.clone();
        let transport = transport.clone();
        let role_tx = role_tx.clone();

        tokio::spawn(async move {
            let term = request.term;
            let event = match handler.broadcast_vote_requests(request, &peers, &transport).await {
                ElectionOutcome::Won => RoleEvent::MajorityVotesReceived { term },
                ElectionOutcome::HigherTerm(higher) => RoleEvent::HigherTermObserved {
                    term: higher,
                    originator: None,
                },
                ElectionOutcome::Lost => {
                    debug!("[Node {}] election for term {} lost", handler.my_id, term);
                    return;
                }
            };
            if role_tx.send(event).is_err() {
                debug!("[Node {}] role queue closed, node is shutting down", handler.my_id);
            }
        });
    }

    /// Solicits votes from every peer in parallel and returns as soon as the
    /// outcome is decided. Pending calls are dropped at that point.
    pub(crate) async fn broadcast_vote_requests(
        &self,
        request: VoteRequest,
        peers: &[u32],
        transport: &Arc<dyn Transport>,
    ) -> ElectionOutcome {
        let term = request.term;
        let cluster_size = peers.len() + 1;
        let mut granted = 1;

        if is_majority(granted, cluster_size) {
            info!("[Node {}] single voter cluster, wins term {}", self.my_id, term);
            return ElectionOutcome::Won;
        }

        debug!("[Node {}] send vote requests for term {} to {:?}", self.my_id, term, peers);

        let mut calls: FuturesUnordered<_> = peers
            .iter()
            .map(|peer| {
                let peer = *peer;
                let transport = transport.clone();
                let request = request.clone();
                async move { (peer, transport.request_vote(peer, request).await) }
            })
            .collect();

        while let Some((peer, reply)) = calls.next().await {
            match reply {
                None => {
                    debug!("[Node {}] no vote reply from {}", self.my_id, peer);
                }
                Some(response) if if_higher_term_found(term, response.term) => {
                    warn!(
                        "[Node {}] higher term {} found during election phase.",
                        self.my_id, response.term
                    );
                    return ElectionOutcome::HigherTerm(response.term);
                }
                Some(response) if response.vote_granted && response.term == term => {
                    granted += 1;
                    debug!(
                        "[Node {}] vote from {} for term {}, {} granted",
                        self.my_id, peer, term, granted
                    );
                    if is_majority(granted, cluster_size) {
                        info!(
                            "[Node {}] receives majority votes ({}/{}) for term {}",
                            self.my_id, granted, cluster_size, term
                        );
                        return ElectionOutcome::Won;
                    }
                }
                Some(_) => {
                    debug!("[Node {}] vote rejected by {} for term {}", self.my_id, peer, term);
                }
            }
        }

        ElectionOutcome::Lost
    }
}
