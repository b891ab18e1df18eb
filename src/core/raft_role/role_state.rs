use tracing::debug;
use tracing::info;

use super::HardState;
use super::Role;
use super::RoleSnapshot;
use crate::RoleEvent;

/// What applying a [`RoleEvent`] changed. The caller turns this into
/// timer, persistence and driver side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Preconditions did not hold; nothing changed.
    Ignored,
    /// Now a follower. `term_changed` tells whether the hard state moved.
    SteppedDown { term_changed: bool },
    /// Vote recorded as follower of `term`.
    VoteRecorded { term: u64 },
    BecameCandidate { term: u64 },
    BecameLeader { term: u64 },
}

impl Transition {
    /// Whether the hard state must be saved before acting on it
    pub(crate) fn requires_persist(&self) -> bool {
        match self {
            Transition::Ignored | Transition::BecameLeader { .. } => false,
            Transition::SteppedDown { term_changed } => *term_changed,
            Transition::VoteRecorded { .. } | Transition::BecameCandidate { .. } => true,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RoleState {
    node_id: u32,
    hard_state: HardState,
    role: Role,
}

impl RoleState {
    pub(crate) fn new(
        node_id: u32,
        hard_state: HardState,
    ) -> Self {
        Self {
            node_id,
            hard_state,
            role: Role::Follower,
        }
    }

    pub(crate) fn current_term(&self) -> u64 {
        self.hard_state.current_term
    }

    pub(crate) fn voted_for(&self) -> Option<u32> {
        self.hard_state.voted_for
    }

    pub(crate) fn hard_state(&self) -> HardState {
        self.hard_state
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub(crate) fn is_candidate(&self) -> bool {
        self.role == Role::Candidate
    }

    pub(crate) fn snapshot(&self) -> RoleSnapshot {
        RoleSnapshot {
            current_term: self.hard_state.current_term,
            voted_for: self.hard_state.voted_for,
            role: self.role,
        }
    }

    /// Whether this peer may still vote for `candidate` in the current term
    pub(crate) fn can_vote_for(
        &self,
        candidate: u32,
    ) -> bool {
        match self.hard_state.voted_for {
            None => true,
            Some(id) => id == candidate,
        }
    }

    fn observe_term(
        &mut self,
        term: u64,
    ) -> bool {
        if term > self.hard_state.current_term {
            self.hard_state.current_term = term;
            self.hard_state.voted_for = None;
            self.role = Role::Follower;
            return true;
        }
        false
    }

    /// Applies one event atomically. Illegal event/role combinations are
    /// stale events and come back as [`Transition::Ignored`].
    pub(crate) fn apply(
        &mut self,
        event: RoleEvent,
    ) -> Transition {
        match event {
            RoleEvent::HigherTermObserved { term, originator } => {
                if self.observe_term(term) {
                    info!(
                        "[Node {}] observed higher term {} from {:?}, step down to follower",
                        self.node_id, term, originator
                    );
                    Transition::SteppedDown { term_changed: true }
                } else if term == self.hard_state.current_term
                    && self.is_candidate()
                    && originator.is_some()
                {
                    info!(
                        "[Node {}] candidate found peer {:?} active in term {}, step down to follower",
                        self.node_id, originator, term
                    );
                    self.role = Role::Follower;
                    Transition::SteppedDown { term_changed: false }
                } else {
                    debug!("[Node {}] ignore term {} from {:?}", self.node_id, term, originator);
                    Transition::Ignored
                }
            }

            RoleEvent::VoteGranted { term, candidate } => {
                if term < self.hard_state.current_term {
                    debug!(
                        "[Node {}] drop vote for {} in stale term {}",
                        self.node_id, candidate, term
                    );
                    return Transition::Ignored;
                }
                self.observe_term(term);

                if !self.can_vote_for(candidate) {
                    debug!(
                        "[Node {}] already voted for {:?} in term {}",
                        self.node_id, self.hard_state.voted_for, term
                    );
                    return Transition::Ignored;
                }

                self.hard_state.voted_for = Some(candidate);
                self.role = Role::Follower;
                info!("[Node {}] voted for {} in term {}", self.node_id, candidate, term);
                Transition::VoteRecorded { term }
            }

            RoleEvent::ElectionTimeout => {
                if self.is_leader() {
                    debug!("[Node {}] leader ignores election timeout", self.node_id);
                    return Transition::Ignored;
                }
                self.hard_state.current_term += 1;
                self.hard_state.voted_for = Some(self.node_id);
                self.role = Role::Candidate;
                info!(
                    "[Node {}] election timeout, become candidate at term {}",
                    self.node_id, self.hard_state.current_term
                );
                Transition::BecameCandidate {
                    term: self.hard_state.current_term,
                }
            }

            RoleEvent::MajorityVotesReceived { term } => {
                if !self.is_candidate() || term != self.hard_state.current_term {
                    debug!(
                        "[Node {}] drop stale majority for term {} (role={}, term={})",
                        self.node_id, term, self.role, self.hard_state.current_term
                    );
                    return Transition::Ignored;
                }
                self.role = Role::Leader;
                info!("[Node {}] become leader at term {}", self.node_id, term);
                Transition::BecameLeader { term }
            }
        }
    }
}
