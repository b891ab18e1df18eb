mod role_state;

pub(crate) use role_state::*;


use std::fmt;

use parking_lot::RwLock;
use parking_lot::RwLockReadGuard;
use parking_lot::RwLockWriteGuard;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for Role {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Role::Follower => write!(f, "Follower"),
            Role::Candidate => write!(f, "Candidate"),
            Role::Leader => write!(f, "Leader"),
        }
    }
}

#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardState {
    /// Persistent state on all servers(Updated on stable storage before
    /// responding to RPCs): latest term server has seen (initialized to 0
    /// on first boot, increases monotonically)
    pub current_term: u64,
    /// Persistent state on all servers(Updated on stable storage before
    /// responding to RPCs): candidateId that received vote in current term
    /// (or null if none)
    pub voted_for: Option<u32>,
}

/// Point-in-time view of the role state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub current_term: u64,
    pub voted_for: Option<u32>,
    pub role: Role,
}

impl RoleSnapshot {
    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }
}

/// Owns `currentTerm`, `votedFor` and the role of the local peer.
///
/// The write side is taken only by whoever applies a [`RoleEvent`]; any
/// other task reads a consistent snapshot.
pub struct RoleStateMachine {
    state: RwLock<RoleState>,
}

impl RoleStateMachine {
    pub(crate) fn new(
        node_id: u32,
        hard_state: HardState,
    ) -> Self {
        Self {
            state: RwLock::new(RoleState::new(node_id, hard_state)),
        }
    }

    pub fn current_term(&self) -> u64 {
        self.state.read().current_term()
    }

    pub fn is_leader(&self) -> bool {
        self.state.read().is_leader()
    }

    pub fn snapshot(&self) -> RoleSnapshot {
        self.state.read().snapshot()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RoleState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RoleState> {
        self.state.write()
    }
}
