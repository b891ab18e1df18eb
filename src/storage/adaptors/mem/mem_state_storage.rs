use parking_lot::RwLock;
use tracing::trace;

use crate::proto::LogEntry;
use crate::HardState;
use crate::PersistentState;
use crate::Result;
use crate::StateStorage;

/// Volatile [`StateStorage`]: keeps the last saved state in memory.
///
/// Survives a restart of the [`Raft`](crate::Raft) instance as long as the
/// same storage handle is passed back in, which is what the tests use to
/// simulate crash recovery.
#[derive(Debug, Default)]
pub struct MemStateStorage {
    state: RwLock<Option<PersistentState>>,
}

impl MemStateStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the most recently saved state
    pub fn last_saved(&self) -> Option<PersistentState> {
        self.state.read().clone()
    }
}

impl StateStorage for MemStateStorage {
    fn save_state(
        &self,
        hard_state: &HardState,
        log: &[LogEntry],
    ) -> Result<()> {
        trace!(
            "save_state term={} voted_for={:?} log_len={}",
            hard_state.current_term,
            hard_state.voted_for,
            log.len()
        );

        *self.state.write() = Some(PersistentState {
            hard_state: *hard_state,
            log: log.to_vec(),
        });
        Ok(())
    }

    fn load_state(&self) -> Result<Option<PersistentState>> {
        Ok(self.state.read().clone())
    }
}
