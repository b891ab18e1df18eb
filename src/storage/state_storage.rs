//! Core model in Raft: StateStorage Definition, persistent state: current_term,
//! voted_for and the log entries.

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::proto::LogEntry;
use crate::HardState;
use crate::Result;

/// Everything a peer must recover after a crash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    pub hard_state: HardState,
    /// Log entries starting at index 1 (the index-0 sentinel is never stored)
    pub log: Vec<LogEntry>,
}

/// Borrowed form of [`PersistentState`], shares its encoding.
#[derive(Serialize)]
pub(crate) struct PersistentStateRef<'a> {
    pub(crate) hard_state: &'a HardState,
    pub(crate) log: &'a [LogEntry],
}

#[cfg_attr(test, automock)]
pub trait StateStorage: Send + Sync + 'static {
    /// Durably records the hard state and the whole log.
    ///
    /// Called after every mutation that must survive a restart and before
    /// the core acknowledges it to anyone. An `Err` is handed back to the
    /// caller of the mutating operation.
    fn save_state(
        &self,
        hard_state: &HardState,
        log: &[LogEntry],
    ) -> Result<()>;

    /// When node restarts, check if there is stored state
    fn load_state(&self) -> Result<Option<PersistentState>>;
}
