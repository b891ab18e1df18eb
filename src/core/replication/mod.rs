mod replication_handler;
mod replication_log;

pub(crate) use replication_handler::*;
pub use replication_log::*;


/// A committed log entry handed to the application exactly once, in
/// increasing index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEntry {
    pub index: u64,
    pub term: u64,
    pub command: Vec<u8>,
}
