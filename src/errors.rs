//! Raft Consensus Core Error Hierarchy
//!
//! Errors are grouped by the layer that produced them. Stale events and
//! transport failures are *not* errors in this crate: the former are dropped,
//! the latter surface as "no reply" from the [`Transport`](crate::Transport).

use std::path::PathBuf;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (storage, internal channels)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Node configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raft consensus protocol failures
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Network layer
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // Storage layer
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    /// Illegal Raft node state transitions
    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),
}

#[derive(Debug, thiserror::Error)]
#[doc(hidden)]
pub enum StateTransitionError {
    #[error("Node {0} is already running")]
    AlreadyRunning(u32),

    #[error("Node {0} has been shut down")]
    Stopped(u32),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Target node is not registered with the local network
    #[error("Peer {0} not found")]
    PeerNotFound(u32),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures while persisting hard state or log
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// I/O failure bound to a specific path
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for persisted data
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Persisted state failed validation on load
    #[error("Data corruption detected at {location}")]
    DataCorruption { location: String },
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<StateTransitionError> for Error {
    fn from(e: StateTransitionError) -> Self {
        Error::Consensus(ConsensusError::StateTransition(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        StorageError::BincodeError(e).into()
    }
}
