//! Replication and leader-election core of the Raft consensus protocol.
//!
//! A cluster of peers agrees on an ordered, durable log of opaque commands
//! despite crashes, message loss and partitions, and hands committed entries
//! to the application in order. Networking and durable storage are plugged
//! in through [`Transport`] and [`StateStorage`].
//!
//! ```ignore
//! let network = LocalNetwork::new();
//! let (node, mut commits) = NodeBuilder::new(config, network.transport(1))
//!     .storage(Arc::new(MemStateStorage::new()))
//!     .build()?;
//! network.register(&node);
//! node.run()?;
//! ```

mod config;
mod core;
mod errors;
mod metrics;
mod network;
mod node;
mod storage;

pub mod proto;
pub mod utils;

pub use core::*;

pub use config::*;
pub use errors::*;
pub use metrics::*;
pub use network::*;
pub use node::*;
pub use storage::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
