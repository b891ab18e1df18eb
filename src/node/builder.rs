//! A builder pattern implementation for constructing a [`Node`] instance in a
//! Raft cluster.
//!
//! ## Key Design Points
//! - **Default Components**: state is persisted with [`FileStateStorage`] under
//!   `<db_root_dir>/<node_id>` unless another [`StateStorage`] is supplied.
//! - **Validation**: the configuration is validated before anything is built.
//!
//! ## Example
//! ```ignore
//! let config = RaftNodeConfig::new()?.validate()?;
//! let (node, commits) = NodeBuilder::new(config, transport)
//!     .storage(Arc::new(MemStateStorage::new()))  // Optional override
//!     .build()?;
//! node.run()?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::metrics;
use crate::CommitStream;
use crate::FileStateStorage;
use crate::Node;
use crate::Raft;
use crate::RaftNodeConfig;
use crate::Result;
use crate::StateStorage;
use crate::Transport;

pub struct NodeBuilder {
    pub(super) node_config: RaftNodeConfig,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) storage: Option<Arc<dyn StateStorage>>,
}

impl NodeBuilder {
    pub fn new(
        node_config: RaftNodeConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            node_config,
            transport,
            storage: None,
        }
    }

    /// Sets a custom state storage implementation
    pub fn storage(
        mut self,
        storage: Arc<dyn StateStorage>,
    ) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the entire node configuration
    pub fn node_config(
        mut self,
        node_config: RaftNodeConfig,
    ) -> Self {
        self.node_config = node_config;
        self
    }

    /// Validates the configuration, recovers persisted state and assembles
    /// the node. Nothing runs until [`Node::run`].
    pub fn build(self) -> Result<(Node, CommitStream)> {
        let node_config = self.node_config.validate()?;
        let node_id = node_config.cluster.node_id;

        let storage: Arc<dyn StateStorage> = match self.storage {
            Some(storage) => storage,
            None => {
                let storage = FileStateStorage::for_node(&node_config.cluster.db_root_dir, node_id)?;
                debug!("[Node {}] default file storage at {:?}", node_id, storage.data_dir());
                Arc::new(storage)
            }
        };

        metrics::register_custom_metrics(&metrics::REGISTRY);

        let settings = Arc::new(node_config);
        let (raft, commits) = Raft::new(settings.clone(), self.transport, storage)?;

        let node = Node {
            id: node_id,
            raft: Arc::new(raft),
            settings,
        };
        Ok((node, commits))
    }
}
