use std::collections::HashSet;
use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    #[serde(default = "default_node_id")]
    pub node_id: u32,

    /// Ids of every other voting member. The local node is never listed here.
    #[serde(default)]
    pub peers: Vec<u32>,

    /// Root directory used by file based state storage
    #[serde(default = "default_db_dir")]
    pub db_root_dir: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            peers: vec![],
            db_root_dir: default_db_dir(),
        }
    }
}

impl ClusterConfig {
    /// Validates cluster configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.node_id == 0 {
            return Err(Error::Config(ConfigError::Message(
                "node_id cannot be 0 (reserved for invalid nodes)".into(),
            )));
        }

        if self.peers.contains(&self.node_id) {
            return Err(Error::Config(ConfigError::Message(format!(
                "peers must not contain the local node {}",
                self.node_id
            ))));
        }

        let mut ids = HashSet::new();
        for id in &self.peers {
            if *id == 0 {
                return Err(Error::Config(ConfigError::Message(
                    "peer id cannot be 0".into(),
                )));
            }
            if !ids.insert(*id) {
                return Err(Error::Config(ConfigError::Message(format!(
                    "Duplicate peer id {id} in peers"
                ))));
            }
        }

        if self.db_root_dir.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "db_root_dir path cannot be empty".into(),
            )));
        }

        Ok(())
    }
}

fn default_node_id() -> u32 {
    1
}
fn default_db_dir() -> PathBuf {
    PathBuf::from("/tmp/db")
}
