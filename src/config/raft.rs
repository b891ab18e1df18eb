use std::fmt::Debug;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Configuration parameters for the Raft consensus algorithm implementation
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct RaftConfig {
    /// Configuration settings related to log replication
    /// Includes heartbeat cadence and AppendEntries batch size
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Configuration settings for leader election mechanism
    /// Controls the randomized election timeout window
    #[serde(default)]
    pub election: ElectionConfig,
}

impl Debug for RaftConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RaftConfig")
            .field("replication", &self.replication)
            .field("election", &self.election)
            .finish()
    }
}

impl RaftConfig {
    /// Validates all Raft subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.replication.validate()?;
        self.election.validate()?;

        if self.replication.rpc_append_entries_clock_in_ms >= self.election.election_timeout_min {
            return Err(Error::Config(ConfigError::Message(format!(
                "heartbeat interval {}ms must be shorter than election_timeout_min {}ms",
                self.replication.rpc_append_entries_clock_in_ms, self.election.election_timeout_min
            ))));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplicationConfig {
    /// Heartbeat period of the leader, in milliseconds
    #[serde(default = "default_append_interval")]
    pub rpc_append_entries_clock_in_ms: u64,

    /// Upper bound of entries carried by a single AppendEntries request
    #[serde(default = "default_entries_per_replication")]
    pub append_entries_max_entries_per_replication: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            rpc_append_entries_clock_in_ms: default_append_interval(),
            append_entries_max_entries_per_replication: default_entries_per_replication(),
        }
    }
}

impl ReplicationConfig {
    fn validate(&self) -> Result<()> {
        if self.rpc_append_entries_clock_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "rpc_append_entries_clock_in_ms cannot be 0".into(),
            )));
        }

        if self.append_entries_max_entries_per_replication == 0 {
            return Err(Error::Config(ConfigError::Message(
                "append_entries_max_entries_per_replication must be > 0".into(),
            )));
        }

        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.rpc_append_entries_clock_in_ms)
    }
}

fn default_append_interval() -> u64 {
    100
}
fn default_entries_per_replication() -> u64 {
    100
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ElectionConfig {
    #[serde(default = "default_election_timeout_min")]
    pub election_timeout_min: u64,

    #[serde(default = "default_election_timeout_max")]
    pub election_timeout_max: u64,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_timeout_min: default_election_timeout_min(),
            election_timeout_max: default_election_timeout_max(),
        }
    }
}

impl ElectionConfig {
    fn validate(&self) -> Result<()> {
        if self.election_timeout_min >= self.election_timeout_max {
            return Err(Error::Config(ConfigError::Message(format!(
                "election_timeout_min {}ms must be less than election_timeout_max {}ms",
                self.election_timeout_min, self.election_timeout_max
            ))));
        }

        Ok(())
    }

    /// (min, max) pair in milliseconds, as consumed by the election timer
    pub fn timeout_range(&self) -> (u64, u64) {
        (self.election_timeout_min, self.election_timeout_max)
    }
}

// in ms
fn default_election_timeout_min() -> u64 {
    400
}
fn default_election_timeout_max() -> u64 {
    500
}
