use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::info;

use crate::proto::LogEntry;
use crate::storage::state_storage::PersistentStateRef;
use crate::HardState;
use crate::PersistentState;
use crate::Result;
use crate::StateStorage;
use crate::StorageError;

const STATE_FILE_NAME: &str = "raft_state.bin";
const STATE_TMP_FILE_NAME: &str = "raft_state.bin.tmp";

/// File-based [`StateStorage`].
///
/// The whole state is bincode encoded into a temp file which is synced and
/// then renamed over `raft_state.bin`, so a crash leaves either the old or
/// the new state on disk.
#[derive(Debug)]
pub struct FileStateStorage {
    data_dir: PathBuf,
}

impl FileStateStorage {
    /// Creates the storage under `data_dir`, creating the directory if needed
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).map_err(|e| StorageError::PathError {
            path: data_dir.clone(),
            source: e,
        })?;

        Ok(Self { data_dir })
    }

    /// Storage rooted at `<db_root_dir>/<node_id>`
    pub fn for_node(
        db_root_dir: &Path,
        node_id: u32,
    ) -> Result<Self> {
        Self::new(db_root_dir.join(node_id.to_string()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE_NAME)
    }
}

impl StateStorage for FileStateStorage {
    fn save_state(
        &self,
        hard_state: &HardState,
        log: &[LogEntry],
    ) -> Result<()> {
        let bytes = bincode::serialize(&PersistentStateRef { hard_state, log })?;

        let tmp_path = self.data_dir.join(STATE_TMP_FILE_NAME);
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.flush()?;
            file.sync_all()?;
            fs::rename(&tmp_path, self.state_path())
        };
        write().map_err(|e| StorageError::PathError {
            path: tmp_path.clone(),
            source: e,
        })?;

        debug!(
            "Persisted state to {:?}: term={}, log_len={}",
            self.data_dir,
            hard_state.current_term,
            log.len()
        );
        Ok(())
    }

    fn load_state(&self) -> Result<Option<PersistentState>> {
        let path = self.state_path();
        if !path.exists() {
            info!("No persisted state found at {:?}", path);
            return Ok(None);
        }

        let mut buffer = Vec::new();
        File::open(&path)
            .and_then(|mut file| file.read_to_end(&mut buffer))
            .map_err(|e| StorageError::PathError {
                path: path.clone(),
                source: e,
            })?;

        let state: PersistentState = bincode::deserialize(&buffer).map_err(|e| StorageError::DataCorruption {
            location: format!("{}: {}", path.display(), e),
        })?;

        if state.log.iter().any(|e| e.term > state.hard_state.current_term) {
            return Err(StorageError::DataCorruption {
                location: format!("{}: log term ahead of current_term", path.display()),
            }
            .into());
        }

        info!(
            "Loaded persisted state: term={}, voted_for={:?}, log_len={}",
            state.hard_state.current_term,
            state.hard_state.voted_for,
            state.log.len()
        );
        Ok(Some(state))
    }
}
